//! Registration, login/logout and the password-reset flow.

use std::convert::Infallible;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use warp::{
    filters::BoxedFilter,
    http::{header, StatusCode},
    reply::Response,
    Filter, Reply,
};

use super::with_state;
use crate::{
    auth::{
        self,
        password::{hash_password, verify_password},
    },
    db,
    error::{json_error, redirect_to, AppError},
    pages, SharedState,
};

const FORM_LIMIT: u64 = 16 * 1024;

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct ForgotForm {
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct ResetForm {
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct TokenBody {
    token: String,
}

fn form<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(FORM_LIMIT).and(warp::body::form())
}

/// `Some(user)` when the credentials match a stored account.
async fn check_credentials(
    state: &SharedState,
    credentials: &Credentials,
) -> Result<Option<db::User>, AppError> {
    let username = credentials.username.trim();
    let user = match db::find_user_by_username(&state.db, username).await? {
        Some(user) => user,
        None => return Ok(None),
    };
    if verify_password(&credentials.password, &user.password).await? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

async fn login(credentials: Credentials, state: SharedState) -> Result<Response, Infallible> {
    let result: Result<Option<String>, AppError> = async {
        match check_credentials(&state, &credentials).await? {
            Some(user) => {
                let token = state.keys.issue_session(user.id, &user.username)?;
                Ok(Some(auth::session_cookie(&token, &state.keys)))
            }
            None => Ok(None),
        }
    }
    .await;

    let response = match result {
        Ok(Some(cookie)) => {
            info!("user logged in: {}", credentials.username.trim());
            warp::reply::with_header(redirect_to("/"), "set-cookie", cookie).into_response()
        }
        Ok(None) => pages::login(Some("Invalid username or password")).into_response(),
        Err(e) => {
            error!("login failed: {}", e);
            pages::login(Some("An error occurred during login")).into_response()
        }
    };
    Ok(response)
}

async fn api_login(credentials: Credentials, state: SharedState) -> Result<Response, Infallible> {
    let result: Result<Option<String>, AppError> = async {
        match check_credentials(&state, &credentials).await? {
            Some(user) => Ok(Some(state.keys.issue_api(user.id)?)),
            None => Ok(None),
        }
    }
    .await;

    let response = match result {
        Ok(Some(token)) => warp::reply::json(&TokenBody { token }).into_response(),
        Ok(None) => json_error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        Err(e) => {
            error!("api login failed: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error logging in")
        }
    };
    Ok(response)
}

enum Registration {
    Created,
    Taken,
}

async fn register(form: Credentials, state: SharedState) -> Result<Response, Infallible> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(pages::register(Some("Username and password are required")).into_response());
    }

    let result: Result<Registration, AppError> = async {
        if db::find_user_by_username(&state.db, username).await?.is_some() {
            return Ok(Registration::Taken);
        }
        let hash = hash_password(&form.password).await?;
        match db::insert_user(&state.db, username, &hash).await {
            Ok(id) => {
                info!("registered user {} ({})", username, id);
                Ok(Registration::Created)
            }
            // Lost a race with a concurrent registration.
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(Registration::Taken),
            Err(e) => Err(e.into()),
        }
    }
    .await;

    let response = match result {
        Ok(Registration::Created) => redirect_to("/login"),
        Ok(Registration::Taken) => pages::register(Some("Username already exists")).into_response(),
        Err(e) => {
            error!("registration failed: {}", e);
            pages::register(Some("An error occurred during registration")).into_response()
        }
    };
    Ok(response)
}

async fn forgot_password(form: ForgotForm, state: SharedState) -> Result<Response, Infallible> {
    let result: Result<bool, AppError> = async {
        let user = match db::find_user_by_username(&state.db, form.username.trim()).await? {
            Some(user) => user,
            None => return Ok(false),
        };
        let token = state.keys.issue_reset(user.id)?;
        let link = format!("{}/reset-password/{}", state.public_base_url, token);
        state.mailer.send_reset(&user.username, &link).await?;
        Ok(true)
    }
    .await;

    let page = match result {
        Ok(true) => pages::forgot_password(None, Some("Password reset link sent to your email")),
        Ok(false) => pages::forgot_password(Some("User not found"), None),
        Err(e) => {
            error!("password reset request failed: {}", e);
            pages::forgot_password(Some("An error occurred"), None)
        }
    };
    Ok(page.into_response())
}

async fn reset_password(
    token: String,
    form: ResetForm,
    state: SharedState,
) -> Result<Response, Infallible> {
    if form.password.is_empty() {
        return Ok(pages::reset_password(&token, Some("Password is required")).into_response());
    }

    let result: Result<bool, AppError> = async {
        let claims = state.keys.verify_reset(&token)?;
        let hash = hash_password(&form.password).await?;
        Ok(db::update_password(&state.db, claims.id, &hash).await?)
    }
    .await;

    let response = match result {
        Ok(true) => redirect_to("/login"),
        Ok(false) => {
            warn!("reset token for a user that no longer exists");
            pages::reset_password(&token, Some("Invalid or expired token")).into_response()
        }
        Err(e) => {
            warn!("password reset failed: {}", e);
            pages::reset_password(&token, Some("Invalid or expired token")).into_response()
        }
    };
    Ok(response)
}

fn logout() -> Response {
    let mut response = redirect_to("/login");
    response
        .headers_mut()
        .insert(header::SET_COOKIE, auth::clear_session_cookie());
    response
}

pub(super) fn filters(state: SharedState) -> BoxedFilter<(Response,)> {
    let login_page = warp::path!("login")
        .and(warp::get())
        .map(|| pages::login(None).into_response());
    let login_submit = warp::path!("login")
        .and(warp::post())
        .and(form::<Credentials>())
        .and(with_state(state.clone()))
        .and_then(login);
    let api_login_submit = warp::path!("api" / "login")
        .and(warp::post())
        .and(warp::body::content_length_limit(FORM_LIMIT))
        .and(warp::body::json::<Credentials>())
        .and(with_state(state.clone()))
        .and_then(api_login);

    let register_page = warp::path!("register")
        .and(warp::get())
        .map(|| pages::register(None).into_response());
    let register_submit = warp::path!("register")
        .and(warp::post())
        .and(form::<Credentials>())
        .and(with_state(state.clone()))
        .and_then(register);

    let forgot_page = warp::path!("forgot-password")
        .and(warp::get())
        .map(|| pages::forgot_password(None, None).into_response());
    let forgot_submit = warp::path!("forgot-password")
        .and(warp::post())
        .and(form::<ForgotForm>())
        .and(with_state(state.clone()))
        .and_then(forgot_password);

    let reset_page = warp::path!("reset-password" / String)
        .and(warp::get())
        .map(|token: String| pages::reset_password(&token, None).into_response());
    let reset_submit = warp::path!("reset-password" / String)
        .and(warp::post())
        .and(form::<ResetForm>())
        .and(with_state(state))
        .and_then(reset_password);

    let logout_route = warp::path!("logout").and(warp::get()).map(logout);

    login_page
        .or(login_submit)
        .unify()
        .or(api_login_submit)
        .unify()
        .or(register_page)
        .unify()
        .or(register_submit)
        .unify()
        .or(forgot_page)
        .unify()
        .or(forgot_submit)
        .unify()
        .or(reset_page)
        .unify()
        .or(reset_submit)
        .unify()
        .or(logout_route)
        .unify()
        .boxed()
}
