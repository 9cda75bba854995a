use std::{convert::Infallible, sync::Arc};

use log::{debug, warn};
use warp::{http::HeaderValue, Filter, Rejection};

use crate::error::{Unauthenticated, Unauthorized};

pub mod password;
pub mod token;

pub use token::JwtKeys;

pub const SESSION_COOKIE: &str = "jwt";

/// The identity carried by a valid session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

impl From<token::SessionClaims> for SessionUser {
    fn from(claims: token::SessionClaims) -> Self {
        SessionUser {
            id: claims.id,
            username: claims.username,
        }
    }
}

pub fn session_cookie(token: &str, keys: &JwtKeys) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE,
        token,
        keys.ttl().as_secs()
    )
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("jwt=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax")
}

/// Resolves the session cookie if there is a valid one. Never rejects.
pub fn current_user(
    keys: Arc<JwtKeys>,
) -> impl Filter<Extract = (Option<SessionUser>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |token: Option<String>| {
        let token = token?;
        match keys.verify_session(&token) {
            Ok(claims) => Some(SessionUser::from(claims)),
            Err(e) => {
                debug!("ignoring invalid session cookie: {}", e);
                None
            }
        }
    })
}

/// Requires a valid session cookie. Rejects with [`Unauthenticated`], which
/// the rejection handler turns into a redirect to `/login`.
pub fn authenticate(
    keys: Arc<JwtKeys>,
) -> impl Filter<Extract = (SessionUser,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |token: Option<String>| {
        let keys = keys.clone();
        async move {
            let token = match token {
                Some(token) => token,
                None => {
                    debug!("no session cookie, redirecting to login");
                    return Err(warp::reject::custom(Unauthenticated {
                        clear_cookie: false,
                    }));
                }
            };

            match keys.verify_session(&token) {
                Ok(claims) => {
                    debug!("user authenticated: {}", claims.username);
                    Ok(SessionUser::from(claims))
                }
                Err(e) => {
                    warn!("session verification failed: {}", e);
                    Err(warp::reject::custom(Unauthenticated { clear_cookie: true }))
                }
            }
        }
    })
}

/// Requires either `Authorization: Bearer <token>` from the JSON login or a
/// session cookie, yielding the user id.
pub fn api_authenticate(
    keys: Arc<JwtKeys>,
) -> impl Filter<Extract = (i64,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and_then(move |authorization: Option<String>, cookie: Option<String>| {
            let keys = keys.clone();
            async move {
                let bearer = authorization
                    .as_deref()
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(str::trim);

                let user_id = match (bearer, cookie) {
                    (Some(token), _) => keys.verify_api(token).map(|claims| claims.user_id),
                    (None, Some(cookie)) => keys.verify_session(&cookie).map(|claims| claims.id),
                    (None, None) => return Err(warp::reject::custom(Unauthorized)),
                };

                user_id.map_err(|e| {
                    warn!("api token verification failed: {}", e);
                    warp::reject::custom(Unauthorized)
                })
            }
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn keys() -> Arc<JwtKeys> {
        Arc::new(JwtKeys::new("test-secret", Duration::from_secs(3600)))
    }

    #[tokio::test]
    async fn current_user_tolerates_garbage() {
        let keys = keys();
        let filter = current_user(keys.clone());

        let none = warp::test::request().filter(&filter).await.unwrap();
        assert_eq!(none, None);

        let garbage = warp::test::request()
            .header("cookie", "jwt=garbage")
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(garbage, None);

        let token = keys.issue_session(3, "joey").unwrap();
        let user = warp::test::request()
            .header("cookie", format!("jwt={}", token))
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(
            user,
            Some(SessionUser {
                id: 3,
                username: "joey".to_owned()
            })
        );
    }

    #[tokio::test]
    async fn authenticate_distinguishes_missing_and_invalid() {
        let filter = authenticate(keys());

        let missing = warp::test::request().filter(&filter).await.unwrap_err();
        assert!(!missing.find::<Unauthenticated>().unwrap().clear_cookie);

        let invalid = warp::test::request()
            .header("cookie", "jwt=garbage")
            .filter(&filter)
            .await
            .unwrap_err();
        assert!(invalid.find::<Unauthenticated>().unwrap().clear_cookie);
    }

    #[tokio::test]
    async fn api_accepts_bearer_or_cookie() {
        let keys = keys();
        let filter = api_authenticate(keys.clone());

        let bearer = warp::test::request()
            .header("authorization", format!("Bearer {}", keys.issue_api(5).unwrap()))
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(bearer, 5);

        let cookie = warp::test::request()
            .header("cookie", format!("jwt={}", keys.issue_session(6, "x").unwrap()))
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(cookie, 6);

        let rejected = warp::test::request().filter(&filter).await.unwrap_err();
        assert!(rejected.find::<Unauthorized>().is_some());
    }

    #[test]
    fn cookie_attributes() {
        let keys = JwtKeys::new("s", Duration::from_secs(3600));
        let cookie = session_cookie("abc", &keys);
        assert_eq!(cookie, "jwt=abc; HttpOnly; Path=/; Max-Age=3600; SameSite=Lax");
    }
}
