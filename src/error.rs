use std::convert::Infallible;

use log::error;
use serde::Serialize;
use thiserror::Error;
use warp::{
    http::{header, StatusCode},
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Reject,
        UnsupportedMediaType,
    },
    Rejection, Reply,
};

use crate::pages;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("mail delivery failed: {0}")]
    Mail(String),
}

/// A protected page was requested without a usable session cookie.
#[derive(Debug)]
pub struct Unauthenticated {
    pub clear_cookie: bool,
}

impl Reject for Unauthenticated {}

/// A protected API route was requested without a usable token.
#[derive(Debug)]
pub struct Unauthorized;

impl Reject for Unauthorized {}

#[derive(Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

pub fn json_error(status: StatusCode, message: &str) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error: message }), status)
        .into_response()
}

pub fn redirect_to(location: &str) -> warp::reply::Response {
    warp::reply::with_header(
        warp::reply::with_status(warp::reply(), StatusCode::SEE_OTHER),
        "location",
        location,
    )
    .into_response()
}

/// Turns every rejection that escapes the route table into a response.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(unauthenticated) = err.find::<Unauthenticated>() {
        let mut response = redirect_to("/login");
        if unauthenticated.clear_cookie {
            response
                .headers_mut()
                .insert(header::SET_COOKIE, crate::auth::clear_session_cookie());
        }
        return Ok(response);
    }

    if err.find::<Unauthorized>().is_some() {
        return Ok(json_error(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        return Ok(json_error(StatusCode::BAD_REQUEST, &e.to_string()));
    }

    if let Some(e) = err.find::<InvalidQuery>() {
        return Ok(json_error(StatusCode::BAD_REQUEST, &e.to_string()));
    }

    if let Some(e) = err.find::<UnsupportedMediaType>() {
        return Ok(json_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, &e.to_string()));
    }

    if err.find::<LengthRequired>().is_some() {
        return Ok(json_error(StatusCode::LENGTH_REQUIRED, "Content-Length required"));
    }

    if err.find::<PayloadTooLarge>().is_some() {
        return Ok(json_error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"));
    }

    // Checked last: a request that reached a body or query filter also
    // collected method and path misses from the sibling routes.
    if err.is_not_found() || err.find::<MethodNotAllowed>().is_some() {
        return Ok(pages::not_found(None).into_response());
    }

    error!("unhandled rejection: {:?}", err);
    Ok(json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
    ))
}
