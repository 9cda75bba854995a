//! HS256 tokens signed with the shared `JWT_SECRET`.
//!
//! Three claim shapes share the secret: the session cookie, the bearer token
//! handed out by the JSON login, and the password-reset link. Each shape has
//! fields the others lack, so a token minted for one purpose never decodes as
//! another.

use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::AppError;

const RESET_PURPOSE: &str = "reset";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: i64,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub id: i64,
    pub purpose: String,
    pub iat: u64,
    pub exp: u64,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("ttl", &self.ttl).finish()
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn window(&self) -> (u64, u64) {
        let now = get_current_timestamp();
        (now, now + self.ttl.as_secs())
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AppError> {
        Ok(decode::<T>(token, &self.decoding, &self.validation)?.claims)
    }

    pub fn issue_session(&self, id: i64, username: &str) -> Result<String, AppError> {
        let (iat, exp) = self.window();
        self.sign(&SessionClaims {
            id,
            username: username.to_owned(),
            iat,
            exp,
        })
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, AppError> {
        self.verify(token)
    }

    pub fn issue_api(&self, user_id: i64) -> Result<String, AppError> {
        let (iat, exp) = self.window();
        self.sign(&ApiClaims { user_id, iat, exp })
    }

    pub fn verify_api(&self, token: &str) -> Result<ApiClaims, AppError> {
        self.verify(token)
    }

    pub fn issue_reset(&self, id: i64) -> Result<String, AppError> {
        let (iat, exp) = self.window();
        self.sign(&ResetClaims {
            id,
            purpose: RESET_PURPOSE.to_owned(),
            iat,
            exp,
        })
    }

    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, AppError> {
        let claims: ResetClaims = self.verify(token)?;
        if claims.purpose != RESET_PURPOSE {
            return Err(AppError::Token(ErrorKind::InvalidToken.into()));
        }
        Ok(claims)
    }
}
