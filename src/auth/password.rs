//! Argon2id password hashing.
//!
//! Hashing is deliberately expensive, so both operations run on the blocking
//! pool instead of a runtime worker.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;

/// Hashes `password` into a PHC string suitable for the `users.password` column.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| AppError::PasswordHash(e.to_string()))?
}

/// Checks `password` against a stored PHC string.
///
/// A mismatch is `Ok(false)`; a stored value that is not a PHC string is an error.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| AppError::PasswordHash(format!("invalid stored hash: {}", e)))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::PasswordHash(e.to_string())),
        }
    })
    .await
    .map_err(|e| AppError::PasswordHash(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("hunter2").await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash).await.unwrap());
        assert!(!verify_password("hunter3", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn salted_hashes_differ() {
        let first = hash_password("same").await.unwrap();
        let second = hash_password("same").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn malformed_stored_hash() {
        let result = verify_password("hunter2", "plaintext-from-an-old-import").await;
        assert!(matches!(result, Err(AppError::PasswordHash(_))));
    }
}
