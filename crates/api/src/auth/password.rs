//! Password storage: Argon2id in PHC string format, computed on the blocking
//! pool so request tasks are never stalled by the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use ctrack_core::error::CoreError;

use crate::error::AppError;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must be at least {min} characters long")]
    TooShort { min: usize },

    /// A stored hash that is not a valid PHC string, or a hasher failure.
    #[error("Password hash error: {0}")]
    Hash(argon2::password_hash::Error),

    #[error("Password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort { .. } => AppError::Core(CoreError::Validation(err.to_string())),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

/// Length is counted in characters, not bytes.
pub fn check_length(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Hash a password chosen by a user: length check, then hash.
pub async fn hash_new(password: String) -> Result<String, PasswordError> {
    check_length(&password)?;
    hash(password).await
}

pub async fn hash(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_sync(&password)).await?
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is
/// unusable.
pub async fn verify(password: String, stored_hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_sync(&password, &stored_hash)).await?
}

fn hash_sync(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordError::Hash)
}

fn verify_sync(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(PasswordError::Hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hash(e)),
    }
}
