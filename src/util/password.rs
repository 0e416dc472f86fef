//! Argon2id password hashes, stored on users as PHC strings.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{debug, error};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),
    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

pub trait PasswordUtils {
    fn hash_password(password: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` for a wrong password; `Err` only when `hash` is unusable.
    fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError>;

    /// Checks the length bounds accepted at registration and profile updates
    fn validate_password_strength(password: &str) -> Result<(), Vec<String>>;
}

pub struct PasswordUtilsImpl;

impl PasswordUtils for PasswordUtilsImpl {
    fn hash_password(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt).map_err(|e| {
            error!("Failed to hash password: {}", e);
            PasswordError::HashingFailed(e.to_string())
        })?;
        Ok(hash.to_string())
    }

    fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!("Stored password hash is unreadable: {}", e);
            PasswordError::InvalidHashFormat
        })?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }

    fn validate_password_strength(password: &str) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let length = password.chars().count();

        if length < MIN_PASSWORD_LEN {
            errors.push(format!("Password must be at least {} characters long", MIN_PASSWORD_LEN));
        }
        if length > MAX_PASSWORD_LEN {
            errors.push(format!("Password must be at most {} characters long", MAX_PASSWORD_LEN));
        }
        if password.trim().is_empty() {
            errors.push("Password must not be blank".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            debug!(problems = errors.len(), "Password rejected");
            Err(errors)
        }
    }
}
