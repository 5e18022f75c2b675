//! Operator authentication.
//!
//! A single operator password, checked against an Argon2 PHC string from
//! configuration. The plain password never leaves this module.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Minimum password length accepted by [`hash_password`].
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too weak to be hashed for use.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing failed")]
    PasswordHash,
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for passwords shorter than
/// [`MIN_PASSWORD_LENGTH`], or `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// A malformed hash counts as a mismatch; configuration loading already
/// rejects those at startup.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("sunrise-pg-204").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("sunrise-pg-204", &hash).is_ok());
        assert!(matches!(
            verify_password("sunrise-pg-205", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_malformed_hash_is_a_mismatch() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
