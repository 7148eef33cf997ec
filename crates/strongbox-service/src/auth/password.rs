use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::AuthError;

const MAX_USERNAME_LENGTH: usize = 64;

/// Hash verified when the username does not exist, so that unknown users cost
/// as much as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("strongbox-timing-equalizer").ok());

/// ## Summary
/// Hashes a password using Argon2id with a random salt.
///
/// ## Errors
/// Returns an error if password hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(format!("Failed to hash password: {e}")))?;

    Ok(password_hash.to_string())
}

/// ## Summary
/// Verifies a password against a stored Argon2 hash.
///
/// Returns `Ok(())` if the password matches the hash. The comparison inside
/// Argon2 is constant time.
///
/// ## Errors
/// Returns `InvalidCredentials` on mismatch and `Hashing` if the stored hash is malformed.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AuthError::Hashing(format!("Invalid password hash: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|err| {
            tracing::trace!("Password verification failed: {}", err);
            AuthError::InvalidCredentials
        })
}

/// ## Summary
/// Runs a verification against a fixed hash and discards the result.
pub fn burn_verification(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _mismatch = verify_password(password, hash).is_ok();
    }
}

/// Minimum requirements for new passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    /// ## Errors
    /// Returns `WeakCredentials` if the password is empty or shorter than the minimum.
    pub fn check(&self, password: &str) -> Result<(), AuthError> {
        let length = password.chars().count();
        if length == 0 {
            return Err(AuthError::WeakCredentials(
                "password must not be empty".to_string(),
            ));
        }
        if length < self.min_length {
            return Err(AuthError::WeakCredentials(format!(
                "password must be at least {} characters",
                self.min_length
            )));
        }
        Ok(())
    }
}

/// ## Errors
/// Returns `WeakCredentials` if the username is empty, too long, or contains
/// whitespace, control characters or a slash.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::WeakCredentials(
            "username must not be empty".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::WeakCredentials(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if username
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '/')
    {
        return Err(AuthError::WeakCredentials(
            "username contains forbidden characters".to_string(),
        ));
    }
    Ok(())
}
