//! Password hashing for account registration and login
//!
//! Hashes are argon2id PHC strings; the core store only ever sees the
//! encoded string.

use anyhow::{anyhow, bail, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

/// Shortest password accepted at registration
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Check a new password and its confirmation
pub fn check_new_password(password: &str, confirm: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        bail!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        );
    }
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(())
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
