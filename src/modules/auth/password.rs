use std::fmt;
use std::io;

use super::store::RegistrationError;
use crate::modules::encryption::{constant_time_eq, derive_key_from_password, generate_random_salt};

/// Scheme tag at the start of every stored hash
pub const HASH_SCHEME: &str = "pbkdf2_sha256";

/// A stored password hash that cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    Malformed,
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::Malformed => write!(f, "stored password hash is malformed"),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Hash a password with a fresh random salt.
///
/// Output format: `pbkdf2_sha256$<iterations>$<salt hex>$<hash hex>`. The
/// work factor travels with the hash so it can be raised later without
/// breaking existing users.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_random_salt();
    let hash = derive_key_from_password(password, &salt, iterations);
    format!(
        "{}${}${}${}",
        HASH_SCHEME,
        iterations,
        hex::encode(&salt),
        hex::encode(hash)
    )
}

/// Check a password against a stored hash in constant time
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, PasswordError> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(PasswordError::Malformed);
    };

    if scheme != HASH_SCHEME {
        return Err(PasswordError::Malformed);
    }
    let iterations: u32 = iterations.parse().map_err(|_| PasswordError::Malformed)?;
    if iterations == 0 {
        return Err(PasswordError::Malformed);
    }
    let salt = hex::decode(salt).map_err(|_| PasswordError::Malformed)?;
    let expected = hex::decode(hash).map_err(|_| PasswordError::Malformed)?;

    let candidate = derive_key_from_password(password, &salt, iterations);
    Ok(constant_time_eq(&candidate, &expected))
}

/// Registration input check: both fields are required.
///
/// No strength rules are applied. A name made only of whitespace counts as
/// empty.
pub fn validate_credentials(name: &str, password: &str) -> Result<(), RegistrationError> {
    if name.trim().is_empty() || password.is_empty() {
        return Err(RegistrationError::InvalidInput);
    }
    Ok(())
}

/// Helper function to read a password securely
pub fn read_password() -> io::Result<String> {
    rpassword::read_password()
}
