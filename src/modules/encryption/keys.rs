use crate::HmacSha256;
use pbkdf2::pbkdf2;
use rand::RngCore;

/// Salt length in bytes for password hashing
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes
pub const KEY_LEN: usize = 32;

/// Function to generate a random salt for PBKDF2
pub fn generate_random_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Function to derive a 32-byte key from a password using PBKDF2-HMAC-SHA256
pub fn derive_key_from_password(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut key = vec![0u8; KEY_LEN];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations.max(1), &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation() {
        let password = "s3cret";
        let salt = generate_random_salt();

        let key = derive_key_from_password(password, &salt, 1_000);
        assert_eq!(key.len(), KEY_LEN);

        let key2 = derive_key_from_password(password, &salt, 1_000);
        assert_eq!(key, key2);

        let key3 = derive_key_from_password("other", &salt, 1_000);
        assert_ne!(key, key3);

        let different_salt = generate_random_salt();
        let key4 = derive_key_from_password(password, &different_salt, 1_000);
        assert_ne!(key, key4);

        // Work factor is part of the derivation
        let key5 = derive_key_from_password(password, &salt, 1_001);
        assert_ne!(key, key5);
    }

    #[test]
    fn test_random_salt() {
        let salt1 = generate_random_salt();
        let salt2 = generate_random_salt();
        assert_eq!(salt1.len(), SALT_LEN);
        assert_ne!(salt1, salt2);
    }
}
