use hmac::Mac;

use crate::HmacSha256;

/// HMAC-SHA256 signer keyed once with the server secret
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            // HMAC takes keys of any length, so this cannot fail
            mac: <HmacSha256 as Mac>::new_from_slice(secret)
                .expect("HMAC accepts keys of any length"),
        }
    }

    /// Compute the MAC of a message
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    /// Check a MAC in constant time
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.verify_slice(signature).is_ok()
    }
}

/// Constant-time byte comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = Signer::new(b"0123456789abcdef");
        let signature = signer.sign(b"alice");

        assert_eq!(signature.len(), 32);
        assert!(signer.verify(b"alice", &signature));
        assert!(!signer.verify(b"alicf", &signature));

        let mut tampered = signature.clone();
        tampered[0] ^= 0x01;
        assert!(!signer.verify(b"alice", &tampered));
    }

    #[test]
    fn test_different_keys_disagree() {
        let signer = Signer::new(b"0123456789abcdef");
        let other = Signer::new(b"fedcba9876543210");
        let signature = signer.sign(b"alice");
        assert!(!other.verify(b"alice", &signature));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
