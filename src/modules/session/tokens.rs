use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::modules::config::{SecretKey, SessionLifetime};
use crate::modules::encryption::Signer;
use crate::modules::utils::time::{format_duration, get_current_timestamp};

/// Claims carried inside a session token
#[derive(Serialize, Deserialize)]
struct TokenPayload {
    sub: String,
    iat: u64,
    #[serde(default)]
    exp: Option<u64>,
}

/// Opaque signed session token, as stored in the client's cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reasons a presented token is rejected.
///
/// Callers treat every variant as "not logged in"; the distinction is only
/// for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    Forged,
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "session token is malformed"),
            TokenError::Forged => write!(f, "session token signature does not match"),
            TokenError::Expired => write!(f, "session token has expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Mints and verifies stateless session tokens.
///
/// A token is `<payload>.<mac>`, both base64url without padding. The payload
/// is JSON claims and the mac is HMAC-SHA256 over the encoded payload text.
pub struct SessionTokenService {
    signer: Signer,
    lifetime: SessionLifetime,
}

impl SessionTokenService {
    pub fn new(secret: &SecretKey, lifetime: SessionLifetime) -> Self {
        match lifetime.max_age_secs() {
            Some(secs) => info!("Session tokens expire after {}", format_duration(secs)),
            None => warn!("Session tokens are configured to never expire"),
        }
        Self {
            signer: Signer::new(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> SessionLifetime {
        self.lifetime
    }

    /// Sign `identity` into a new token
    pub fn mint(&self, identity: &str) -> SessionToken {
        self.mint_at(identity, get_current_timestamp())
    }

    pub(crate) fn mint_at(&self, identity: &str, now: u64) -> SessionToken {
        let payload = TokenPayload {
            sub: identity.to_string(),
            iat: now,
            exp: self
                .lifetime
                .max_age_secs()
                .map(|secs| now.saturating_add(secs)),
        };
        // Serializing a struct of strings and integers cannot fail
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        let encoded = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.signer.sign(encoded.as_bytes()));

        SessionToken(format!("{}.{}", encoded, signature))
    }

    /// Check a token's signature and expiry and return the identity it carries
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, get_current_timestamp())
    }

    pub(crate) fn verify_at(&self, token: &str, now: u64) -> Result<String, TokenError> {
        let (encoded, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        if signature.contains('.') {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        if !self.signer.verify(encoded.as_bytes(), &signature) {
            return Err(TokenError::Forged);
        }

        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| TokenError::Malformed)?;
        let payload: TokenPayload =
            serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if let Some(exp) = payload.exp {
            if now >= exp {
                return Err(TokenError::Expired);
            }
        }

        Ok(payload.sub)
    }
}
