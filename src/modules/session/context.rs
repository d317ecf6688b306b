use log::debug;
use std::fmt;

use super::cookie::session_from_cookie_header;
use super::tokens::SessionTokenService;

/// Returned when a handler needs a logged-in user and the request has none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthenticated;

impl fmt::Display for Unauthenticated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication required")
    }
}

impl std::error::Error for Unauthenticated {}

/// Per-request authentication state, resolved once before any handler runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    identity: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn authenticated(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
        }
    }

    /// Resolve the context from the request's `Cookie` header.
    ///
    /// A missing, malformed, forged or expired token leaves the request
    /// anonymous.
    pub fn from_cookies(tokens: &SessionTokenService, cookie_header: Option<&str>) -> Self {
        let Some(token) = cookie_header.and_then(session_from_cookie_header) else {
            return Self::anonymous();
        };

        match tokens.verify(token) {
            Ok(identity) => Self::authenticated(identity),
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                Self::anonymous()
            }
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Gate for handlers that only serve logged-in users
    pub fn require_identity(&self) -> Result<&str, Unauthenticated> {
        self.identity().ok_or(Unauthenticated)
    }
}
