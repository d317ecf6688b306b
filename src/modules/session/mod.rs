pub mod context;
pub mod cookie;
pub mod tokens;

// Re-export the main types and functions
pub use context::{RequestContext, Unauthenticated};
pub use cookie::{clear_session_cookie, session_cookie, session_from_cookie_header};
pub use tokens::{SessionToken, SessionTokenService, TokenError};
