// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{auth, config, encryption, session, utils};

// Re-export commonly used types
pub use modules::auth::service::AuthService;
pub use modules::auth::store::{CredentialStore, User, UserId};
pub use modules::config::settings::AppConfig;
pub use modules::session::context::RequestContext;
pub use modules::session::tokens::{SessionToken, SessionTokenService};

// Constants
pub const USERS_FILE: &str = "users.json";
pub const SESSION_COOKIE: &str = "session";
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;
pub const MIN_PASSWORD_ITERATIONS: u32 = 10_000;
pub const DEFAULT_SESSION_MAX_AGE: u64 = 30 * 24 * 3600;
pub const MIN_SECRET_LEN: usize = 16;

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
