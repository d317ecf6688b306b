pub mod password;
pub mod service;
pub mod store;

// Re-export the main types and functions
pub use password::{hash_password, validate_credentials, verify_password, PasswordError};
pub use service::{AuthService, LoginError, LoginSession, StartupError};
pub use store::{
    AuthError, CredentialStore, RegistrationError, StoreError, User, UserId, UserStore,
    INVALID_CREDENTIALS_MESSAGE,
};
