use std::fmt;

use super::store::{
    AuthError, CredentialStore, RegistrationError, StoreError, User, UserId,
    INVALID_CREDENTIALS_MESSAGE,
};
use crate::modules::config::{AppConfig, ConfigError};
use crate::modules::session::context::RequestContext;
use crate::modules::session::cookie::{clear_session_cookie, session_cookie};
use crate::modules::session::tokens::{SessionToken, SessionTokenService};

/// What a successful login hands back to the web layer
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user_id: UserId,
    pub token: SessionToken,
    pub set_cookie: String, // Value for the `Set-Cookie` response header
}

/// Login failure as seen by the end user
#[derive(Debug)]
pub enum LoginError {
    InvalidCredentials,
    Storage(StoreError),
}

impl LoginError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LoginError::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE,
            LoginError::Storage(_) => "A bejelentkezés nem sikerült, próbáld újra később.",
        }
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::InvalidCredentials => write!(f, "invalid credentials"),
            LoginError::Storage(e) => write!(f, "login failed: {}", e),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<AuthError> for LoginError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotFound | AuthError::WrongPassword => LoginError::InvalidCredentials,
            AuthError::Storage(e) => LoginError::Storage(e),
        }
    }
}

/// Reasons the service cannot be built at startup. All are fatal.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Store(StoreError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "{}", e),
            StartupError::Store(e) => write!(f, "Failed to open user store: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(error: ConfigError) -> Self {
        StartupError::Config(error)
    }
}

impl From<StoreError> for StartupError {
    fn from(error: StoreError) -> Self {
        StartupError::Store(error)
    }
}

/// Credential store and token service composed for request handlers.
///
/// Built once at startup and passed by reference to every handler.
pub struct AuthService {
    credentials: CredentialStore,
    tokens: SessionTokenService,
}

impl AuthService {
    pub fn new(credentials: CredentialStore, tokens: SessionTokenService) -> Self {
        Self {
            credentials,
            tokens,
        }
    }

    /// Build the service from configuration, refusing to start without a secret
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let secret = config.secret_key()?;
        let tokens = SessionTokenService::new(&secret, config.session_lifetime);
        let credentials = CredentialStore::open(&config.users_file, config.password_iterations)?;
        Ok(Self::new(credentials, tokens))
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn tokens(&self) -> &SessionTokenService {
        &self.tokens
    }

    pub fn register(&self, name: &str, password: &str) -> Result<UserId, RegistrationError> {
        self.credentials.register(name, password)
    }

    /// Check credentials and mint a session for the user
    pub fn login(&self, name: &str, password: &str) -> Result<LoginSession, LoginError> {
        let user_id = self.credentials.verify(name, password)?;
        let token = self.tokens.mint(name);
        let set_cookie = session_cookie(&token, self.tokens.lifetime());
        Ok(LoginSession {
            user_id,
            token,
            set_cookie,
        })
    }

    /// Resolve the authentication state of an incoming request
    pub fn request_context(&self, cookie_header: Option<&str>) -> RequestContext {
        RequestContext::from_cookies(&self.tokens, cookie_header)
    }

    /// The full user record behind a request, re-read from the store each time
    pub fn current_user(&self, ctx: &RequestContext) -> Result<Option<User>, StoreError> {
        match ctx.identity() {
            Some(name) => self.credentials.find_by_name(name),
            None => Ok(None),
        }
    }

    /// `Set-Cookie` value that ends the session on this client
    pub fn logout(&self) -> String {
        clear_session_cookie()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::config::{SecretKey, SessionLifetime};
    use tempfile::TempDir;

    fn service() -> AuthService {
        let secret = SecretKey::new("test-secret-0123456789").unwrap();
        AuthService::new(
            CredentialStore::in_memory(1_000),
            SessionTokenService::new(&secret, SessionLifetime::MaxAgeSecs(3600)),
        )
    }

    #[test]
    fn test_login_issues_cookie() {
        let auth = service();
        let id = auth.register("alice", "s3cret").unwrap();

        let session = auth.login("alice", "s3cret").unwrap();
        assert_eq!(session.user_id, id);
        assert!(session
            .set_cookie
            .starts_with(&format!("session={};", session.token)));
        assert!(session.set_cookie.contains("HttpOnly"));
        assert_eq!(auth.tokens().verify(session.token.as_str()).unwrap(), "alice");
    }

    #[test]
    fn test_login_failures_are_uniform() {
        let auth = service();
        auth.register("alice", "s3cret").unwrap();

        let unknown = auth.login("mallory", "s3cret").unwrap_err();
        let wrong = auth.login("alice", "nope").unwrap_err();
        assert!(matches!(unknown, LoginError::InvalidCredentials));
        assert!(matches!(wrong, LoginError::InvalidCredentials));
        assert_eq!(unknown.user_message(), wrong.user_message());
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn test_current_user_follows_cookie() {
        let auth = service();
        let id = auth.register("alice", "s3cret").unwrap();
        let session = auth.login("alice", "s3cret").unwrap();

        let header = format!("lang=hu; session={}", session.token);
        let ctx = auth.request_context(Some(&header));
        let user = auth.current_user(&ctx).unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "alice");

        let anonymous = auth.request_context(None);
        assert!(auth.current_user(&anonymous).unwrap().is_none());
    }

    #[test]
    fn test_logout_clears_cookie() {
        let auth = service();
        assert!(auth.logout().contains("Max-Age=0"));
    }

    #[test]
    fn test_from_config_requires_secret() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.users_file = dir.path().join("users.json");

        assert!(matches!(
            AuthService::from_config(&config),
            Err(StartupError::Config(ConfigError::MissingSecret))
        ));

        config.secret_key = Some("tiny".to_string());
        assert!(matches!(
            AuthService::from_config(&config),
            Err(StartupError::Config(ConfigError::WeakSecret(_)))
        ));

        config.secret_key = Some("test-secret-0123456789".to_string());
        config.password_iterations = crate::MIN_PASSWORD_ITERATIONS;
        let auth = AuthService::from_config(&config).unwrap();
        assert!(auth.credentials().is_empty().unwrap());
        assert_eq!(
            auth.credentials().path(),
            Some(dir.path().join("users.json").as_path())
        );
    }
}
