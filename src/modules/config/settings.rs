use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{
    DEFAULT_PASSWORD_ITERATIONS, DEFAULT_SESSION_MAX_AGE, MIN_PASSWORD_ITERATIONS, MIN_SECRET_LEN,
    USERS_FILE,
};

/// Environment variable holding the session signing secret
pub const SECRET_KEY_ENV: &str = "HOMESTEAD_SECRET_KEY";

/// Environment variable overriding the credential store location
pub const USERS_FILE_ENV: &str = "HOMESTEAD_USERS_FILE";

/// Errors raised while loading configuration at startup
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    MissingSecret,
    WeakSecret(usize),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read configuration: {}", e),
            ConfigError::Parse(msg) => write!(f, "Invalid configuration file: {}", msg),
            ConfigError::MissingSecret => write!(
                f,
                "No session secret configured; set {} or `secret_key`",
                SECRET_KEY_ENV
            ),
            ConfigError::WeakSecret(len) => write!(
                f,
                "Session secret is {} bytes, at least {} are required",
                len, MIN_SECRET_LEN
            ),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::Io(error)
    }
}

/// How long a session token stays valid after it is minted
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionLifetime {
    /// Tokens never expire. Must be chosen explicitly.
    Indefinite,
    MaxAgeSecs(u64),
}

impl SessionLifetime {
    pub fn max_age_secs(&self) -> Option<u64> {
        match self {
            SessionLifetime::Indefinite => None,
            SessionLifetime::MaxAgeSecs(secs) => Some(*secs),
        }
    }
}

impl Default for SessionLifetime {
    fn default() -> Self {
        SessionLifetime::MaxAgeSecs(DEFAULT_SESSION_MAX_AGE)
    }
}

/// Server-held secret used to sign session tokens.
///
/// Only constructible through validation, so holding one means the process
/// has a usable key. The value never appears in `Debug` output.
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if trimmed.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret(trimmed.len()));
        }
        Ok(Self(trimmed.as_bytes().to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Application configuration, read once at startup
#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub users_file: PathBuf,
    pub secret_key: Option<String>,
    pub session_lifetime: SessionLifetime,
    pub password_iterations: u32,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from(USERS_FILE),
            secret_key: None,
            session_lifetime: SessionLifetime::default(),
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
            logging: LoggingConfig::default(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("users_file", &self.users_file)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("session_lifetime", &self.session_lifetime)
            .field("password_iterations", &self.password_iterations)
            .field("logging", &self.logging)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SECRET_KEY_ENV) {
            self.secret_key = Some(secret);
        }
        if let Some(users_file) = lookup(USERS_FILE_ENV) {
            self.users_file = PathBuf::from(users_file);
        }
    }

    /// Check settings that do not involve the secret
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.password_iterations < MIN_PASSWORD_ITERATIONS {
            return Err(ConfigError::Invalid(format!(
                "password_iterations must be at least {}",
                MIN_PASSWORD_ITERATIONS
            )));
        }
        if self.session_lifetime == SessionLifetime::MaxAgeSecs(0) {
            return Err(ConfigError::Invalid(
                "session_lifetime max_age_secs must be positive; use \"indefinite\" to disable expiry"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// The signing secret. Absent or unusable secrets are fatal.
    pub fn secret_key(&self) -> Result<SecretKey, ConfigError> {
        match &self.secret_key {
            Some(secret) => SecretKey::new(secret),
            None => Err(ConfigError::MissingSecret),
        }
    }
}
