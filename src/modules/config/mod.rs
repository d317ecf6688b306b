pub mod settings;

pub use settings::{AppConfig, ConfigError, LoggingConfig, SecretKey, SessionLifetime};
