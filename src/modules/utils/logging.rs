use env_logger::{Builder, WriteStyle};
use log::{error, info, warn, LevelFilter};
use std::fs::OpenOptions;
use std::str::FromStr;

use crate::modules::config::settings::LoggingConfig;

/// Initialize the logging system, writing to the configured file or stderr.
///
/// `RUST_LOG` still takes precedence over the configured level so operators
/// can raise verbosity for a single run.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let level = LevelFilter::from_str(&config.level).unwrap_or(LevelFilter::Info);

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .format_module_path(true)
        .write_style(WriteStyle::Auto);

    if let Some(path) = &config.file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;

    info!("Logging system initialized at level {}", level);
    Ok(())
}

/// Mask a user name for logging, keeping only its first and last two characters
fn format_sensitive(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Structured logging for authentication events
pub fn log_auth_event(event_type: &str, username: &str, success: bool, details: Option<&str>) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Auth event: type={}, user={}, success=true, timestamp={}, details={:?}",
            event_type,
            format_sensitive(username),
            timestamp,
            details
        );
    } else {
        warn!(
            "Auth event: type={}, user={}, success=false, timestamp={}, details={:?}",
            event_type,
            format_sensitive(username),
            timestamp,
            details
        );
    }
}

/// Structured logging for credential store writes
pub fn log_data_operation(
    operation: &str,
    user: &str,
    resource: &str,
    success: bool,
    details: Option<&str>,
) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Data operation: op={}, user={}, resource={}, success=true, timestamp={}, details={:?}",
            operation,
            format_sensitive(user),
            resource,
            timestamp,
            details
        );
    } else {
        error!(
            "Data operation: op={}, user={}, resource={}, success=false, timestamp={}, details={:?}",
            operation,
            format_sensitive(user),
            resource,
            timestamp,
            details
        );
    }
}
