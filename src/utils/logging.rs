//! Structured logging setup.
//!
//! The codec itself only emits `tracing` events; applications embedding it call
//! [`init_logging`] once to install a subscriber. `RUST_LOG` overrides the
//! configured level when set.

use crate::config::LoggingConfig;
use crate::error::{BsonError, Result};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber built from `config`.
///
/// Fails with `ConfigError` if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| BsonError::ConfigError(format!("Failed to install logger: {e}")))?;
    tracing::info!(app = %config.app_name, "Logging initialized");
    Ok(())
}
