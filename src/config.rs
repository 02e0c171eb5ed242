//! # Configuration Management
//!
//! Wire-protocol constants and the runtime configuration for the codec.
//!
//! The constants mirror the BSON and OP_MSG formats and are the hard limits of the
//! crate. [`CodecConfig`] can tighten those limits for a deployment (a lower nesting
//! cap, a smaller frame cap) but validation refuses any attempt to loosen them.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`

use crate::error::{BsonError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Maximum nesting of documents and arrays below the root document
pub const MAX_BSON_DEPTH: usize = 64;

/// Array indices below this value use the precomputed key table
pub const MAX_BSON_INDEX: usize = 1024;

/// Opcode of an OP_MSG frame
pub const OP_MSG_CODE: u32 = 2013;

/// OP_MSG header: five 32-bit fields plus the payload section byte
pub const OP_MSG_HEADER_LEN: usize = 4 * 5 + 1;

/// Flag bit: a CRC-32C checksum trails the message
pub const OP_CHECKSUM: u32 = 1 << 0;

/// Flag bit: the sender will emit another message without waiting
pub const OP_MORE_TO_COME: u32 = 1 << 1;

/// Payload section type for a single BSON document body
pub const PAYLOAD_SECTION_BODY: u8 = 0;

/// Max allowed frame size (16 MiB - 1)
pub const MAX_FRAME_SIZE: usize = 0x00FF_FFFF;

/// Smallest well-formed BSON document (length prefix + terminator)
pub const MIN_DOCUMENT_LEN: usize = 5;

/// Reserved field holding an explicit key/value emission order
pub const ORDER_KEY: &str = "__order";

/// Root configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BsonWireConfig {
    /// Codec limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BsonWireConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| BsonError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| BsonError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| BsonError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(depth) = std::env::var("BSON_WIRE_MAX_DEPTH") {
            if let Ok(val) = depth.parse::<usize>() {
                config.codec.max_depth = val;
            }
        }

        if let Ok(size) = std::env::var("BSON_WIRE_MAX_FRAME_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.codec.max_frame_size = val;
            }
        }

        config.validate_strict()?;
        Ok(config)
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BsonError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Limits applied by encoders, decoders and the stream codec
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum nesting below the root document
    pub max_depth: usize,

    /// Largest frame the stream codec accepts
    pub max_frame_size: usize,

    /// Field name that carries an explicit emission order
    pub order_key: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_BSON_DEPTH,
            max_frame_size: MAX_FRAME_SIZE,
            order_key: String::from(ORDER_KEY),
        }
    }
}

impl CodecConfig {
    /// Nesting cap in effect, never above [`MAX_BSON_DEPTH`]
    #[inline]
    pub fn depth_limit(&self) -> usize {
        self.max_depth.min(MAX_BSON_DEPTH)
    }

    /// Frame cap in effect, never above [`MAX_FRAME_SIZE`]
    #[inline]
    pub fn frame_limit(&self) -> usize {
        self.max_frame_size.min(MAX_FRAME_SIZE)
    }

    /// Pull both limits down to the protocol caps
    pub fn clamped(mut self) -> Self {
        self.max_depth = self.depth_limit();
        self.max_frame_size = self.frame_limit();
        self
    }

    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_depth == 0 {
            errors.push("Max depth must be greater than 0".to_string());
        } else if self.max_depth > MAX_BSON_DEPTH {
            errors.push(format!(
                "Max depth too large: {} (maximum: {MAX_BSON_DEPTH})",
                self.max_depth
            ));
        }

        let min_frame = OP_MSG_HEADER_LEN + MIN_DOCUMENT_LEN;
        if self.max_frame_size < min_frame {
            errors.push(format!(
                "Max frame size too small: {} bytes (minimum: {min_frame})",
                self.max_frame_size
            ));
        } else if self.max_frame_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: {MAX_FRAME_SIZE})",
                self.max_frame_size
            ));
        }

        if self.order_key.is_empty() {
            errors.push("Order key cannot be empty".to_string());
        } else if self.order_key.contains('\0') {
            errors.push("Order key cannot contain NUL bytes".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("bson-wire"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
