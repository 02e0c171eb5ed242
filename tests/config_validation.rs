//! Integration tests for configuration loading and validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bson_wire::config::{BsonWireConfig, CodecConfig, LoggingConfig, MAX_BSON_DEPTH, MAX_FRAME_SIZE};
use bson_wire::BsonError;
use std::io::Write;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = BsonWireConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert_eq!(config.codec.max_depth, MAX_BSON_DEPTH);
    assert_eq!(config.codec.max_frame_size, MAX_FRAME_SIZE);
    assert_eq!(config.codec.order_key, "__order");
}

#[test]
fn test_zero_depth() {
    let mut config = BsonWireConfig::default();
    config.codec.max_depth = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Max depth must be greater than 0")));
}

#[test]
fn test_depth_cannot_be_loosened() {
    let mut config = BsonWireConfig::default();
    config.codec.max_depth = MAX_BSON_DEPTH + 1;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Max depth too large")));
}

#[test]
fn test_frame_size_bounds() {
    let mut config = BsonWireConfig::default();
    config.codec.max_frame_size = 10;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Max frame size too small")));

    config.codec.max_frame_size = MAX_FRAME_SIZE + 1;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Max frame size too large")));

    config.codec.max_frame_size = 26;
    assert!(config.validate().is_empty());
}

#[test]
fn test_order_key_rules() {
    let mut codec = CodecConfig::default();
    codec.order_key = String::new();
    assert!(codec.validate().iter().any(|e| e.contains("cannot be empty")));

    codec.order_key = "bad\0key".to_string();
    assert!(codec.validate().iter().any(|e| e.contains("NUL")));
}

#[test]
fn test_empty_app_name() {
    let logging = LoggingConfig {
        app_name: String::new(),
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("Application name cannot be empty")));
}

#[test]
fn test_multiple_errors_collected() {
    let mut config = BsonWireConfig::default();
    config.codec.max_depth = 0;
    config.codec.max_frame_size = 1;
    config.logging.app_name = String::new();

    assert_eq!(config.validate().len(), 3);
    match config.validate_strict() {
        Err(BsonError::ConfigError(msg)) => {
            assert!(msg.contains("Configuration validation failed"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = BsonWireConfig::from_toml(
        r#"
        [codec]
        max_depth = 16

        [logging]
        log_level = "debug"
        "#,
    )
    .expect("valid toml");

    assert_eq!(config.codec.max_depth, 16);
    assert_eq!(config.codec.max_frame_size, MAX_FRAME_SIZE);
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.validate_strict().is_ok());
}

#[test]
fn test_invalid_log_level_rejected() {
    let result = BsonWireConfig::from_toml("[logging]\nlog_level = \"loud\"\n");
    assert!(matches!(result, Err(BsonError::ConfigError(_))));
}

#[test]
fn test_example_config_parses() {
    let text = BsonWireConfig::example_config();
    let parsed = BsonWireConfig::from_toml(&text).expect("example should parse");
    assert_eq!(parsed.codec, CodecConfig::default());
}

#[test]
fn test_from_file() {
    let path = std::env::temp_dir().join(format!("bson-wire-config-{}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).expect("create temp file");
    writeln!(file, "[codec]\nmax_frame_size = 4096").expect("write temp file");
    drop(file);

    let config = BsonWireConfig::from_file(&path).expect("load config");
    std::fs::remove_file(&path).ok();
    assert_eq!(config.codec.max_frame_size, 4096);

    assert!(matches!(
        BsonWireConfig::from_file("/nonexistent/bson-wire.toml"),
        Err(BsonError::ConfigError(_))
    ));
}

#[test]
fn test_from_env_overrides() {
    // one test owns these variables so parallel tests cannot interleave
    std::env::set_var("BSON_WIRE_MAX_DEPTH", "12");
    std::env::set_var("BSON_WIRE_MAX_FRAME_SIZE", "not-a-number");
    let config = BsonWireConfig::from_env().expect("env config");
    assert_eq!(config.codec.max_depth, 12);
    assert_eq!(config.codec.max_frame_size, MAX_FRAME_SIZE);

    std::env::set_var("BSON_WIRE_MAX_DEPTH", "1000");
    std::env::set_var("BSON_WIRE_MAX_FRAME_SIZE", "1024");
    let loosened = BsonWireConfig::from_env();

    std::env::set_var("BSON_WIRE_MAX_DEPTH", "64");
    std::env::set_var("BSON_WIRE_MAX_FRAME_SIZE", "33554432");
    let oversized = BsonWireConfig::from_env();

    std::env::remove_var("BSON_WIRE_MAX_DEPTH");
    std::env::remove_var("BSON_WIRE_MAX_FRAME_SIZE");

    match loosened {
        Err(BsonError::ConfigError(msg)) => assert!(msg.contains("Max depth too large")),
        other => panic!("expected config error, got {other:?}"),
    }
    match oversized {
        Err(BsonError::ConfigError(msg)) => assert!(msg.contains("Max frame size too large")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_clamped_limits() {
    let loose = CodecConfig {
        max_depth: 1000,
        max_frame_size: usize::MAX,
        ..CodecConfig::default()
    };
    assert_eq!(loose.depth_limit(), MAX_BSON_DEPTH);
    assert_eq!(loose.frame_limit(), MAX_FRAME_SIZE);
    assert!(loose.clone().clamped().validate().is_empty());

    let tight = CodecConfig {
        max_depth: 8,
        max_frame_size: 4096,
        ..CodecConfig::default()
    };
    assert_eq!(tight.clone().clamped(), tight);
}
