//! Tests for logging functionality
//!
//! These tests verify that logging initialization works correctly
//! with different configurations.

use nodescape::core::logging::{init_logging, LogFormat, LoggingConfig};
use std::str::FromStr;

#[test]
fn test_log_format_parsing() {
    assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
    assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
    assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
    assert_eq!(LogFormat::from_str("COMPACT").unwrap(), LogFormat::Compact);
    assert!(LogFormat::from_str("invalid").is_err());
}

#[test]
fn test_log_format_variants() {
    let variants = LogFormat::variants();
    assert!(variants.contains(&"compact"));
    assert!(variants.contains(&"pretty"));
    assert!(variants.contains(&"json"));
}

#[test]
fn test_explicit_filter_directive_is_kept() {
    let config = LoggingConfig::resolve(Some("warn,nodescape::layout=trace"), Some("pretty")).unwrap();
    assert_eq!(config.filter, "warn,nodescape::layout=trace");
    assert_eq!(config.format, LogFormat::Pretty);
}

#[test]
fn test_init_logging_then_work_is_traced() {
    // Only the first install in this process can succeed
    let _ = init_logging(Some("trace"), Some("compact"));
    let _ = init_logging(Some("info"), Some("json"));

    let mut model = nodescape::build(&[nodescape::model::LinkDescriptor::new("a.x", "b.y").into()]);
    assert!(model.layout_all() > 0);
}

#[test]
fn test_init_logging_invalid_format() {
    let result = init_logging(Some("info"), Some("invalid_format"));
    assert!(result.is_err());
}
