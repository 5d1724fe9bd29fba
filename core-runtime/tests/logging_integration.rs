//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{redact_if_sensitive, strip_path, LogFormat, LoggingConfig};

#[test]
fn test_logging_config_chaining() {
    // Logging can only be initialized once per process, so only the builder
    // is exercised here.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_identifiers);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

#[test]
fn test_redaction_defaults_on() {
    assert!(LoggingConfig::default().redact_identifiers);
}

#[test]
fn test_tag_identifiers_keep_suffix() {
    let redacted = redact_if_sensitive("tag_id", "E0:04:01:50:8A:2B:3C");
    assert_eq!(redacted, "***B:3C");
    assert!(!redacted.contains("E0:04"));

    assert_eq!(redact_if_sensitive("serial_number", "SN-998877"), "***8877");
}

#[test]
fn test_secrets_fully_redacted() {
    assert_eq!(redact_if_sensitive("license_token", "abc-123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
}

#[test]
fn test_plain_values_pass_through() {
    assert_eq!(redact_if_sensitive("subscription", "3"), "3");
    assert_eq!(redact_if_sensitive("kind", "tagConnected"), "tagConnected");
    assert_eq!(redact_if_sensitive("operation", "setConfig"), "setConfig");
}

#[test]
fn test_resource_paths_stripped() {
    assert_eq!(strip_path("/data/app/lib/arm64/libndef.so"), "libndef.so");
    assert_eq!(strip_path("C:\\Program Files\\TagReader\\Msg.dll"), "Msg.dll");
    assert_eq!(strip_path(""), "");
}
