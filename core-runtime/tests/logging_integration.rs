//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{redact_if_sensitive, strip_path, LogFormat, LoggingConfig};

#[test]
fn test_logging_initialization() {
    // Logging can only be initialized once per process, so we test the config builder
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_pii_redaction(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.redact_pii);
}

#[test]
fn test_pii_redaction_credentials() {
    assert_eq!(redact_if_sensitive("access_token", "2.00xyz"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("refresh_token", "r"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("login_password", "pw"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("app_key", "1234"), "[REDACTED]");
}

#[test]
fn test_pii_redaction_normal_values() {
    assert_eq!(redact_if_sensitive("channel", "test_weibo"), "test_weibo");
    assert_eq!(redact_if_sensitive("platform", "RenrenStatus"), "RenrenStatus");
    assert_eq!(redact_if_sensitive("attempt", "3"), "3");
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/home/user/weibo.token.save"), "weibo.token.save");
    assert_eq!(strip_path("D:\\data\\rr.token.save"), "rr.token.save");
    assert_eq!(strip_path("filename.txt"), "filename.txt");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_init_logging_twice_fails() {
    let config = LoggingConfig::default().with_format(LogFormat::Compact);
    assert!(core_runtime::logging::init_logging(config.clone()).is_ok());
    assert!(core_runtime::logging::init_logging(config).is_err());
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_auth=notalevel");
    assert!(core_runtime::logging::init_logging(config).is_err());
}
