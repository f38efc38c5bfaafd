//! Integration tests for deptrack-core infrastructure

use deptrack_core::{
    config_error, init_logging, DeptrackConfig, DeptrackError, ErrorContext, LogFormat,
    LoggingConfig,
};

#[test]
fn test_error_handling() {
    let error = DeptrackError::Storage {
        message: "disk full".to_string(),
        source: None,
        context: ErrorContext::new("sqlite").with_operation("insert"),
    };

    match &error {
        DeptrackError::Storage {
            message, context, ..
        } => {
            assert_eq!(message, "disk full");
            assert_eq!(context.component, "sqlite");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected Storage error"),
    }

    // Should not panic
    error.log();

    let config_error = config_error!("Invalid config", "test");
    assert!(!config_error.is_recoverable());
}

#[test]
fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        filter_directives: vec!["deptrack_core=debug".to_string()],
        ..LoggingConfig::default()
    };

    // A second initialisation in the same process reports an error instead of panicking.
    let _ = init_logging(&config);
    assert!(init_logging(&config).is_err());
}

#[test]
fn test_load_with_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deptrack.toml");
    std::fs::write(
        &path,
        r#"
[server]
host = "0.0.0.0"
port = 5000

[bootstrap]
admin_password = "s3cret"
"#,
    )
    .unwrap();

    let config = DeptrackConfig::load(Some(&path)).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.bootstrap.admin_password, "s3cret");
    assert_eq!(config.bootstrap.admin_username, "admin");
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    assert!(DeptrackConfig::load(Some(&path)).is_err());
}
