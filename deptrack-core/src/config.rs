//! Configuration loading
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `DEPTRACK__SECTION__KEY` environment variables. `DATABASE_URL` is honoured
//! last so existing deployments keep working.

use crate::error::{DeptrackError, DeptrackResult, ErrorContext};
use crate::types::DeptrackConfig;
use std::path::Path;

const ENV_PREFIX: &str = "DEPTRACK";

impl DeptrackConfig {
    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> DeptrackResult<Self> {
        let defaults = config::Config::try_from(&DeptrackConfig::default()).map_err(|e| {
            DeptrackError::Config {
                message: format!("Failed to build default config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config").with_operation("defaults"),
            }
        })?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut loaded: DeptrackConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DeptrackError::Config {
                message: format!("Failed to load config: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("load")
                    .with_suggestion("Check TOML syntax and DEPTRACK__* variables"),
            })?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            loaded.database.url = url;
        }

        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from a TOML file without environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> DeptrackResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeptrackError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: DeptrackConfig = toml::from_str(&content).map_err(|e| DeptrackError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DeptrackResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DeptrackError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| DeptrackError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> DeptrackResult<()> {
        if self.server.port == 0 {
            return Err(crate::config_error!(
                "server.port must be greater than 0",
                "config"
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(crate::validation_error!(
                "database.url must not be empty",
                "database.url",
                "config"
            ));
        }

        if self.database.max_connections == 0 {
            return Err(crate::validation_error!(
                "database.max_connections must be greater than 0",
                "database.max_connections",
                "config"
            ));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(crate::validation_error!(
                "session.cookie_name must not be empty",
                "session.cookie_name",
                "config"
            ));
        }

        if self.session.max_age_hours == 0 {
            return Err(crate::validation_error!(
                "session.max_age_hours must be greater than 0",
                "session.max_age_hours",
                "config"
            ));
        }

        if self.bootstrap.admin_username.trim().is_empty()
            || self.bootstrap.admin_password.is_empty()
        {
            return Err(crate::validation_error!(
                "bootstrap admin credentials must not be empty",
                "bootstrap",
                "config"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;

    #[test]
    fn test_default_config_is_valid() {
        let config = DeptrackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.bootstrap.admin_username, "admin");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deptrack.toml");

        let mut config = DeptrackConfig::default();
        config.server.port = 9090;
        config.logging.format = LogFormat::Json;
        config.save_to_file(&path).unwrap();

        let loaded = DeptrackConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 9090);
        assert_eq!(loaded.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deptrack.toml");
        std::fs::write(&path, "[server]\nport = 3000\n").unwrap();

        let loaded = DeptrackConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 3000);
        assert_eq!(loaded.server.host, "127.0.0.1");
        assert_eq!(loaded.database.max_connections, 5);
    }

    #[test]
    fn test_validation_rejects_empty_database_url() {
        let mut config = DeptrackConfig::default();
        config.database.url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_lifetime() {
        let mut config = DeptrackConfig::default();
        assert_eq!(config.session.max_age_hours, 24);
        assert_eq!(config.session.max_age_secs(), 86_400);

        config.session.max_age_hours = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.max_age_hours"));
    }

    #[test]
    fn test_in_memory_detection() {
        let mut config = DeptrackConfig::default();
        assert!(!config.database.is_in_memory());
        config.database.url = "sqlite::memory:".to_string();
        assert!(config.database.is_in_memory());
    }
}
