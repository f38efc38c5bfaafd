//! Configuration data types

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for a deptrack deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeptrackConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub bootstrap: BootstrapConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:instance/app.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:instance/app.db".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// In-memory SQLite databases are private to each connection.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Credentials for the administrator created when none exists at start-up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_password: String,
    pub admin_name: String,
    pub admin_position: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            admin_name: "System Administrator".to_string(),
            admin_position: "System Administrator".to_string(),
        }
    }
}

/// Where session state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Process memory; sessions end with the process
    Memory,
    /// The configured database, shared by every process using it
    Database,
}

/// Session cookie and store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub cookie_name: String,
    /// Mark the cookie `Secure` (HTTPS only)
    pub secure_cookie: bool,
    /// Sessions older than this are treated as logged out
    pub max_age_hours: u32,
}

impl SessionConfig {
    /// Session lifetime in seconds
    pub fn max_age_secs(&self) -> i64 {
        i64::from(self.max_age_hours) * 3600
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            cookie_name: "deptrack_session".to_string(),
            secure_cookie: false,
            max_age_hours: 24,
        }
    }
}
