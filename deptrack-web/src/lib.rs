//! deptrack web server
//!
//! JSON API over [`deptrack_applications::DeptrackApplication`]. The session
//! token travels in an HttpOnly cookie; every guarded route resolves it into a
//! `SessionContext` before calling the application.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;

pub use error::ApiError;
pub use server::{DeptrackServer, DeptrackServerBuilder};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method},
    Router,
};
use deptrack_core::DeptrackConfig;
use std::path::PathBuf;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let router = Router::new()
        .merge(routes::health_routes())
        .merge(routes::page_routes())
        .nest("/auth", routes::auth_routes())
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    // The browser frontend runs on its own port during development
    let router = if state.dev_mode() {
        router.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_credentials(true)
                .allow_headers([CONTENT_TYPE]),
        )
    } else {
        router
    };

    router.with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
    /// Database URL, overriding the one from the settings file
    pub database_url: Option<String>,
    /// Optional TOML settings file
    pub config_file: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            database_url: None,
            config_file: None,
        }
    }
}

impl WebConfig {
    /// Take server values from already layered settings
    pub fn from_settings(settings: &DeptrackConfig) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            dev_mode: settings.server.dev_mode,
            database_url: Some(settings.database.url.clone()),
            config_file: None,
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Layered settings with this configuration's overrides applied
    pub fn load_settings(&self) -> WebResult<DeptrackConfig> {
        let mut settings = DeptrackConfig::load(self.config_file.as_deref())?;
        self.apply_to(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    /// Copy the server overrides into `settings`
    pub fn apply_to(&self, settings: &mut DeptrackConfig) {
        settings.server.host = self.host.clone();
        settings.server.port = self.port;
        settings.server.dev_mode = self.dev_mode;
        if let Some(url) = &self.database_url {
            settings.database.url = url.clone();
        }
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] deptrack_core::DeptrackError),

    #[error("Application error: {0}")]
    Application(#[from] deptrack_applications::ApplicationError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;
