//! deptrack web server
//!
//! Binds the router to a TCP listener and runs until Ctrl-C.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use deptrack_core::DeptrackConfig;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Main deptrack web server
pub struct DeptrackServer {
    config: WebConfig,
    state: AppState,
}

impl DeptrackServer {
    /// Create a server, loading settings for `config`
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server from settings the caller already resolved
    pub async fn with_settings(config: WebConfig, settings: DeptrackConfig) -> WebResult<Self> {
        let state = AppState::from_settings(settings).await?;
        Ok(Self { config, state })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!(address = %address, dev_mode = self.config.dev_mode, "Starting deptrack web server");
        if self.state.settings.bootstrap.admin_password == "admin" {
            warn!("Bootstrap administrator still uses the default password");
        }

        start_session_cleanup_task(self.state.clone(), SESSION_CLEANUP_INTERVAL);
        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server shut down");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Purge expired sessions every `period` for the life of the process
fn start_session_cleanup_task(state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;
            match state.application.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Purged expired sessions"),
                Err(e) => warn!(error = %e, "Session cleanup failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Builder for DeptrackServer
pub struct DeptrackServerBuilder {
    config: WebConfig,
}

impl DeptrackServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: WebConfig) -> Self {
        Self { config }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable development mode
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    /// Set database URL
    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database_url = Some(database_url.into());
        self
    }

    /// Read settings from a TOML file
    pub fn config_file<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.config.config_file = Some(path.into());
        self
    }

    /// Build the server
    pub async fn build(self) -> WebResult<DeptrackServer> {
        DeptrackServer::new(self.config).await
    }

    /// Build the server with already resolved settings
    pub async fn build_with(self, mut settings: DeptrackConfig) -> WebResult<DeptrackServer> {
        self.config.apply_to(&mut settings);
        settings.validate()?;
        DeptrackServer::with_settings(self.config, settings).await
    }
}

impl Default for DeptrackServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
