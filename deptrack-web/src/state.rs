//! Shared application state

use crate::{WebConfig, WebResult};
use deptrack_applications::DeptrackApplication;
use deptrack_core::{performance, DeptrackConfig, SessionConfig};
use std::sync::Arc;
use tracing::info;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Resolved settings
    pub settings: Arc<DeptrackConfig>,
    /// Stores, guard and audit trail
    pub application: Arc<DeptrackApplication>,
}

impl AppState {
    /// Load settings for `config` and open the database
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let settings = config.load_settings()?;
        Self::from_settings(settings).await
    }

    /// Build state from already resolved settings
    pub async fn from_settings(settings: DeptrackConfig) -> WebResult<Self> {
        let application = performance::measure_async(
            "application_startup",
            DeptrackApplication::from_config(&settings),
        )
        .await?;
        info!(
            database = %settings.database.url,
            sessions = ?settings.session.backend,
            "Application state initialized"
        );

        Ok(Self {
            settings: Arc::new(settings),
            application: Arc::new(application),
        })
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.settings.session
    }

    pub fn dev_mode(&self) -> bool {
        self.settings.server.dev_mode
    }
}
