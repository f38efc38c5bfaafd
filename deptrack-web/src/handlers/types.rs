//! Request and response bodies shared by the handlers

use chrono::{DateTime, Utc};
use deptrack_applications::{ActivityLogEntry, UserSummary};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub redirect: String,
    pub user: UserSummary,
}

/// Plain acknowledgement, optionally pointing the client somewhere
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl MessageResponse {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect: None,
        }
    }

    pub fn redirect<S: Into<String>, R: Into<String>>(message: S, redirect: R) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect: Some(redirect.into()),
        }
    }
}

/// Free-text filter used by the record listings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Optional folder restriction for material listings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MaterialQuery {
    pub folder_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogQuery {
    pub department: Option<String>,
}

/// Log entry as rendered to administrators
#[derive(Debug, Serialize)]
pub struct LogView {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub position: String,
    pub action: String,
    pub timestamp: String,
    pub department: String,
}

impl From<ActivityLogEntry> for LogView {
    fn from(entry: ActivityLogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            username: entry.username,
            position: entry.position,
            action: entry.action.as_str().to_string(),
            timestamp: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            department: entry.department.unwrap_or_default(),
        }
    }
}
