//! Mapping of application errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use deptrack_applications::{AccessError, ApplicationError};
use serde_json::json;
use tracing::{error, warn};

/// Where the client goes to pick a different role
pub const ROLE_SELECTION_PATH: &str = "/auth/role";

/// Error returned by handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("{0}")]
    BadRequest(String),
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        Self::Application(err.into())
    }
}

fn message_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}

fn role_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "message": message,
            "redirect": ROLE_SELECTION_PATH,
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::BadRequest(message) => {
                return message_response(StatusCode::BAD_REQUEST, message);
            }
            Self::Application(err) => err,
        };

        match err {
            ApplicationError::Access(access) if access.requires_login() => {
                Redirect::to("/").into_response()
            }
            ApplicationError::Access(access @ AccessError::Forbidden { .. }) => {
                role_response(StatusCode::FORBIDDEN, access.to_string())
            }
            ApplicationError::Access(access) => {
                role_response(StatusCode::CONFLICT, access.to_string())
            }
            ApplicationError::InvalidCredentials => {
                message_response(StatusCode::UNAUTHORIZED, err.to_string())
            }
            ApplicationError::Validation { .. }
            | ApplicationError::LastAdministrator
            | ApplicationError::LastAdministratorDemotion => {
                message_response(StatusCode::BAD_REQUEST, err.to_string())
            }
            ApplicationError::Conflict { .. } => {
                message_response(StatusCode::CONFLICT, err.to_string())
            }
            ApplicationError::NotFound { .. } => {
                message_response(StatusCode::NOT_FOUND, err.to_string())
            }
            _ => {
                match &err {
                    ApplicationError::Core(core) => core.log(),
                    err if err.is_user_facing() => {
                        warn!(error = %err, "Unmapped user-facing error")
                    }
                    err => error!(error = %err, "Request failed"),
                }
                message_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;
