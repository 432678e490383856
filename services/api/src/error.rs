//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service, and how port and
//! validation failures are turned into HTTP responses.

use crate::config::ConfigError;
use axum::{http::StatusCode, Json};
use lesson_studio_core::media::UploadError;
use lesson_studio_core::ports::PortError;
use lesson_studio_core::validation::{ValidationIssue, ValidationReport};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//=========================================================================================
// HTTP Error Bodies
//=========================================================================================

/// The JSON body returned with every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<Object>)]
    pub issues: Vec<ValidationIssue>,
}

pub type HttpError = (StatusCode, Json<ErrorBody>);

pub fn http_error(status: StatusCode, error: &str, message: impl Into<String>) -> HttpError {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            message: message.into(),
            issues: Vec::new(),
        }),
    )
}

/// Maps a port failure to a response, logging anything unexpected.
pub fn port_error(context: &str, e: PortError) -> HttpError {
    match e {
        PortError::NotFound(what) => http_error(StatusCode::NOT_FOUND, "not_found", what),
        PortError::Conflict(what) => http_error(StatusCode::CONFLICT, "conflict", what),
        PortError::Unauthorized => {
            http_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized")
        }
        PortError::Unexpected(detail) => {
            error!("{}: {}", context, detail);
            http_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                context.to_string(),
            )
        }
    }
}

pub fn validation_error(report: ValidationReport) -> HttpError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorBody {
            error: "validation_failed".to_string(),
            message: report.to_string(),
            issues: report.issues,
        }),
    )
}

pub fn upload_error(e: UploadError) -> HttpError {
    let status = match e {
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::Empty | UploadError::UnknownKind(_) => StatusCode::BAD_REQUEST,
    };
    http_error(status, "upload_rejected", e.to_string())
}
