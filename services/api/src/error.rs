//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the mapping
//! from core errors onto HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use courseware_core::{CoreError, PortError};
use tracing::{error, warn};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error raised while opening the workspace.
    #[error("Workspace Error: {0}")]
    Core(#[from] CoreError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure to apply the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The HTTP status a core error is reported with.
pub fn status_for(e: &CoreError) -> StatusCode {
    match e {
        CoreError::ProjectNotFound(_) | CoreError::ModuleNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
        CoreError::MissingMaterials
        | CoreError::NoCurrentProject
        | CoreError::ConfirmationRequired
        | CoreError::NothingToRefine { .. }
        | CoreError::EmptyMessage => StatusCode::BAD_REQUEST,
        CoreError::Port(PortError::Unsupported(_)) => StatusCode::BAD_REQUEST,
        CoreError::BatchInProgress => StatusCode::CONFLICT,
        CoreError::Port(PortError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Port(PortError::Unexpected(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a core error into the `(StatusCode, String)` rejection handlers return.
pub fn reject(e: CoreError) -> (StatusCode, String) {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    (status, e.to_string())
}
