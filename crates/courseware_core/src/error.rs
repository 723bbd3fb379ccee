//! crates/courseware_core/src/error.rs
//!
//! Errors raised by the orchestration core itself, on top of the port errors
//! it propagates.

use crate::domain::ContentType;
use crate::ports::PortError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error("A batch generation run is already in progress")]
    BatchInProgress,

    #[error("Upload a syllabus or slide materials before generating the course structure")]
    MissingMaterials,

    #[error("Project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("Module {0} not found")]
    ModuleNotFound(Uuid),

    #[error("No project is currently open")]
    NoCurrentProject,

    #[error("Deleting a project is irreversible and must be confirmed")]
    ConfirmationRequired,

    #[error("Module {module} has no {content_type} content to refine")]
    NothingToRefine { module: Uuid, content_type: ContentType },

    #[error("Type a message for the assistant first")]
    EmptyMessage,
}

pub type CoreResult<T> = Result<T, CoreError>;
