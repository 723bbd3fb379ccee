//! crates/courseware_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the generative model, the storage medium and the
//! document parsers.

use async_trait::async_trait;
use crate::assistant::ChatMessage;
use crate::domain::{ContentType, CourseContext, MediaFile, Module, ModuleOutline, Project};
use crate::ingest::FileKind;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Rate-limited or server-busy failures that are worth retrying.
    #[error("Service temporarily unavailable: {0}")]
    Transient(String),
    #[error("Unsupported input: {0}")]
    Unsupported(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Transient(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote generative model.
///
/// Implementations apply their own retry policy for transient failures; callers
/// see a single call that either yields text or fails.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generates the content for one (module, content type) slot.
    async fn generate(
        &self,
        content_type: ContentType,
        module: &Module,
        context: &CourseContext,
    ) -> PortResult<String>;

    /// Proposes an ordered set of weekly modules from the course material.
    async fn generate_structure(&self, context: &CourseContext) -> PortResult<Vec<ModuleOutline>>;

    /// Revises existing slot content according to free-text feedback.
    async fn refine(
        &self,
        content_type: ContentType,
        module: &Module,
        context: &CourseContext,
        existing: &str,
        feedback: &str,
    ) -> PortResult<String>;

    /// Synthesizes an illustration, returning a data URL or an empty string.
    async fn generate_image(&self, prompt: &str) -> PortResult<String>;

    /// Turns non-text media into a detailed text transcript.
    async fn describe_media(&self, file: &MediaFile) -> PortResult<String>;
}

/// A free-form conversation about the course.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Replies to the last entry of `history`, which is the user's message.
    async fn chat(&self, context: &CourseContext, history: &[ChatMessage]) -> PortResult<String>;
}

/// Durable key-value storage for the full project list.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Overwrites the stored list under `key` in one shot.
    async fn save(&self, key: &str, projects: &[Project]) -> PortResult<()>;

    async fn load(&self, key: &str) -> PortResult<Option<Vec<Project>>>;
}

/// Extracts plain text from an uploaded document.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, kind: FileKind, file: &MediaFile) -> PortResult<String>;
}
