pub mod assistant;
pub mod context_files;
pub mod debounce;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod markdown;
pub mod orchestrator;
pub mod ports;
pub mod quiz;
pub mod retry;
pub mod workspace;

pub use assistant::{Assistant, ChatMessage, ChatRole};
pub use domain::{
    BatchProgress, ContentType, ContextField, CourseContext, MediaFile, Module, ModuleContent,
    ModuleOutline, Project, QuizQuestion, PROJECTS_KEY,
};
pub use error::{CoreError, CoreResult};
pub use orchestrator::{BatchReport, Orchestrator, Pacing};
pub use ports::{
    AssistantService, DocumentExtractor, GenerationService, PortError, PortResult,
    ProjectRepository,
};
pub use workspace::{Confirmation, Workspace, WorkspaceView};
