//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API
//! server. Domain types from the core crate are mirrored here so that the
//! OpenAPI document can describe them.

use chrono::{DateTime, Utc};
use courseware_core::{BatchProgress, BatchReport, ChatMessage, ChatRole, CourseContext, Project};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Payloads Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// The editable course context. Missing fields keep their defaults.
#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextPayload {
    pub syllabus: String,
    pub ppt_materials: String,
    pub exam_history: String,
    pub course_name: String,
    pub target_audience: String,
}

impl Default for ContextPayload {
    fn default() -> Self {
        CourseContext::default().into()
    }
}

impl From<CourseContext> for ContextPayload {
    fn from(c: CourseContext) -> Self {
        Self {
            syllabus: c.syllabus,
            ppt_materials: c.ppt_materials,
            exam_history: c.exam_history,
            course_name: c.course_name,
            target_audience: c.target_audience,
        }
    }
}

impl From<ContextPayload> for CourseContext {
    fn from(p: ContextPayload) -> Self {
        Self {
            syllabus: p.syllabus,
            ppt_materials: p.ppt_materials,
            exam_history: p.exam_history,
            course_name: p.course_name,
            target_audience: p.target_audience,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RenameProjectRequest {
    pub name: String,
}

/// Deleting a project must be confirmed explicitly with `?confirm=true`.
#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteProjectQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RefineRequest {
    pub feedback: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ImageRequest {
    pub prompt: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct AssistantRequest {
    pub text: String,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub module_count: usize,
    pub is_current: bool,
}

impl ProjectSummary {
    pub fn from_project(project: &Project, current: Option<Uuid>) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            last_modified: project.last_modified,
            module_count: project.modules.len(),
            is_current: current == Some(project.id),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CreateProjectResponse {
    pub id: Uuid,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ContentResponse {
    pub content: String,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    /// A `data:` URL, or empty when no image could be produced.
    pub data_url: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct UploadResponse {
    pub ingested: Vec<String>,
    pub failed: Vec<String>,
    pub files: Vec<String>,
}

/// Which slots a background run is filling.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchScope {
    Project,
    Module { module_id: Uuid },
}

#[derive(Serialize, Debug, Clone, Copy, ToSchema)]
pub struct BatchReportBody {
    pub completed: usize,
    pub total: usize,
    pub cancelled: bool,
}

impl From<BatchReport> for BatchReportBody {
    fn from(r: BatchReport) -> Self {
        Self {
            completed: r.completed,
            total: r.total,
            cancelled: r.cancelled,
        }
    }
}

/// Snapshot of the background generation run.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub running: bool,
    pub scope: Option<BatchScope>,
    pub completed: usize,
    pub total: usize,
    pub last_report: Option<BatchReportBody>,
    pub last_error: Option<String>,
}

impl BatchStatus {
    pub fn with_progress(mut self, progress: BatchProgress) -> Self {
        self.completed = progress.completed;
        self.total = progress.total;
        self
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRoleBody {
    User,
    Model,
}

/// One turn of the assistant conversation.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct ChatMessageBody {
    pub role: ChatRoleBody,
    pub text: String,
}

impl From<ChatMessage> for ChatMessageBody {
    fn from(m: ChatMessage) -> Self {
        let role = match m.role {
            ChatRole::User => ChatRoleBody::User,
            ChatRole::Model => ChatRoleBody::Model,
        };
        Self { role, text: m.text }
    }
}
