//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the project and course-context endpoints and
//! the master definition for the OpenAPI specification.

use crate::error::reject;
use crate::web::protocol::{
    AssistantRequest, BatchReportBody, BatchScope, BatchStatus, ChatMessageBody, ChatRoleBody,
    ContentResponse, ContextPayload, CreateProjectResponse, DeleteProjectQuery, FileListResponse,
    ImageRequest, ImageResponse, ProjectSummary, RefineRequest, RenameProjectRequest,
    UploadResponse,
};
use crate::web::{assistant, generation, state::AppState};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use courseware_core::context_files::{list_files, remove_file};
use courseware_core::{ContextField, MediaFile};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_projects_handler,
        create_project_handler,
        load_project_handler,
        rename_project_handler,
        delete_project_handler,
        save_project_handler,
        workspace_handler,
        select_module_handler,
        toggle_context_panel_handler,
        update_context_handler,
        clear_context_handler,
        upload_context_files_handler,
        list_context_files_handler,
        remove_context_file_handler,
        generation::generate_structure_handler,
        generation::start_batch_handler,
        generation::batch_status_handler,
        generation::cancel_batch_handler,
        generation::fill_module_handler,
        generation::fill_one_handler,
        generation::refine_handler,
        generation::quiz_handler,
        generation::image_directives_handler,
        generation::generate_image_handler,
        assistant::list_messages_handler,
        assistant::send_message_handler,
        assistant::clear_messages_handler,
    ),
    components(
        schemas(
            ProjectSummary, CreateProjectResponse, RenameProjectRequest, ContextPayload,
            FileListResponse, UploadResponse, ContentResponse, RefineRequest, ImageRequest,
            ImageResponse, BatchStatus, BatchScope, BatchReportBody, AssistantRequest,
            ChatMessageBody, ChatRoleBody
        )
    ),
    tags(
        (name = "Courseware Studio API", description = "API endpoints for generating and managing course materials.")
    )
)]
pub struct ApiDoc;

fn parse_field(field: &str) -> Result<ContextField, (StatusCode, String)> {
    field.parse().map_err(|e: String| (StatusCode::BAD_REQUEST, e))
}

//=========================================================================================
// Project Handlers
//=========================================================================================

/// List every stored project, newest first.
#[utoipa::path(
    get,
    path = "/projects",
    responses((status = 200, description = "All projects", body = Vec<ProjectSummary>))
)]
pub async fn list_projects_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let ws = app_state.workspace.lock().await;
    let current = ws.current_project_id();
    let summaries: Vec<ProjectSummary> = ws
        .projects()
        .iter()
        .map(|p| ProjectSummary::from_project(p, current))
        .collect();
    Json(summaries)
}

/// Create an empty project and open it.
#[utoipa::path(
    post,
    path = "/projects",
    responses(
        (status = 201, description = "Project created", body = CreateProjectResponse),
        (status = 409, description = "A batch run is in progress"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_project_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state.ensure_idle().await.map_err(reject)?;
    let id = app_state
        .workspace
        .lock()
        .await
        .create_project()
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(CreateProjectResponse { id })))
}

/// Open a stored project, replacing the working state.
#[utoipa::path(
    post,
    path = "/projects/{id}/load",
    params(("id" = Uuid, Path, description = "The project to open.")),
    responses(
        (status = 204, description = "Project opened"),
        (status = 404, description = "Unknown project"),
        (status = 409, description = "A batch run is in progress")
    )
)]
pub async fn load_project_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state.ensure_idle().await.map_err(reject)?;
    app_state
        .workspace
        .lock()
        .await
        .load_project(id)
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rename a project. The new name is persisted once edits go quiet.
#[utoipa::path(
    patch,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "The project to rename.")),
    request_body = RenameProjectRequest,
    responses(
        (status = 204, description = "Project renamed"),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn rename_project_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameProjectRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .workspace
        .lock()
        .await
        .rename_project(id, request.name)
        .map_err(reject)?;
    app_state.rename_saver.touch();
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a project. Requires `?confirm=true`.
#[utoipa::path(
    delete,
    path = "/projects/{id}",
    params(("id" = Uuid, Path, description = "The project to delete."), DeleteProjectQuery),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 400, description = "Deletion was not confirmed"),
        (status = 404, description = "Unknown project"),
        (status = 409, description = "A batch run is in progress")
    )
)]
pub async fn delete_project_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteProjectQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state.ensure_idle().await.map_err(reject)?;
    app_state
        .workspace
        .lock()
        .await
        .delete_project(id, query.confirm.into())
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Write the working state back into the current project and persist it.
#[utoipa::path(
    post,
    path = "/projects/current/save",
    responses(
        (status = 204, description = "Project saved"),
        (status = 500, description = "Persistence failed")
    )
)]
pub async fn save_project_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .workspace
        .lock()
        .await
        .save_current_project()
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Working State Handlers
//=========================================================================================

/// The current project's working state.
#[utoipa::path(
    get,
    path = "/workspace",
    responses((status = 200, description = "Context, modules and UI selection"))
)]
pub async fn workspace_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.workspace.lock().await.view())
}

/// Make a module the active one.
#[utoipa::path(
    post,
    path = "/modules/{id}/select",
    params(("id" = Uuid, Path, description = "The module to activate.")),
    responses(
        (status = 204, description = "Module selected"),
        (status = 404, description = "Unknown module")
    )
)]
pub async fn select_module_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .workspace
        .lock()
        .await
        .select_module(id)
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/workspace/context-panel/toggle",
    responses((status = 204, description = "Panel toggled"))
)]
pub async fn toggle_context_panel_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    app_state.workspace.lock().await.toggle_context_panel();
    StatusCode::NO_CONTENT
}

//=========================================================================================
// Course Context Handlers
//=========================================================================================

/// Replace the course context.
#[utoipa::path(
    put,
    path = "/context",
    request_body = ContextPayload,
    responses((status = 204, description = "Context updated"))
)]
pub async fn update_context_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ContextPayload>,
) -> impl IntoResponse {
    app_state.workspace.lock().await.set_context(payload.into());
    StatusCode::NO_CONTENT
}

/// Reset the course context to its defaults.
#[utoipa::path(
    delete,
    path = "/context",
    responses((status = 204, description = "Context cleared"))
)]
pub async fn clear_context_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    app_state.workspace.lock().await.clear_context();
    StatusCode::NO_CONTENT
}

/// Upload files into a context field.
///
/// Accepts a multipart/form-data request with one part per file. A file that
/// cannot be read is recorded with an error marker and the rest still go in.
#[utoipa::path(
    post,
    path = "/context/{field}/files",
    params(("field" = String, Path, description = "syllabus, ppt_materials or exam_history")),
    request_body(content_type = "multipart/form-data", description = "The files to ingest."),
    responses(
        (status = 200, description = "Files ingested", body = UploadResponse),
        (status = 400, description = "Bad request (e.g., unknown field or no files)")
    )
)]
pub async fn upload_context_files_handler(
    State(app_state): State<Arc<AppState>>,
    Path(field): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let field = parse_field(&field)?;

    let mut files = Vec::new();
    while let Some(part) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = part.file_name().unwrap_or("untitled.txt").to_string();
        let mime_type = part
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data: Bytes = part.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        files.push(MediaFile {
            name,
            mime_type,
            data: data.to_vec(),
        });
    }
    if files.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include at least one file".to_string(),
        ));
    }

    // Extraction can take a while; the workspace stays unlocked until the
    // new blocks are ready to append.
    let mut blocks = String::new();
    let report = app_state.ingestor.ingest(&mut blocks, &files).await;

    let mut ws = app_state.workspace.lock().await;
    let text = ws.context_field_mut(field);
    text.push_str(&blocks);
    let listed = list_files(text);
    info!(?field, ingested = report.ingested.len(), failed = report.failed.len(), "Files uploaded.");

    Ok(Json(UploadResponse {
        ingested: report.ingested,
        failed: report.failed,
        files: listed,
    }))
}

/// List the files embedded in a context field, in upload order.
#[utoipa::path(
    get,
    path = "/context/{field}/files",
    params(("field" = String, Path, description = "syllabus, ppt_materials or exam_history")),
    responses(
        (status = 200, description = "File names", body = FileListResponse),
        (status = 400, description = "Unknown field")
    )
)]
pub async fn list_context_files_handler(
    State(app_state): State<Arc<AppState>>,
    Path(field): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let field = parse_field(&field)?;
    let files = list_files(app_state.workspace.lock().await.context().field(field));
    Ok(Json(FileListResponse { files }))
}

/// Remove every block of a named file from a context field.
#[utoipa::path(
    delete,
    path = "/context/{field}/files/{name}",
    params(
        ("field" = String, Path, description = "syllabus, ppt_materials or exam_history"),
        ("name" = String, Path, description = "The file name as listed.")
    ),
    responses(
        (status = 200, description = "Remaining file names", body = FileListResponse),
        (status = 400, description = "Unknown field")
    )
)]
pub async fn remove_context_file_handler(
    State(app_state): State<Arc<AppState>>,
    Path((field, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let field = parse_field(&field)?;
    let mut ws = app_state.workspace.lock().await;
    let text = ws.context_field_mut(field);
    *text = remove_file(text, &name);
    let files = list_files(text);
    Ok(Json(FileListResponse { files }))
}
