//! services/api/src/web/generation.rs
//!
//! Axum handlers for structure, batch and per-slot generation.

use crate::error::reject;
use crate::web::{
    batch_task::start_batch,
    protocol::{BatchScope, BatchStatus, ContentResponse, ImageRequest, ImageResponse, RefineRequest},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use courseware_core::markdown::image_directives;
use courseware_core::quiz::parse_quiz;
use courseware_core::{ContentType, CoreError};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

fn parse_content_type(raw: &str) -> Result<ContentType, (StatusCode, String)> {
    raw.parse().map_err(|e: String| (StatusCode::BAD_REQUEST, e))
}

//=========================================================================================
// Course Structure
//=========================================================================================

/// Replace the module list with a generated weekly structure.
#[utoipa::path(
    post,
    path = "/structure",
    responses(
        (status = 200, description = "The new modules"),
        (status = 400, description = "No syllabus or slide materials uploaded"),
        (status = 409, description = "A batch run is in progress")
    )
)]
pub async fn generate_structure_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state.ensure_idle().await.map_err(reject)?;
    let modules = app_state
        .orchestrator
        .generate_structure(&app_state.workspace)
        .await
        .map_err(reject)?;
    Ok(Json(modules))
}

//=========================================================================================
// Background Runs
//=========================================================================================

/// Start filling every missing slot of the current project in the background.
#[utoipa::path(
    post,
    path = "/batch",
    responses(
        (status = 202, description = "Batch started"),
        (status = 409, description = "A batch run is already in progress")
    )
)]
pub async fn start_batch_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    start_batch(app_state, BatchScope::Project).await.map_err(reject)?;
    Ok(StatusCode::ACCEPTED)
}

/// Progress and outcome of the background run.
#[utoipa::path(
    get,
    path = "/batch",
    responses((status = 200, description = "Current batch status", body = BatchStatus))
)]
pub async fn batch_status_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.batch_status().await)
}

/// Ask the background run to stop at its next module or task boundary.
#[utoipa::path(
    post,
    path = "/batch/cancel",
    responses(
        (status = 202, description = "Cancellation requested"),
        (status = 204, description = "Nothing was running")
    )
)]
pub async fn cancel_batch_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    match &app_state.batch.lock().await.cancellation_token {
        Some(token) => {
            info!("Batch cancellation requested.");
            token.cancel();
            StatusCode::ACCEPTED
        }
        None => StatusCode::NO_CONTENT,
    }
}

/// Start filling the missing slots of one module in the background.
#[utoipa::path(
    post,
    path = "/modules/{id}/fill",
    params(("id" = Uuid, Path, description = "The module to fill.")),
    responses(
        (status = 202, description = "Module fill started"),
        (status = 404, description = "Unknown module"),
        (status = 409, description = "A batch run is already in progress")
    )
)]
pub async fn fill_module_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    start_batch(app_state, BatchScope::Module { module_id: id })
        .await
        .map_err(reject)?;
    Ok(StatusCode::ACCEPTED)
}

//=========================================================================================
// Single Slots
//=========================================================================================

/// Generate one slot, overwriting its current content.
#[utoipa::path(
    post,
    path = "/modules/{id}/content/{content_type}",
    params(
        ("id" = Uuid, Path, description = "The module."),
        ("content_type" = String, Path, description = "e.g. LESSON_PLAN or ASSESSMENT")
    ),
    responses(
        (status = 200, description = "The generated content", body = ContentResponse),
        (status = 404, description = "Unknown module"),
        (status = 503, description = "The model is rate limited or overloaded")
    )
)]
pub async fn fill_one_handler(
    State(app_state): State<Arc<AppState>>,
    Path((id, content_type)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let content_type = parse_content_type(&content_type)?;
    let content = app_state
        .orchestrator
        .fill_one(&app_state.workspace, id, content_type)
        .await
        .map_err(reject)?;
    Ok(Json(ContentResponse { content }))
}

/// Revise one slot's content according to feedback.
#[utoipa::path(
    post,
    path = "/modules/{id}/content/{content_type}/refine",
    params(
        ("id" = Uuid, Path, description = "The module."),
        ("content_type" = String, Path, description = "e.g. LESSON_PLAN or ASSESSMENT")
    ),
    request_body = RefineRequest,
    responses(
        (status = 200, description = "The revised content", body = ContentResponse),
        (status = 400, description = "The slot is empty"),
        (status = 404, description = "Unknown module")
    )
)]
pub async fn refine_handler(
    State(app_state): State<Arc<AppState>>,
    Path((id, content_type)): Path<(Uuid, String)>,
    Json(request): Json<RefineRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let content_type = parse_content_type(&content_type)?;
    let content = app_state
        .orchestrator
        .refine(&app_state.workspace, id, content_type, &request.feedback)
        .await
        .map_err(reject)?;
    Ok(Json(ContentResponse { content }))
}

/// The module's quiz, validated.
#[utoipa::path(
    get,
    path = "/modules/{id}/quiz",
    params(("id" = Uuid, Path, description = "The module.")),
    responses(
        (status = 200, description = "Either the questions or the reason they are unusable"),
        (status = 404, description = "Unknown module or no assessment yet")
    )
)]
pub async fn quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ws = app_state.workspace.lock().await;
    let module = ws
        .module(id)
        .ok_or_else(|| reject(CoreError::ModuleNotFound(id)))?;
    let text = module.content.get(ContentType::Assessment).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Module {} has no assessment yet", id),
        )
    })?;
    Ok(Json(parse_quiz(text)))
}

/// The illustration placeholders embedded in a markdown slot.
#[utoipa::path(
    get,
    path = "/modules/{id}/content/{content_type}/images",
    params(
        ("id" = Uuid, Path, description = "The module."),
        ("content_type" = String, Path, description = "e.g. LESSON_PLAN")
    ),
    responses(
        (status = 200, description = "Caption and prompt of every placeholder"),
        (status = 404, description = "Unknown module")
    )
)]
pub async fn image_directives_handler(
    State(app_state): State<Arc<AppState>>,
    Path((id, content_type)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let content_type = parse_content_type(&content_type)?;
    let ws = app_state.workspace.lock().await;
    let module = ws
        .module(id)
        .ok_or_else(|| reject(CoreError::ModuleNotFound(id)))?;
    let directives = module
        .content
        .get(content_type)
        .map(image_directives)
        .unwrap_or_default();
    Ok(Json(directives))
}

/// Synthesize an illustration for a placeholder prompt.
#[utoipa::path(
    post,
    path = "/images",
    request_body = ImageRequest,
    responses((status = 200, description = "A data URL, empty when no image could be made", body = ImageResponse))
)]
pub async fn generate_image_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ImageRequest>,
) -> impl IntoResponse {
    let data_url = match app_state.generator.generate_image(&request.prompt).await {
        Ok(url) => url,
        Err(e) => {
            warn!("Image generation failed: {}", e);
            String::new()
        }
    };
    Json(ImageResponse { data_url })
}
