pub mod assistant;
pub mod batch_task;
pub mod generation;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Every API route, without middleware layers or state.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects",
            get(rest::list_projects_handler).post(rest::create_project_handler),
        )
        .route("/projects/current/save", post(rest::save_project_handler))
        .route("/projects/{id}/load", post(rest::load_project_handler))
        .route(
            "/projects/{id}",
            patch(rest::rename_project_handler).delete(rest::delete_project_handler),
        )
        .route("/workspace", get(rest::workspace_handler))
        .route(
            "/workspace/context-panel/toggle",
            post(rest::toggle_context_panel_handler),
        )
        .route(
            "/context",
            put(rest::update_context_handler).delete(rest::clear_context_handler),
        )
        .route(
            "/context/{field}/files",
            get(rest::list_context_files_handler).post(rest::upload_context_files_handler),
        )
        .route(
            "/context/{field}/files/{name}",
            delete(rest::remove_context_file_handler),
        )
        .route("/structure", post(generation::generate_structure_handler))
        .route(
            "/batch",
            get(generation::batch_status_handler).post(generation::start_batch_handler),
        )
        .route("/batch/cancel", post(generation::cancel_batch_handler))
        .route("/images", post(generation::generate_image_handler))
        .route(
            "/assistant/messages",
            get(assistant::list_messages_handler)
                .post(assistant::send_message_handler)
                .delete(assistant::clear_messages_handler),
        )
        .route("/modules/{id}/select", post(rest::select_module_handler))
        .route("/modules/{id}/fill", post(generation::fill_module_handler))
        .route("/modules/{id}/quiz", get(generation::quiz_handler))
        .route(
            "/modules/{id}/content/{content_type}",
            post(generation::fill_one_handler),
        )
        .route(
            "/modules/{id}/content/{content_type}/refine",
            post(generation::refine_handler),
        )
        .route(
            "/modules/{id}/content/{content_type}/images",
            get(generation::image_directives_handler),
        )
}
