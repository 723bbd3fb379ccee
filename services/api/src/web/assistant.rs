//! services/api/src/web/assistant.rs
//!
//! Axum handlers for the course assistant chat.

use crate::error::reject;
use crate::web::{
    protocol::{AssistantRequest, ChatMessageBody},
    state::AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

/// The conversation so far, oldest first.
#[utoipa::path(
    get,
    path = "/assistant/messages",
    responses((status = 200, description = "The conversation", body = Vec<ChatMessageBody>))
)]
pub async fn list_messages_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let messages: Vec<ChatMessageBody> = app_state
        .assistant
        .messages()
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    Json(messages)
}

/// Ask the assistant something about the current course.
#[utoipa::path(
    post,
    path = "/assistant/messages",
    request_body = AssistantRequest,
    responses(
        (status = 200, description = "The assistant's reply", body = ChatMessageBody),
        (status = 400, description = "Empty message"),
        (status = 503, description = "The model is busy; an apology was recorded")
    )
)]
pub async fn send_message_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<AssistantRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let context = app_state.workspace.lock().await.context().clone();
    let reply = app_state
        .assistant
        .send(&context, &request.text)
        .await
        .map_err(reject)?;
    Ok(Json(ChatMessageBody::from(reply)))
}

/// Start the conversation over.
#[utoipa::path(
    delete,
    path = "/assistant/messages",
    responses((status = 204, description = "Conversation cleared"))
)]
pub async fn clear_messages_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    app_state.assistant.clear().await;
    StatusCode::NO_CONTENT
}
