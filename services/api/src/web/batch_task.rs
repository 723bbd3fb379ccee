//! services/api/src/web/batch_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! background content generation.

use crate::web::{protocol::BatchScope, state::AppState};
use courseware_core::{BatchProgress, CoreError, CoreResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Claims the single background slot and spawns a run for `scope`.
///
/// Fails with `BatchInProgress` when a run is already active.
pub async fn start_batch(app_state: Arc<AppState>, scope: BatchScope) -> CoreResult<()> {
    let cancellation_token = {
        let mut batch = app_state.batch.lock().await;
        if batch.running || app_state.orchestrator.is_running() {
            return Err(CoreError::BatchInProgress);
        }
        if let BatchScope::Module { module_id } = scope {
            if app_state.workspace.lock().await.module(module_id).is_none() {
                return Err(CoreError::ModuleNotFound(module_id));
            }
        }
        let token = CancellationToken::new();
        batch.running = true;
        batch.scope = Some(scope);
        batch.cancellation_token = Some(token.clone());
        batch.last_error = None;
        token
    };

    tokio::spawn(batch_process(app_state, scope, cancellation_token));
    Ok(())
}

/// The background task that fills missing slots.
///
/// Progress is published on the shared watch channel after every task. The run
/// stops at the next module or task boundary once the token is cancelled.
pub async fn batch_process(
    app_state: Arc<AppState>,
    scope: BatchScope,
    cancellation_token: CancellationToken,
) {
    info!(?scope, "Batch process started.");

    let report_progress = |progress: BatchProgress| {
        app_state.progress.send_replace(progress);
    };
    let orchestrator = &app_state.orchestrator;
    let workspace = &app_state.workspace;

    let result = match scope {
        BatchScope::Project => {
            orchestrator
                .fill_remaining(workspace, &cancellation_token, report_progress)
                .await
        }
        BatchScope::Module { module_id } => {
            orchestrator
                .fill_module(workspace, module_id, &cancellation_token, report_progress)
                .await
        }
    };

    let mut batch = app_state.batch.lock().await;
    batch.running = false;
    batch.cancellation_token = None;
    match result {
        Ok(report) => {
            info!(
                completed = report.completed,
                total = report.total,
                cancelled = report.cancelled,
                "Batch process finished."
            );
            batch.last_report = Some(report);
        }
        Err(e) => {
            error!("Batch process failed: {}", e);
            batch.last_report = None;
            batch.last_error = Some(format!(
                "Generation stopped: {}. Content generated before the failure is kept in the \
                 workspace; save the project or start the batch again to continue.",
                e
            ));
        }
    }
}
