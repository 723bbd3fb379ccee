//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the bookkeeping for the
//! background generation run.

use crate::config::Config;
use crate::web::protocol::{BatchScope, BatchStatus};
use courseware_core::debounce::SaveDebouncer;
use courseware_core::ingest::Ingestor;
use courseware_core::{
    Assistant, AssistantService, BatchProgress, BatchReport, CoreError, CoreResult,
    DocumentExtractor, GenerationService, Orchestrator, Workspace,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::error;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub workspace: Arc<Mutex<Workspace>>,
    pub orchestrator: Arc<Orchestrator>,
    pub generator: Arc<dyn GenerationService>,
    pub ingestor: Arc<Ingestor>,
    pub assistant: Assistant,
    /// Persists the project list once rename edits go quiet.
    pub rename_saver: SaveDebouncer,
    pub batch: Mutex<BatchState>,
    /// Latest progress of the background run.
    pub progress: watch::Sender<BatchProgress>,
}

impl AppState {
    /// Wires the core services around an opened workspace. Must be called from
    /// within the Tokio runtime.
    pub fn new(
        config: Arc<Config>,
        workspace: Workspace,
        generator: Arc<dyn GenerationService>,
        assistant: Arc<dyn AssistantService>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        let workspace = Arc::new(Mutex::new(workspace));
        let orchestrator = Arc::new(Orchestrator::new(generator.clone(), config.pacing));
        let ingestor = Arc::new(Ingestor::new(extractor, generator.clone()));

        let saved = workspace.clone();
        let rename_saver = SaveDebouncer::spawn(config.rename_debounce, move || {
            let workspace = saved.clone();
            async move {
                if let Err(e) = workspace.lock().await.persist().await {
                    error!("Failed to persist renamed project: {}", e);
                }
            }
        });

        let (progress, _) = watch::channel(BatchProgress::default());

        Self {
            config,
            workspace,
            orchestrator,
            generator,
            ingestor,
            assistant: Assistant::new(assistant),
            rename_saver,
            batch: Mutex::new(BatchState::default()),
            progress,
        }
    }

    /// Fails with `BatchInProgress` while a background run is claimed or in
    /// flight. The orchestrator flag is only set once a run begins; the batch
    /// slot covers runs that have been claimed but not started.
    pub async fn ensure_idle(&self) -> CoreResult<()> {
        if self.batch.lock().await.running || self.orchestrator.is_running() {
            return Err(CoreError::BatchInProgress);
        }
        Ok(())
    }

    pub async fn batch_status(&self) -> BatchStatus {
        let progress = *self.progress.borrow();
        self.batch.lock().await.status().with_progress(progress)
    }
}

//=========================================================================================
// BatchState (The One Background Run)
//=========================================================================================

#[derive(Default)]
pub struct BatchState {
    pub running: bool,
    pub scope: Option<BatchScope>,
    /// Cancels the in-flight run. Present only while `running`.
    pub cancellation_token: Option<CancellationToken>,
    pub last_report: Option<BatchReport>,
    pub last_error: Option<String>,
}

impl BatchState {
    fn status(&self) -> BatchStatus {
        BatchStatus {
            running: self.running,
            scope: self.scope,
            completed: 0,
            total: 0,
            last_report: self.last_report.map(Into::into),
            last_error: self.last_error.clone(),
        }
    }
}
