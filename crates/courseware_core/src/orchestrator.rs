//! crates/courseware_core/src/orchestrator.rs
//!
//! The generation orchestrator: fills missing (module, content type) slots one
//! at a time, publishes progress after every task, stops cooperatively when
//! its cancellation token fires, and saves the project when a run ends.
//!
//! Generation calls are strictly sequential. The workspace lock is only held
//! for the short read/write sections between calls, never across a remote
//! call or a pacing delay.

use crate::domain::{BatchProgress, ContentType, Module};
use crate::error::{CoreError, CoreResult};
use crate::ports::GenerationService;
use crate::workspace::Workspace;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Fixed delays inserted after each successful generation to stay under the
/// model's rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// After each task of a whole-project batch.
    pub batch_delay: Duration,
    /// After each task of a single-module fill.
    pub module_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            batch_delay: Duration::from_millis(1200),
            module_delay: Duration::from_millis(800),
        }
    }
}

/// Outcome of a batch run that ended without a generation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub completed: usize,
    pub total: usize,
    pub cancelled: bool,
}

// Clears the in-flight flag however the run ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Orchestrator {
    generator: Arc<dyn GenerationService>,
    pacing: Pacing,
    running: AtomicBool,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn GenerationService>, pacing: Pacing) -> Self {
        Self {
            generator,
            pacing,
            running: AtomicBool::new(false),
        }
    }

    /// True while a batch or single-module fill is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn begin(&self) -> CoreResult<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RunGuard(&self.running))
            .map_err(|_| CoreError::BatchInProgress)
    }

    //=====================================================================================
    // Batch Fill
    //=====================================================================================

    /// Generates every missing slot across all modules of the current project.
    ///
    /// A generation failure aborts the run immediately and is returned; content
    /// written before the failure stays in the workspace but is not saved.
    pub async fn fill_remaining<P>(
        &self,
        workspace: &Mutex<Workspace>,
        cancel: &CancellationToken,
        progress: P,
    ) -> CoreResult<BatchReport>
    where
        P: Fn(BatchProgress) + Send + Sync,
    {
        let _guard = self.begin()?;
        let module_ids: Vec<Uuid> = workspace.lock().await.modules().iter().map(|m| m.id).collect();
        info!(modules = module_ids.len(), "Starting batch fill.");
        let result = self
            .run(workspace, &module_ids, self.pacing.batch_delay, true, cancel, &progress)
            .await;
        progress(BatchProgress::default());
        result
    }

    /// Generates the missing slots of a single module.
    pub async fn fill_module<P>(
        &self,
        workspace: &Mutex<Workspace>,
        module_id: Uuid,
        cancel: &CancellationToken,
        progress: P,
    ) -> CoreResult<BatchReport>
    where
        P: Fn(BatchProgress) + Send + Sync,
    {
        let _guard = self.begin()?;
        if workspace.lock().await.module(module_id).is_none() {
            return Err(CoreError::ModuleNotFound(module_id));
        }
        info!(module_id = %module_id, "Starting module fill.");
        let result = self
            .run(workspace, &[module_id], self.pacing.module_delay, false, cancel, &progress)
            .await;
        progress(BatchProgress::default());
        result
    }

    async fn run<P>(
        &self,
        workspace: &Mutex<Workspace>,
        module_ids: &[Uuid],
        delay: Duration,
        follow_active: bool,
        cancel: &CancellationToken,
        progress: &P,
    ) -> CoreResult<BatchReport>
    where
        P: Fn(BatchProgress) + Send + Sync,
    {
        let (project_id, context, total) = {
            let ws = workspace.lock().await;
            let total = module_ids
                .iter()
                .filter_map(|id| ws.module(*id))
                .map(|m| m.content.missing().count())
                .sum();
            (ws.current_project_id(), ws.context().clone(), total)
        };

        let mut completed = 0;
        let mut cancelled = false;
        let mut switched = false;
        progress(BatchProgress { completed, total });

        'modules: for &module_id in module_ids {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if follow_active {
                // The module may have been replaced since the run started.
                let _ = workspace.lock().await.select_module(module_id);
            }

            for content_type in ContentType::ALL {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'modules;
                }

                let module = match slot(&*workspace.lock().await, project_id, module_id, content_type) {
                    Slot::Missing(module) => module,
                    Slot::Filled => continue,
                    Slot::Gone => {
                        warn!(module_id = %module_id, "Module disappeared during batch, skipping.");
                        continue 'modules;
                    }
                    Slot::Switched => {
                        switched = true;
                        break 'modules;
                    }
                };

                let text = self
                    .generator
                    .generate(content_type, &module, &context)
                    .await
                    .map_err(|e| {
                        error!(
                            module_id = %module_id,
                            content_type = %content_type,
                            completed,
                            total,
                            "Generation failed, stopping batch: {}", e
                        );
                        e
                    })?;

                {
                    let mut ws = workspace.lock().await;
                    match slot(&ws, project_id, module_id, content_type) {
                        Slot::Missing(_) => ws.set_module_content(module_id, content_type, text)?,
                        Slot::Filled => {
                            info!(module_id = %module_id, content_type = %content_type, "Slot was filled meanwhile, keeping it.");
                        }
                        Slot::Gone => {
                            warn!(module_id = %module_id, "Module disappeared during batch, dropping generated content.");
                            continue 'modules;
                        }
                        Slot::Switched => {
                            switched = true;
                            break 'modules;
                        }
                    }
                }
                completed += 1;
                progress(BatchProgress { completed, total });
                info!(completed, total, content_type = %content_type, "Generated slot.");

                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        if switched {
            // This run's content is not in the open project, so nothing is saved.
            warn!(completed, total, "Current project changed during batch, stopping without saving.");
            return Ok(BatchReport {
                completed,
                total,
                cancelled: true,
            });
        }
        if cancelled {
            info!(completed, total, "Batch cancelled.");
        }
        workspace.lock().await.save_current_project().await?;

        Ok(BatchReport {
            completed,
            total,
            cancelled,
        })
    }

    //=====================================================================================
    // Single-Slot Operations
    //=====================================================================================

    /// Generates one slot, overwriting whatever it held. Does not save.
    pub async fn fill_one(
        &self,
        workspace: &Mutex<Workspace>,
        module_id: Uuid,
        content_type: ContentType,
    ) -> CoreResult<String> {
        let (module, context) = {
            let ws = workspace.lock().await;
            let module = ws
                .module(module_id)
                .cloned()
                .ok_or(CoreError::ModuleNotFound(module_id))?;
            (module, ws.context().clone())
        };

        let text = self.generator.generate(content_type, &module, &context).await?;
        workspace
            .lock()
            .await
            .set_module_content(module_id, content_type, text.clone())?;
        Ok(text)
    }

    /// Revises existing slot content with free-text feedback. Does not save.
    pub async fn refine(
        &self,
        workspace: &Mutex<Workspace>,
        module_id: Uuid,
        content_type: ContentType,
        feedback: &str,
    ) -> CoreResult<String> {
        let (module, context, existing) = {
            let ws = workspace.lock().await;
            let module = ws
                .module(module_id)
                .cloned()
                .ok_or(CoreError::ModuleNotFound(module_id))?;
            let existing = module
                .content
                .get(content_type)
                .map(str::to_string)
                .ok_or(CoreError::NothingToRefine {
                    module: module_id,
                    content_type,
                })?;
            (module, ws.context().clone(), existing)
        };

        let revised = self
            .generator
            .refine(content_type, &module, &context, &existing, feedback)
            .await?;
        workspace
            .lock()
            .await
            .set_module_content(module_id, content_type, revised.clone())?;
        Ok(revised)
    }

    //=====================================================================================
    // Course Structure
    //=====================================================================================

    /// Replaces the module list with a freshly generated weekly structure and
    /// saves the project.
    pub async fn generate_structure(&self, workspace: &Mutex<Workspace>) -> CoreResult<Vec<Module>> {
        if self.is_running() {
            return Err(CoreError::BatchInProgress);
        }
        let context = {
            let ws = workspace.lock().await;
            if !ws.context().has_materials() {
                return Err(CoreError::MissingMaterials);
            }
            ws.context().clone()
        };

        let outlines = self.generator.generate_structure(&context).await?;
        let modules: Vec<Module> = outlines.into_iter().map(Module::from_outline).collect();
        info!(weeks = modules.len(), "Generated course structure.");

        let mut ws = workspace.lock().await;
        ws.replace_modules(modules.clone());
        ws.save_current_project().await?;
        Ok(modules)
    }
}

enum Slot {
    Missing(Module),
    Filled,
    Gone,
    Switched,
}

// Read against the live workspace so content written meanwhile is never
// overwritten.
fn slot(ws: &Workspace, project_id: Option<Uuid>, module_id: Uuid, content_type: ContentType) -> Slot {
    if ws.current_project_id() != project_id {
        return Slot::Switched;
    }
    match ws.module(module_id) {
        Some(m) if m.content.is_filled(content_type) => Slot::Filled,
        Some(m) => Slot::Missing(m.clone()),
        None => Slot::Gone,
    }
}
