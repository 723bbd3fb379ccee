//! crates/courseware_core/src/workspace.rs
//!
//! The content store: the in-memory project list, the "current project"
//! pointer, and the live working copy (context + modules) being edited.
//!
//! The working copy is only written back into the project list by
//! `save_current_project`, and the list is only ever persisted as a whole.

use crate::domain::{
    ContentType, ContextField, CourseContext, Module, Project, PROJECTS_KEY,
};
use crate::error::{CoreError, CoreResult};
use crate::ports::ProjectRepository;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Explicit user acknowledgement for irreversible operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Unconfirmed
        }
    }
}

/// A serializable snapshot of the working state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceView {
    pub current_project_id: Option<Uuid>,
    pub context: CourseContext,
    pub modules: Vec<Module>,
    pub active_module_id: Option<Uuid>,
    pub context_open: bool,
}

pub struct Workspace {
    repo: Arc<dyn ProjectRepository>,
    projects: Vec<Project>,
    current_id: Option<Uuid>,
    context: CourseContext,
    modules: Vec<Module>,
    active_module_id: Option<Uuid>,
    context_open: bool,
}

impl Workspace {
    /// An empty workspace with nothing loaded. Callers normally use `open`.
    pub fn new(repo: Arc<dyn ProjectRepository>) -> Self {
        Self {
            repo,
            projects: Vec::new(),
            current_id: None,
            context: CourseContext::default(),
            modules: Vec::new(),
            active_module_id: None,
            context_open: true,
        }
    }

    /// Loads the stored project list and opens the most recent project,
    /// creating a first project when nothing is stored.
    pub async fn open(repo: Arc<dyn ProjectRepository>) -> CoreResult<Self> {
        let stored = repo.load(PROJECTS_KEY).await?.unwrap_or_default();
        let mut workspace = Self::new(repo);
        workspace.projects = stored;

        match workspace.projects.first().map(|p| p.id) {
            Some(id) => workspace.load_project(id)?,
            None => {
                workspace.create_project().await?;
            }
        }
        info!(projects = workspace.projects.len(), "Workspace opened.");
        Ok(workspace)
    }

    //=====================================================================================
    // Project Lifecycle
    //=====================================================================================

    /// Creates an empty project, makes it current and persists the list.
    pub async fn create_project(&mut self) -> CoreResult<Uuid> {
        let project = Project {
            id: Uuid::now_v7(),
            name: format!("Course Project {}", self.projects.len() + 1),
            last_modified: self.next_timestamp(),
            context: CourseContext::default(),
            modules: Vec::new(),
        };
        let id = project.id;
        self.projects.insert(0, project);
        self.load_project(id)?;
        self.persist().await?;
        info!(project_id = %id, "Created project.");
        Ok(id)
    }

    /// Copies a stored project into the working state and makes it current.
    pub fn load_project(&mut self, id: Uuid) -> CoreResult<()> {
        let project = self
            .projects
            .iter()
            .find(|p| p.id == id)
            .ok_or(CoreError::ProjectNotFound(id))?;

        self.context = project.context.clone();
        self.modules = project.modules.clone();
        self.current_id = Some(id);
        match self.modules.first() {
            Some(first) => {
                self.active_module_id = Some(first.id);
                self.context_open = false;
            }
            None => {
                self.active_module_id = None;
                self.context_open = true;
            }
        }
        debug!(project_id = %id, modules = self.modules.len(), "Loaded project.");
        Ok(())
    }

    /// Writes the working state back into the current project, bumps its
    /// timestamp, re-sorts the list newest first and persists it.
    pub async fn save_current_project(&mut self) -> CoreResult<()> {
        let id = self.current_id.ok_or(CoreError::NoCurrentProject)?;
        let now = self.next_timestamp();
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CoreError::ProjectNotFound(id))?;

        project.context = self.context.clone();
        project.modules = self.modules.clone();
        project.last_modified = now;
        self.projects
            .sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

        self.persist().await?;
        info!(project_id = %id, "Saved current project.");
        Ok(())
    }

    /// Removes a project. If it was current, the most recently modified
    /// remaining project is opened, or a fresh one is created.
    pub async fn delete_project(&mut self, id: Uuid, confirmation: Confirmation) -> CoreResult<()> {
        if confirmation != Confirmation::Confirmed {
            return Err(CoreError::ConfirmationRequired);
        }
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or(CoreError::ProjectNotFound(id))?;

        self.projects.remove(index);
        self.persist().await?;
        info!(project_id = %id, "Deleted project.");

        if self.current_id == Some(id) {
            self.current_id = None;
            let newest = self
                .projects
                .iter()
                .max_by_key(|p| p.last_modified)
                .map(|p| p.id);
            match newest {
                Some(next) => self.load_project(next)?,
                None => {
                    self.create_project().await?;
                }
            }
        }
        Ok(())
    }

    /// Renames in memory only. Persisting is left to the caller so that rapid
    /// edits can be coalesced.
    pub fn rename_project(&mut self, id: Uuid, name: impl Into<String>) -> CoreResult<()> {
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CoreError::ProjectNotFound(id))?;
        project.name = name.into();
        Ok(())
    }

    /// Overwrites durable storage with the full project list.
    pub async fn persist(&self) -> CoreResult<()> {
        self.repo.save(PROJECTS_KEY, &self.projects).await?;
        Ok(())
    }

    // Stored timestamps have millisecond precision; keep them strictly
    // increasing so the newest-first order is unambiguous.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        match self.projects.iter().map(|p| p.last_modified).max() {
            Some(newest) if newest >= now => newest + Duration::milliseconds(1),
            _ => now,
        }
    }

    //=====================================================================================
    // Working State
    //=====================================================================================

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn current_project_id(&self) -> Option<Uuid> {
        self.current_id
    }

    pub fn context(&self) -> &CourseContext {
        &self.context
    }

    pub fn set_context(&mut self, context: CourseContext) {
        self.context = context;
    }

    pub fn context_field_mut(&mut self, field: ContextField) -> &mut String {
        self.context.field_mut(field)
    }

    pub fn clear_context(&mut self) {
        self.context = CourseContext::default();
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: Uuid) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn set_module_content(
        &mut self,
        id: Uuid,
        content_type: ContentType,
        text: impl Into<String>,
    ) -> CoreResult<()> {
        let module = self
            .modules
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(CoreError::ModuleNotFound(id))?;
        module.content.set(content_type, text);
        Ok(())
    }

    /// Replaces the whole module list, selecting the first module.
    pub fn replace_modules(&mut self, modules: Vec<Module>) {
        self.modules = modules;
        if let Some(first) = self.modules.first() {
            self.active_module_id = Some(first.id);
            self.context_open = false;
        } else {
            self.active_module_id = None;
        }
    }

    pub fn select_module(&mut self, id: Uuid) -> CoreResult<()> {
        if self.module(id).is_none() {
            return Err(CoreError::ModuleNotFound(id));
        }
        self.active_module_id = Some(id);
        Ok(())
    }

    pub fn active_module_id(&self) -> Option<Uuid> {
        self.active_module_id
    }

    pub fn is_context_open(&self) -> bool {
        self.context_open
    }

    pub fn toggle_context_panel(&mut self) {
        self.context_open = !self.context_open;
    }

    pub fn view(&self) -> WorkspaceView {
        WorkspaceView {
            current_project_id: self.current_id,
            context: self.context.clone(),
            modules: self.modules.clone(),
            active_module_id: self.active_module_id,
            context_open: self.context_open,
        }
    }
}
