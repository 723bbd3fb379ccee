//! Test doubles for the generation and persistence ports.

#![allow(dead_code)]

use async_trait::async_trait;
use courseware_core::{
    ContentType, CourseContext, MediaFile, Module, ModuleOutline, PortError, PortResult, Project,
    ProjectRepository, GenerationService,
};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryRepo {
    stored: Mutex<Option<Vec<Project>>>,
    saves: Mutex<usize>,
}

impl MemoryRepo {
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    pub fn stored(&self) -> Vec<Project> {
        self.stored.lock().unwrap().clone().unwrap_or_default()
    }
}

#[async_trait]
impl ProjectRepository for MemoryRepo {
    async fn save(&self, _key: &str, projects: &[Project]) -> PortResult<()> {
        *self.stored.lock().unwrap() = Some(projects.to_vec());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn load(&self, _key: &str) -> PortResult<Option<Vec<Project>>> {
        Ok(self.stored.lock().unwrap().clone())
    }
}

/// A generator that records every call and can be told to fail, to cancel a
/// token, or to take a while.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub calls: Mutex<Vec<(Uuid, ContentType)>>,
    pub refinements: Mutex<Vec<(String, String)>>,
    pub structure_calls: Mutex<usize>,
    pub outline: Vec<ModuleOutline>,
    pub fail_on_call: Option<usize>,
    pub cancel_after: Option<(usize, CancellationToken)>,
    pub latency: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(Uuid, ContentType)> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn generated_text(content_type: ContentType, module: &Module) -> String {
    format!("{} for {}", content_type, module.title)
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(
        &self,
        content_type: ContentType,
        module: &Module,
        _context: &CourseContext,
    ) -> PortResult<String> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((module.id, content_type));
            calls.len()
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(PortError::Unexpected("model refused".to_string()));
        }
        if let Some((after, token)) = &self.cancel_after {
            if call == *after {
                token.cancel();
            }
        }
        Ok(generated_text(content_type, module))
    }

    async fn generate_structure(&self, _context: &CourseContext) -> PortResult<Vec<ModuleOutline>> {
        *self.structure_calls.lock().unwrap() += 1;
        Ok(self.outline.clone())
    }

    async fn refine(
        &self,
        _content_type: ContentType,
        _module: &Module,
        _context: &CourseContext,
        existing: &str,
        feedback: &str,
    ) -> PortResult<String> {
        self.refinements
            .lock()
            .unwrap()
            .push((existing.to_string(), feedback.to_string()));
        Ok(format!("{} (revised: {})", existing, feedback))
    }

    async fn generate_image(&self, _prompt: &str) -> PortResult<String> {
        Ok(String::new())
    }

    async fn describe_media(&self, file: &MediaFile) -> PortResult<String> {
        Ok(format!("transcript of {}", file.name))
    }
}

pub fn week(n: u32) -> Module {
    Module::from_outline(ModuleOutline {
        title: format!("Week {}", n),
        week: n,
        topics: vec![format!("Topic {}", n)],
    })
}
