//! services/api/src/adapters/memory.rs
//!
//! A volatile `ProjectRepository` for local runs without a database file.

use async_trait::async_trait;
use courseware_core::{PortError, PortResult, Project, ProjectRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps the serialized list per key, so loads never alias saved values.
#[derive(Default)]
pub struct InMemoryProjectRepository {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn save(&self, key: &str, projects: &[Project]) -> PortResult<()> {
        let value =
            serde_json::to_string(projects).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn load(&self, key: &str) -> PortResult<Option<Vec<Project>>> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|value| {
                serde_json::from_str(value).map_err(|e| PortError::Unexpected(e.to_string()))
            })
            .transpose()
    }
}
