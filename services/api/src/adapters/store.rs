//! services/api/src/adapters/store.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ProjectRepository` port from the `core` crate. The whole project list
//! is stored as one JSON document in a SQLite key-value table using `sqlx`.

use async_trait::async_trait;
use courseware_core::{PortError, PortResult, Project, ProjectRepository};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ProjectRepository` port.
#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    /// Creates a new `SqliteProjectRepository`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct KvRecord {
    value: String,
}

impl KvRecord {
    fn to_domain(self) -> PortResult<Vec<Project>> {
        serde_json::from_str(&self.value)
            .map_err(|e| PortError::Unexpected(format!("Stored project list is malformed: {}", e)))
    }
}

//=========================================================================================
// `ProjectRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn save(&self, key: &str, projects: &[Project]) -> PortResult<()> {
        let value =
            serde_json::to_string(projects).map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(key, projects = projects.len(), bytes = value.len(), "Saved project list");
        Ok(())
    }

    async fn load(&self, key: &str) -> PortResult<Option<Vec<Project>>> {
        let record = sqlx::query_as::<_, KvRecord>("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(KvRecord::to_domain).transpose()
    }
}
