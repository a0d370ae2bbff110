//! Local cache: an on-device mirror of the last known-good department mapping.
//!
//! The whole mapping lives in one JSON blob under [`CACHE_KEY`] and is only
//! ever replaced wholesale, so a reader sees either nothing or one complete
//! snapshot. Reads and writes never fail outward; problems are logged.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::models::{normalize_mapping, DepartmentMapping};

/// Fixed key holding the serialized mapping.
pub const CACHE_KEY: &str = "dottech-departments";

#[derive(Debug, Error)]
enum CacheError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SQLite-backed local cache.
#[derive(Clone)]
pub struct LocalCache {
    pool: SqlitePool,
}

impl LocalCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the cached snapshot with `mapping`.
    pub async fn sync_to(&self, mapping: &DepartmentMapping) {
        match self.write(mapping).await {
            Ok(()) => tracing::debug!(count = mapping.len(), "Synced local cache"),
            Err(e) => tracing::error!(error = %e, "Local cache sync failed"),
        }
    }

    /// Read the cached snapshot; empty when absent, corrupt, or unreadable.
    pub async fn load_all(&self) -> DepartmentMapping {
        match self.read().await {
            Ok(Some(mapping)) => mapping,
            Ok(None) => DepartmentMapping::new(),
            Err(e) => {
                tracing::error!(error = %e, "Local cache load failed");
                DepartmentMapping::new()
            }
        }
    }

    /// Drop the cached snapshot entirely.
    pub async fn clear(&self) {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(CACHE_KEY)
            .execute(&self.pool)
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Local cache clear failed");
        }
    }

    async fn write(&self, mapping: &DepartmentMapping) -> Result<(), CacheError> {
        let blob = serde_json::to_string(mapping)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(CACHE_KEY)
        .bind(&blob)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read(&self) -> Result<Option<DepartmentMapping>, CacheError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(CACHE_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let blob: String = row.try_get("value")?;
        let mapping: DepartmentMapping = serde_json::from_str(&blob)?;
        Ok(Some(normalize_mapping(mapping)))
    }
}
