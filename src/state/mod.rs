//! Application state: the authoritative in-memory department mapping.
//!
//! Constructed once in `main` (or per test) and cloned into handlers. Writers
//! are the resolver and the admin flow; every mutation bumps `revision`.
//!
//! Writes are sequenced per code by version. A writer reserves the next
//! version before its remote call, and the result is applied only if no
//! newer version has landed meanwhile, so the last *reserved* write wins
//! rather than the last one to complete.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{DepartmentMapping, DepartmentRecord};

#[derive(Debug, Default)]
struct Inner {
    mapping: DepartmentMapping,
    /// Highest version handed out per code, including writes still in flight.
    reserved: BTreeMap<String, u64>,
    /// Revision at which each code last took an admin write.
    applied_at: BTreeMap<String, u64>,
    revision: u64,
}

/// Shared, cloneable handle on the department mapping.
#[derive(Debug, Clone, Default)]
pub struct DepartmentState {
    inner: Arc<RwLock<Inner>>,
}

impl DepartmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mapping and revision, read atomically.
    pub async fn snapshot(&self) -> (DepartmentMapping, u64) {
        let inner = self.inner.read().await;
        (inner.mapping.clone(), inner.revision)
    }

    pub async fn mapping(&self) -> DepartmentMapping {
        self.inner.read().await.mapping.clone()
    }

    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }

    pub async fn get(&self, code: &str) -> Option<DepartmentRecord> {
        self.inner.read().await.mapping.get(code).cloned()
    }

    /// Install a mapping resolved by a pass that began at revision `since`.
    ///
    /// Resolved entries replace in-memory ones, except where the in-memory
    /// record carries a strictly newer version. Records written after `since`
    /// are kept even when the pass did not see them. Returns the installed
    /// mapping.
    pub async fn install(&self, resolved: DepartmentMapping, since: u64) -> DepartmentMapping {
        let mut inner = self.inner.write().await;
        let mut next = resolved;
        for (code, current) in &inner.mapping {
            let keep = match next.get(code) {
                Some(incoming) => current.version > incoming.version,
                None => inner.applied_at.get(code).is_some_and(|&at| at > since),
            };
            if keep {
                next.insert(code.clone(), current.clone());
            }
        }
        inner.mapping = next;
        inner.revision += 1;
        inner.mapping.clone()
    }

    /// Reserve the next write version for `code`.
    ///
    /// Fails with a conflict when `expected` does not match the version of
    /// the record currently held (0 for an absent record).
    pub async fn reserve_version(&self, code: &str, expected: Option<u64>) -> Result<u64, AppError> {
        let mut inner = self.inner.write().await;
        let current = inner.mapping.get(code).map_or(0, |r| r.version);

        if let Some(expected) = expected {
            if expected != current {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch for {}: expected {}, current {}",
                        code, expected, current
                    ),
                    current_version: current,
                });
            }
        }

        let reserved = inner.reserved.get(code).copied().unwrap_or(0);
        let version = current.max(reserved) + 1;
        inner.reserved.insert(code.to_string(), version);
        Ok(version)
    }

    /// Apply a completed write unless a newer version is already held.
    ///
    /// Returns whether the record was applied, plus the resulting mapping.
    pub async fn apply_write(&self, record: DepartmentRecord) -> (bool, DepartmentMapping) {
        let mut inner = self.inner.write().await;
        let stale = inner
            .mapping
            .get(&record.code)
            .is_some_and(|current| current.version > record.version);

        if stale {
            tracing::warn!(
                code = %record.code,
                version = record.version,
                "Discarding stale department write"
            );
            return (false, inner.mapping.clone());
        }

        inner.revision += 1;
        let revision = inner.revision;
        inner.applied_at.insert(record.code.clone(), revision);
        inner.mapping.insert(record.code.clone(), record);
        (true, inner.mapping.clone())
    }

    /// Remove `code`, returning the resulting mapping.
    pub async fn remove(&self, code: &str) -> DepartmentMapping {
        let mut inner = self.inner.write().await;
        inner.mapping.remove(code);
        inner.applied_at.remove(code);
        inner.revision += 1;
        inner.mapping.clone()
    }

    /// Drop every record.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.mapping.clear();
        inner.applied_at.clear();
        inner.revision += 1;
    }
}
