//! In-process record store.
//!
//! Used when no remote store URL is configured, and by tests to simulate an
//! unreachable backend or individual write failures.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::RecordStore;
use crate::models::{DepartmentMapping, DepartmentRecord};

#[derive(Debug, Default)]
struct Inner {
    records: DepartmentMapping,
    failing_codes: BTreeSet<String>,
    unreachable: bool,
}

/// Memory-backed [`RecordStore`] with failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fails(inner: &Inner, code: &str) -> bool {
        inner.unreachable || inner.failing_codes.contains(code)
    }
}

/// Seeding and fault-injection helpers.
#[cfg(test)]
impl MemoryRecordStore {
    /// Create a store pre-populated with `records`.
    pub fn with_records(records: DepartmentMapping) -> Self {
        let store = Self::new();
        store.lock().records = records;
        store
    }

    /// Make every operation fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make reads and writes addressing `code` fail.
    pub fn inject_failure(&self, code: &str) {
        self.lock()
            .failing_codes
            .insert(crate::models::canonical_code(code));
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.lock().failing_codes.clear();
    }

    /// Direct view of the stored records, bypassing failure injection.
    pub fn records(&self) -> DepartmentMapping {
        self.lock().records.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load_all(&self) -> DepartmentMapping {
        let inner = self.lock();
        if inner.unreachable {
            tracing::error!("Memory store unreachable, returning empty snapshot");
            return DepartmentMapping::new();
        }
        inner.records.clone()
    }

    async fn load(&self, code: &str) -> Option<DepartmentRecord> {
        let inner = self.lock();
        if Self::fails(&inner, code) {
            tracing::error!(code, "Memory store load failed");
            return None;
        }
        inner.records.get(code).cloned()
    }

    async fn save(&self, code: &str, record: &DepartmentRecord) -> bool {
        let mut inner = self.lock();
        if Self::fails(&inner, code) {
            tracing::error!(code, "Memory store save failed");
            return false;
        }
        inner.records.insert(code.to_string(), record.clone());
        true
    }

    async fn delete(&self, code: &str) -> bool {
        let mut inner = self.lock();
        if Self::fails(&inner, code) {
            // Callers own the error report for failed deletes.
            tracing::debug!(code, "Memory store delete failed");
            return false;
        }
        // Deleting a missing child succeeds, matching the remote store.
        inner.records.remove(code);
        true
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
