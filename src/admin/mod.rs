//! Admin write flow.
//!
//! Every write is local-first: Application State and the local cache are
//! updated even when the remote store rejects the write, and the caller is
//! told whether the remote side kept up.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::db::LocalCache;
use crate::errors::AppError;
use crate::models::{canonical_code, DepartmentRecord, UpsertDepartmentRequest};
use crate::resolver::{Resolution, ResolutionSource, Resolver};
use crate::state::DepartmentState;
use crate::store::RecordStore;

/// Code of the throwaway record written by the connection probe.
pub const PROBE_CODE: &str = "CONNECTION-TEST";

/// Result of an upsert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOutcome {
    pub record: DepartmentRecord,
    /// False when only local state and cache took the write.
    pub remote_saved: bool,
    /// False when a newer write for the same code had already landed.
    pub applied: bool,
}

/// Result of removing one department.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveOutcome {
    pub code: String,
    pub remote_deleted: bool,
    pub source: ResolutionSource,
    pub remaining: usize,
}

/// Result of a bulk flush.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub attempted: usize,
    pub failed: Vec<String>,
}

/// Result of the remote store round-trip probe.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub store: String,
    pub saved: bool,
    pub loaded: bool,
    pub listed: bool,
    pub cleaned_up: bool,
}

impl ConnectionReport {
    pub fn ok(&self) -> bool {
        self.saved && self.loaded && self.listed && self.cleaned_up
    }
}

/// Operator-facing write operations over store, cache, and state.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn RecordStore>,
    cache: LocalCache,
    state: DepartmentState,
    resolver: Resolver,
}

impl AdminService {
    pub fn new(store: Arc<dyn RecordStore>, cache: LocalCache, state: DepartmentState) -> Self {
        let resolver = Resolver::new(store.clone(), cache.clone());
        Self {
            store,
            cache,
            state,
            resolver,
        }
    }

    /// Create or replace one department, then re-resolve when the remote
    /// store took the write.
    pub async fn upsert(&self, request: UpsertDepartmentRequest) -> Result<UpsertOutcome, AppError> {
        let code = canonical_code(&request.code);
        if code.is_empty() {
            return Err(AppError::Validation("Department code is required".to_string()));
        }
        if request.name.trim().is_empty() {
            return Err(AppError::Validation("Department name is required".to_string()));
        }

        let version = self
            .state
            .reserve_version(&code, request.expected_version)
            .await?;
        let record = request.into_record(code.clone(), version, Utc::now().to_rfc3339());

        let remote_saved = self.store.save(&code, &record).await;
        if !remote_saved {
            tracing::warn!(code = %code, "Remote save failed, department saved locally only");
        }

        let (applied, mapping) = self.state.apply_write(record.clone()).await;
        self.cache.sync_to(&mapping).await;

        // Pick up what other editors saved meanwhile. After a failed save the
        // remote snapshot would shadow the local-only record, so skip it.
        if remote_saved {
            self.resolver.reload(&self.state).await;
        }

        Ok(UpsertOutcome {
            record,
            remote_saved,
            applied,
        })
    }

    /// Remove one department everywhere, then re-resolve.
    ///
    /// Built-in codes come back from the defaults layer on the reload.
    pub async fn remove(&self, code: &str) -> Result<RemoveOutcome, AppError> {
        let code = canonical_code(code);
        if code.is_empty() {
            return Err(AppError::Validation("Department code is required".to_string()));
        }

        let remote_deleted = self.store.delete(&code).await;
        if !remote_deleted {
            tracing::warn!(code = %code, "Remote delete failed, removing locally only");
        }

        let mapping = self.state.remove(&code).await;
        self.cache.sync_to(&mapping).await;

        let resolution = self.resolver.reload(&self.state).await;

        Ok(RemoveOutcome {
            code,
            remote_deleted,
            source: resolution.source,
            remaining: resolution.mapping.len(),
        })
    }

    /// Delete every known code from the remote store one at a time, then
    /// clear the cache and state. Failures are logged and skipped.
    pub async fn flush_all(&self) -> FlushReport {
        let mut codes: BTreeSet<String> = self.store.load_all().await.into_keys().collect();
        codes.extend(self.state.mapping().await.into_keys());

        let mut report = FlushReport {
            attempted: codes.len(),
            failed: Vec::new(),
        };
        for code in codes {
            if !self.store.delete(&code).await {
                tracing::error!(code = %code, "Flush failed to delete department");
                report.failed.push(code);
            }
        }

        self.cache.clear().await;
        self.state.clear().await;

        tracing::warn!(
            attempted = report.attempted,
            failed = report.failed.len(),
            "Flushed all departments"
        );
        report
    }

    /// Run a resolution pass and install it.
    pub async fn reload(&self) -> Resolution {
        self.resolver.reload(&self.state).await
    }

    /// Round-trip a probe record through the remote store and clean it up.
    pub async fn test_connection(&self) -> ConnectionReport {
        let mut report = ConnectionReport {
            store: self.store.describe(),
            ..ConnectionReport::default()
        };

        let probe = DepartmentRecord {
            code: PROBE_CODE.to_string(),
            name: "TEST DEPARTMENT".to_string(),
            event_name: "DOTTECH".to_string(),
            tagline: "TEST • CONNECTION • WORKING".to_string(),
            date: "TEST DATE".to_string(),
            time: "TEST TIME".to_string(),
            venue: "TEST VENUE".to_string(),
            message: "This is a test message".to_string(),
            highlights: vec!["Test 1".to_string(), "Test 2".to_string()],
            saved_at: Some(Utc::now().to_rfc3339()),
            version: 0,
        };

        report.saved = self.store.save(PROBE_CODE, &probe).await;
        if report.saved {
            report.loaded = self
                .store
                .load(PROBE_CODE)
                .await
                .is_some_and(|loaded| loaded.name == probe.name);
            report.listed = self.store.load_all().await.contains_key(PROBE_CODE);
            report.cleaned_up = self.store.delete(PROBE_CODE).await;
        }

        if report.ok() {
            tracing::info!(store = %report.store, "Remote store connection working");
        } else {
            tracing::error!(?report, "Remote store connection test failed");
        }
        report
    }
}
