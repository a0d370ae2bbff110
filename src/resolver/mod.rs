//! Resolution and merge engine.
//!
//! A resolution pass reconciles the remote store, the local cache, and the
//! built-in defaults into one authoritative mapping. Tiers are consulted
//! strictly in that order, and defaults are always the base layer: remote or
//! cached entries add or replace whole records, never remove a default.

use std::sync::Arc;

use serde::Serialize;

use crate::db::LocalCache;
use crate::models::{
    canonical_code, default_departments, default_public, normalize_mapping, ActiveDepartment,
    DepartmentMapping, PUBLIC_CODE,
};
use crate::state::DepartmentState;
use crate::store::RecordStore;

/// Which tier produced a resolved mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionSource {
    /// Remote snapshot over defaults; mirrored to the cache.
    Remote,
    /// Cached snapshot over defaults.
    Cache,
    /// Defaults alone; written to the cache as a bootstrap.
    Defaults,
    /// The pass itself failed; cache or defaults, nothing persisted.
    Recovered,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub mapping: DepartmentMapping,
    pub source: ResolutionSource,
}

/// Overlay `overlay` onto `defaults`. Colliding codes take the overlay record whole.
pub fn merge_over_defaults(
    defaults: &DepartmentMapping,
    overlay: DepartmentMapping,
) -> DepartmentMapping {
    let mut merged = defaults.clone();
    merged.extend(normalize_mapping(overlay));
    merged
}

/// Pick the active department for a requested code. Total: unknown, blank,
/// or missing codes resolve to PUBLIC, falling back to the built-in record.
pub fn resolve_active(mapping: &DepartmentMapping, requested: Option<&str>) -> ActiveDepartment {
    if let Some(code) = requested.map(canonical_code) {
        if let Some(record) = mapping.get(&code) {
            return ActiveDepartment {
                is_specific: code != PUBLIC_CODE,
                code,
                record: record.clone(),
            };
        }
    }

    let record = mapping
        .get(PUBLIC_CODE)
        .cloned()
        .unwrap_or_else(default_public);
    ActiveDepartment {
        code: PUBLIC_CODE.to_string(),
        is_specific: false,
        record,
    }
}

/// Runs resolution passes against one store and one cache.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn RecordStore>,
    cache: LocalCache,
}

impl Resolver {
    pub fn new(store: Arc<dyn RecordStore>, cache: LocalCache) -> Self {
        Self { store, cache }
    }

    /// Run one resolution pass.
    ///
    /// The pass runs as its own task; if it panics (a misbehaving store
    /// implementation, say) the cache-then-defaults recovery path is taken
    /// without writing to the cache.
    pub async fn resolve(&self) -> Resolution {
        let pass = tokio::spawn(run_pass(self.store.clone(), self.cache.clone()));
        match pass.await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(error = %e, "Resolution pass aborted, recovering from cache");
                self.recover().await
            }
        }
    }

    /// Resolve and install the result into `state`.
    pub async fn reload(&self, state: &DepartmentState) -> Resolution {
        let since = state.revision().await;
        let resolution = self.resolve().await;
        let mapping = state.install(resolution.mapping, since).await;
        tracing::info!(
            source = ?resolution.source,
            count = mapping.len(),
            "Department mapping resolved"
        );
        Resolution {
            mapping,
            source: resolution.source,
        }
    }

    async fn recover(&self) -> Resolution {
        let defaults = default_departments();
        let local = self.cache.load_all().await;
        let mapping = if local.is_empty() {
            defaults
        } else {
            merge_over_defaults(&defaults, local)
        };
        Resolution {
            mapping,
            source: ResolutionSource::Recovered,
        }
    }
}

async fn run_pass(store: Arc<dyn RecordStore>, cache: LocalCache) -> Resolution {
    let defaults = default_departments();

    let remote = store.load_all().await;
    if !remote.is_empty() {
        tracing::debug!(store = %store.describe(), count = remote.len(), "Using remote snapshot");
        let mapping = merge_over_defaults(&defaults, remote);
        cache.sync_to(&mapping).await;
        return Resolution {
            mapping,
            source: ResolutionSource::Remote,
        };
    }

    let local = cache.load_all().await;
    if !local.is_empty() {
        tracing::info!(count = local.len(), "Remote store empty or unavailable, using local cache");
        return Resolution {
            mapping: merge_over_defaults(&defaults, local),
            source: ResolutionSource::Cache,
        };
    }

    tracing::info!("No remote or cached departments, bootstrapping defaults");
    cache.sync_to(&defaults).await;
    Resolution {
        mapping: defaults,
        source: ResolutionSource::Defaults,
    }
}
