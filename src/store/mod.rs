//! Remote record store client.
//!
//! Every operation is non-throwing: transport failures are logged and surface
//! as an empty mapping, an absent record, or `false`, so callers can fall back
//! to the local cache or the built-in defaults without matching on errors.

mod memory;
mod rest;

pub use memory::*;
pub use rest::*;

use async_trait::async_trait;

use crate::models::{DepartmentMapping, DepartmentRecord};

/// Collection path holding one child per department code.
pub const DEPARTMENTS_COLLECTION: &str = "departments";

/// CRUD contract for department records held by the remote store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the whole collection. Empty when the store is empty or unreachable.
    async fn load_all(&self) -> DepartmentMapping;

    /// Fetch one record. Absent when missing or unreachable.
    async fn load(&self, code: &str) -> Option<DepartmentRecord>;

    /// Upsert one record under `code`. `false` on any failure.
    async fn save(&self, code: &str, record: &DepartmentRecord) -> bool;

    /// Remove one record. `false` on any failure, which the caller reports.
    async fn delete(&self, code: &str) -> bool;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}
