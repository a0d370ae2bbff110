//! REST client for a JSON document store.
//!
//! Speaks the Realtime Database REST dialect: every node is addressable as
//! `<base>/<path>.json`, `GET` of a missing node yields `null`, `PUT` replaces
//! a node and `DELETE` removes it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use super::{RecordStore, DEPARTMENTS_COLLECTION};
use crate::models::{normalize_mapping, DepartmentMapping, DepartmentRecord};

/// Typed failures of the REST client. Collapsed to soft results at the
/// [`RecordStore`] boundary, kept distinct here so logs tell them apart.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store URL {0:?}")]
    InvalidUrl(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store responded {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected collection shape: {0}")]
    Shape(&'static str),
}

/// [`RecordStore`] backed by a remote JSON document store over HTTP.
#[derive(Debug, Clone)]
pub struct RestRecordStore {
    client: Client,
    base_url: Url,
    auth: Option<String>,
}

impl RestRecordStore {
    /// Create a client rooted at `base_url`.
    pub fn new(base_url: &str, auth: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(base_url).map_err(|_| StoreError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// URL of the whole department collection.
    pub fn collection_url(&self) -> Result<Url, StoreError> {
        self.node_url(&[format!("{DEPARTMENTS_COLLECTION}.json").as_str()])
    }

    /// URL of one department record.
    pub fn record_url(&self, code: &str) -> Result<Url, StoreError> {
        self.node_url(&[DEPARTMENTS_COLLECTION, format!("{code}.json").as_str()])
    }

    fn node_url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    /// Fetch and decode the whole collection.
    pub async fn fetch_all(&self) -> Result<DepartmentMapping, StoreError> {
        let body = self.get_json(self.collection_url()?).await?;
        decode_snapshot(body)
    }

    /// Fetch one record; `Ok(None)` when the node does not exist.
    pub async fn fetch(&self, code: &str) -> Result<Option<DepartmentRecord>, StoreError> {
        let body = self.get_json(self.record_url(code)?).await?;
        if body.is_null() {
            return Ok(None);
        }
        let mut record: DepartmentRecord = serde_json::from_value(body)?;
        record.code = code.to_string();
        Ok(Some(record))
    }

    /// Replace the node for `code` with `record`.
    pub async fn put(&self, code: &str, record: &DepartmentRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.record_url(code)?)
            .json(record)
            .send()
            .await?;
        check_status(response).await.map(drop)
    }

    /// Remove the node for `code`.
    pub async fn remove(&self, code: &str) -> Result<(), StoreError> {
        let response = self.client.delete(self.record_url(code)?).send().await?;
        check_status(response).await.map(drop)
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value, StoreError> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

/// Decode a collection payload, skipping individual records that fail to parse.
pub fn decode_snapshot(body: serde_json::Value) -> Result<DepartmentMapping, StoreError> {
    let entries = match body {
        serde_json::Value::Null => return Ok(DepartmentMapping::new()),
        serde_json::Value::Object(entries) => entries,
        _ => return Err(StoreError::Shape("departments node is not an object")),
    };

    let mut raw = DepartmentMapping::new();
    for (code, value) in entries {
        match serde_json::from_value::<DepartmentRecord>(value) {
            Ok(record) => {
                raw.insert(code, record);
            }
            Err(e) => tracing::warn!(code = %code, error = %e, "Skipping undecodable department"),
        }
    }
    Ok(normalize_mapping(raw))
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn load_all(&self) -> DepartmentMapping {
        match self.fetch_all().await {
            Ok(mapping) => {
                tracing::debug!(count = mapping.len(), "Loaded departments from remote store");
                mapping
            }
            Err(e) => {
                tracing::error!(error = %e, "Remote store load-all failed");
                DepartmentMapping::new()
            }
        }
    }

    async fn load(&self, code: &str) -> Option<DepartmentRecord> {
        match self.fetch(code).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(code, error = %e, "Remote store load failed");
                None
            }
        }
    }

    async fn save(&self, code: &str, record: &DepartmentRecord) -> bool {
        match self.put(code, record).await {
            Ok(()) => {
                tracing::info!(code, "Saved department to remote store");
                true
            }
            Err(e) => {
                tracing::error!(code, error = %e, "Remote store save failed");
                false
            }
        }
    }

    async fn delete(&self, code: &str) -> bool {
        match self.remove(code).await {
            Ok(()) => {
                tracing::info!(code, "Deleted department from remote store");
                true
            }
            Err(e) => {
                // Callers own the error report for failed deletes.
                tracing::debug!(code, error = %e, "Remote store delete failed");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!("rest {}", self.base_url)
    }
}
