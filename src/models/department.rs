//! Department record model and the keyed mapping built from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    DEFAULT_DATE, DEFAULT_EVENT_NAME, DEFAULT_TAGLINE, DEFAULT_TIME, DEFAULT_VENUE,
};

/// Reserved code that always resolves to a record.
pub const PUBLIC_CODE: &str = "PUBLIC";

/// Full keyed collection of department records, keyed by canonical code.
pub type DepartmentMapping = BTreeMap<String, DepartmentRecord>;

/// Canonical form of a department code: trimmed and uppercased.
pub fn canonical_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Split an operator-entered `"A, B,,C"` list into ordered, non-empty labels.
pub fn parse_highlights(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// One invitation content set keyed by a short department code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRecord {
    /// Older remote entries only carry the code as their key.
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    /// Write sequence number; higher wins regardless of completion order
    #[serde(default)]
    pub version: u64,
}

/// Request body for creating or replacing a department record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDepartmentRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
    /// Comma-separated alternative to `highlights`, as typed into the editor
    #[serde(default)]
    pub highlights_input: Option<String>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl UpsertDepartmentRequest {
    /// Build the stored record. Blank optional fields take the editor defaults.
    pub fn into_record(self, code: String, version: u64, saved_at: String) -> DepartmentRecord {
        let highlights = match (self.highlights, self.highlights_input) {
            (Some(list), _) => list
                .into_iter()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            (None, Some(input)) => parse_highlights(&input),
            (None, None) => Vec::new(),
        };

        DepartmentRecord {
            code,
            name: self.name.trim().to_string(),
            event_name: or_default(self.event_name, DEFAULT_EVENT_NAME),
            tagline: or_default(self.tagline, DEFAULT_TAGLINE),
            date: or_default(self.date, DEFAULT_DATE),
            time: or_default(self.time, DEFAULT_TIME),
            venue: or_default(self.venue, DEFAULT_VENUE),
            message: self.message.unwrap_or_default(),
            highlights,
            saved_at: Some(saved_at),
            version,
        }
    }
}

fn or_default(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// The department selected by the current request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDepartment {
    pub code: String,
    /// False only for PUBLIC; gates the department-specific page section
    pub is_specific: bool,
    pub record: DepartmentRecord,
}

/// Re-key a raw snapshot by canonical code and stamp each record's `code`.
///
/// Keys that collide after canonicalization keep the higher version; on a tie
/// the entry whose key was already canonical wins. Blank keys are dropped.
pub fn normalize_mapping(raw: DepartmentMapping) -> DepartmentMapping {
    let mut normalized = DepartmentMapping::new();
    let mut canonical_keys = std::collections::BTreeSet::new();

    for (key, mut record) in raw {
        let code = canonical_code(&key);
        if code.is_empty() {
            tracing::warn!(raw_key = %key, "Dropping department record with blank code");
            continue;
        }
        let key_is_canonical = key == code;
        record.code = code.clone();

        let replace = match normalized.get(&code) {
            None => true,
            Some(existing) if record.version != existing.version => {
                record.version > existing.version
            }
            Some(_) => key_is_canonical && !canonical_keys.contains(&code),
        };
        if replace {
            if key_is_canonical {
                canonical_keys.insert(code.clone());
            }
            normalized.insert(code, record);
        }
    }

    normalized
}
