//! Index key layout and version-store option/result types
//!
//! Persisted layout: one content object per version at
//! `workflows/{template}/versions/{n}.json`, plus exactly one index object
//! per template at `workflows/{template}/index.json`.

use crate::types::{WorkflowDocument, WorkflowVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WORKFLOWS_PREFIX: &str = "workflows/";
pub const INDEX_FILE: &str = "index.json";

pub fn template_prefix(template_id: &str) -> String {
    format!("{}{}/", WORKFLOWS_PREFIX, template_id)
}

pub fn index_key(template_id: &str) -> String {
    format!("{}{}", template_prefix(template_id), INDEX_FILE)
}

pub fn versions_prefix(template_id: &str) -> String {
    format!("{}versions/", template_prefix(template_id))
}

pub fn version_key(template_id: &str, version: u64) -> String {
    format!("{}{}.json", versions_prefix(template_id), version)
}

/// Parse the version number back out of a content-object key
pub fn version_from_key(template_id: &str, key: &str) -> Option<u64> {
    key.strip_prefix(&versions_prefix(template_id))?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Options for a save
#[derive(Clone, Debug)]
pub struct SaveOptions {
    /// Editor identity, recorded verbatim for audit; not authenticated
    pub editor: String,
    pub summary: String,
    pub skip_duplicate_check: bool,
}

impl SaveOptions {
    pub fn new(editor: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            editor: editor.into(),
            summary: summary.into(),
            skip_duplicate_check: false,
        }
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::new("system", "")
    }
}

/// Result of a save
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub version: u64,
    /// True when the save was a no-op because content matched the current
    /// version; `version` is then the existing current version.
    pub skipped: bool,
}

/// Options for reading version history
#[derive(Clone, Debug, Default)]
pub struct HistoryOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    pub include_content: bool,
}

/// One history entry, most-recent-first, optionally hydrated
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: WorkflowVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<WorkflowDocument>,
}

/// Listing entry for one template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub template_id: String,
    pub current_version: u64,
    pub last_modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(index_key("t1"), "workflows/t1/index.json");
        assert_eq!(version_key("t1", 7), "workflows/t1/versions/7.json");
    }

    #[test]
    fn test_version_from_key() {
        assert_eq!(version_from_key("t1", "workflows/t1/versions/12.json"), Some(12));
        assert_eq!(version_from_key("t1", "workflows/t1/index.json"), None);
        assert_eq!(version_from_key("t2", "workflows/t1/versions/12.json"), None);
    }
}
