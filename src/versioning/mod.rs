//! Append-only, checksum-verified version history
//!
//! One content object per version plus exactly one mutable index object per
//! template. Version numbers only ever advance; reverting creates a new
//! version rather than rewinding the pointer.

pub mod checksum;
pub mod index;
pub mod store;

use crate::storage::StorageError;
use crate::validation::ValidationIssue;
use thiserror::Error;

pub use checksum::{compute_checksum, content_fingerprint};
pub use index::{HistoryEntry, HistoryOptions, SaveOptions, SaveOutcome, WorkflowSummary};
pub use store::VersionStore;

/// Error types for version store operations
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Version {version} not found for template '{template_id}'")]
    VersionNotFound { template_id: String, version: u64 },

    #[error("Invalid template id: {0}")]
    InvalidTemplateId(String),

    #[error(
        "Checksum mismatch for template '{template_id}' version {version}: expected {expected}, got {actual}"
    )]
    ChecksumMismatch {
        template_id: String,
        version: u64,
        expected: String,
        actual: String,
    },

    #[error("Corrupted version index for template '{template_id}': {detail}")]
    CorruptIndex { template_id: String, detail: String },

    #[error("Concurrent saves for template '{0}' exhausted retries")]
    Conflict(String),

    #[error("document failed validation ({} errors)", .0.len())]
    InvalidDocument(Vec<ValidationIssue>),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
