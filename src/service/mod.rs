//! Transport-agnostic facade over the editing engine and version store
//!
//! This is the contract collaborators consume: read a template, apply a
//! batch of edit intents and save the result, revert, delete, list. Editor
//! identity is supplied by the caller and recorded verbatim; the core does
//! not authenticate it.

use crate::editing::{EditError, EditOperation};
use crate::storage::ObjectStore;
use crate::types::WorkflowDocument;
use crate::versioning::{
    HistoryEntry, HistoryOptions, SaveOptions, SaveOutcome, VersionError, VersionStore,
    WorkflowSummary,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Edit failed: {0}")]
    Edit(#[from] EditError),

    #[error("Version store error: {0}")]
    Version(#[from] VersionError),
}

pub struct WorkflowService {
    versions: VersionStore,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            versions: VersionStore::new(store),
        }
    }

    /// Direct access to the underlying version store
    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    /// Current document for a template
    pub async fn get_current(&self, template_id: &str) -> Result<WorkflowDocument, ServiceError> {
        Ok(self.versions.load_current_version(template_id).await?)
    }

    /// A specific stored version
    pub async fn get_version(
        &self,
        template_id: &str,
        version: u64,
    ) -> Result<WorkflowDocument, ServiceError> {
        Ok(self.versions.load_version(template_id, version).await?)
    }

    /// Version metadata, most recent first
    pub async fn history(
        &self,
        template_id: &str,
        opts: HistoryOptions,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        Ok(self.versions.get_version_history(template_id, opts).await?)
    }

    /// All known templates
    pub async fn list(&self) -> Result<Vec<WorkflowSummary>, ServiceError> {
        Ok(self.versions.list_workflows().await?)
    }

    /// Save a brand-new template's first version
    pub async fn create(
        &self,
        template_id: &str,
        doc: &WorkflowDocument,
        editor: &str,
        summary: &str,
    ) -> Result<SaveOutcome, ServiceError> {
        Ok(self
            .versions
            .save_version(template_id, doc, SaveOptions::new(editor, summary))
            .await?)
    }

    /// Apply edit intents to the current version and save the result as a
    /// new version. The edits are pure; nothing is persisted unless every
    /// intent applies cleanly and the result validates.
    pub async fn edit(
        &self,
        template_id: &str,
        operations: &[EditOperation],
        editor: &str,
        summary: &str,
    ) -> Result<SaveOutcome, ServiceError> {
        let mut doc = self.versions.load_current_version(template_id).await?;
        for op in operations {
            doc = op.apply(&doc)?;
        }
        let summary = if summary.is_empty() {
            operations
                .iter()
                .map(|op| op.describe())
                .collect::<Vec<_>>()
                .join("; ")
        } else {
            summary.to_string()
        };
        Ok(self
            .versions
            .save_version(template_id, &doc, SaveOptions::new(editor, summary))
            .await?)
    }

    /// Revert to an older version by creating a new one with its content
    pub async fn revert(
        &self,
        template_id: &str,
        target: u64,
        editor: &str,
        summary: &str,
    ) -> Result<SaveOutcome, ServiceError> {
        Ok(self
            .versions
            .revert_to_version(template_id, target, SaveOptions::new(editor, summary))
            .await?)
    }

    /// Remove a template and its entire history
    pub async fn delete(&self, template_id: &str) -> Result<usize, ServiceError> {
        Ok(self.versions.delete_workflow(template_id).await?)
    }
}
