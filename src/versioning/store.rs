//! The version store
//!
//! State machine per template: no index, then an index created on first
//! save, then a current-version pointer that only ever advances by one.
//! Content objects are written create-only before the index is updated, so
//! a failed save never leaves the pointer referencing missing content. The
//! index itself is updated with a conditional write and a bounded
//! reload-and-retry loop to close the concurrent-save race.

use super::checksum::{compute_checksum, content_fingerprint};
use super::index::{
    index_key, template_prefix, version_from_key, version_key, versions_prefix, HistoryEntry,
    HistoryOptions, SaveOptions, SaveOutcome, WorkflowSummary, INDEX_FILE, WORKFLOWS_PREFIX,
};
use super::VersionError;
use crate::storage::{object_tag, ObjectStore, StorageError};
use crate::types::{WorkflowDocument, WorkflowVersion, WorkflowVersionIndex};
use crate::validation::validate_document;
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;

const SAVE_RETRY_LIMIT: u32 = 3;

pub struct VersionStore {
    store: Arc<dyn ObjectStore>,
}

impl VersionStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Persist a document as the template's next version.
    ///
    /// Unless `skip_duplicate_check` is set, content identical to the
    /// current version (ignoring `metadata.last_modified`) is not written
    /// again; the outcome comes back with `skipped: true` and the existing
    /// version number.
    pub async fn save_version(
        &self,
        template_id: &str,
        doc: &WorkflowDocument,
        opts: SaveOptions,
    ) -> Result<SaveOutcome, VersionError> {
        check_template_id(template_id)?;

        let report = validate_document(doc);
        if !report.is_valid {
            return Err(VersionError::InvalidDocument(report.errors));
        }
        for warning in &report.warnings {
            log::debug!(
                "validation warning for '{}' at {}: {}",
                template_id,
                warning.path,
                warning.message
            );
        }

        let fingerprint = content_fingerprint(doc)?;
        let bytes = serde_json::to_vec_pretty(doc)?;
        let mut orphan_key: Option<String> = None;

        for attempt in 1..=SAVE_RETRY_LIMIT {
            let loaded = self.load_index(template_id).await?;
            let (mut index, index_tag) = match loaded {
                Some((index, tag)) => (index, Some(tag)),
                None => (WorkflowVersionIndex::new(template_id), None),
            };

            // Clean up a content object orphaned by a lost previous attempt,
            // unless the winning writer's index somehow references it.
            if let Some(key) = orphan_key.take() {
                if !index.versions.iter().any(|v| v.storage_key == key) {
                    if let Err(e) = self.store.delete(&key).await {
                        log::warn!("failed to clean up orphaned object '{}': {}", key, e);
                    }
                }
            }

            if !opts.skip_duplicate_check && index.current_version > 0 {
                let current = self
                    .load_version(template_id, index.current_version)
                    .await?;
                if content_fingerprint(&current)? == fingerprint {
                    return Ok(SaveOutcome {
                        version: index.current_version,
                        skipped: true,
                    });
                }
            }

            let next = index.current_version + 1;
            let content_key = version_key(template_id, next);

            // Create-only: an object already at this key is either a live
            // racer's (their index update lands before our reload) or the
            // leavings of a writer that died between its content write and
            // index update. The index never references an unclaimed next
            // key, so an unreferenced blocker is removable either way: a
            // still-racing writer loses its index CAS against ours and
            // retries on a fresh key.
            match self.store.put_if_tag(&content_key, bytes.clone(), None).await {
                Ok(()) => {}
                Err(StorageError::PreconditionFailed(_)) => {
                    if index.versions.iter().any(|v| v.storage_key == content_key) {
                        log::warn!(
                            "version {} of '{}' claimed concurrently (attempt {}), retrying",
                            next,
                            template_id,
                            attempt
                        );
                    } else {
                        log::warn!(
                            "removing stale content object '{}' blocking saves for '{}'",
                            content_key,
                            template_id
                        );
                        if let Err(e) = self.store.delete(&content_key).await {
                            log::warn!("failed to remove stale object '{}': {}", content_key, e);
                        }
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            index.versions.push(WorkflowVersion {
                version: next,
                template_id: template_id.to_string(),
                created_at: Utc::now(),
                created_by: opts.editor.clone(),
                edit_summary: opts.summary.clone(),
                storage_key: content_key.clone(),
                size: bytes.len() as u64,
                checksum: compute_checksum(&bytes),
            });
            index.current_version = next;
            index.last_modified = Utc::now();
            let index_bytes = serde_json::to_vec_pretty(&index)?;

            match self
                .store
                .put_if_tag(&index_key(template_id), index_bytes, index_tag.as_deref())
                .await
            {
                Ok(()) => {
                    return Ok(SaveOutcome {
                        version: next,
                        skipped: false,
                    });
                }
                Err(StorageError::PreconditionFailed(_)) => {
                    log::warn!(
                        "index for '{}' changed under save (attempt {}), retrying",
                        template_id,
                        attempt
                    );
                    orphan_key = Some(content_key);
                    continue;
                }
                Err(e) => {
                    // The index was not advanced; drop the unreferenced
                    // content object so nothing points at it either way.
                    if let Err(cleanup) = self.store.delete(&content_key).await {
                        log::warn!(
                            "failed to clean up content object '{}' after index write failure: {}",
                            content_key,
                            cleanup
                        );
                    }
                    return Err(e.into());
                }
            }
        }

        if let Some(key) = orphan_key {
            if let Err(e) = self.store.delete(&key).await {
                log::warn!("failed to clean up orphaned object '{}': {}", key, e);
            }
        }
        Err(VersionError::Conflict(template_id.to_string()))
    }

    /// Load a specific version, verifying its recorded checksum against the
    /// bytes actually read.
    pub async fn load_version(
        &self,
        template_id: &str,
        version: u64,
    ) -> Result<WorkflowDocument, VersionError> {
        check_template_id(template_id)?;
        let (index, _) = self
            .load_index(template_id)
            .await?
            .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;
        let record = index
            .record_for(version)
            .ok_or(VersionError::VersionNotFound {
                template_id: template_id.to_string(),
                version,
            })?;

        let bytes = match self.store.get(&record.storage_key).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                return Err(VersionError::VersionNotFound {
                    template_id: template_id.to_string(),
                    version,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let actual = compute_checksum(&bytes);
        if actual != record.checksum {
            return Err(VersionError::ChecksumMismatch {
                template_id: template_id.to_string(),
                version,
                expected: record.checksum.clone(),
                actual,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load whatever version the index currently points at
    pub async fn load_current_version(
        &self,
        template_id: &str,
    ) -> Result<WorkflowDocument, VersionError> {
        check_template_id(template_id)?;
        let (index, _) = self
            .load_index(template_id)
            .await?
            .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;
        self.load_version(template_id, index.current_version).await
    }

    /// Version history, most recent first
    pub async fn get_version_history(
        &self,
        template_id: &str,
        opts: HistoryOptions,
    ) -> Result<Vec<HistoryEntry>, VersionError> {
        check_template_id(template_id)?;
        let (index, _) = self
            .load_index(template_id)
            .await?
            .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;

        let mut records: Vec<WorkflowVersion> = index.versions.clone();
        records.sort_by(|a, b| b.version.cmp(&a.version));

        let limit = opts.limit.unwrap_or(records.len());
        let page: Vec<WorkflowVersion> =
            records.into_iter().skip(opts.offset).take(limit).collect();

        let mut entries = Vec::with_capacity(page.len());
        for record in page {
            let content = if opts.include_content {
                Some(self.load_version(template_id, record.version).await?)
            } else {
                None
            };
            entries.push(HistoryEntry { record, content });
        }
        Ok(entries)
    }

    /// Create a new version whose content matches an older one.
    ///
    /// Always writes, even when the target equals the current content: the
    /// revert itself is an auditable act with its own provenance.
    pub async fn revert_to_version(
        &self,
        template_id: &str,
        target: u64,
        opts: SaveOptions,
    ) -> Result<SaveOutcome, VersionError> {
        let mut doc = self.load_version(template_id, target).await?;
        doc.touch();
        let summary = if opts.summary.is_empty() {
            format!("Reverted to version {}", target)
        } else {
            opts.summary
        };
        self.save_version(
            template_id,
            &doc,
            SaveOptions {
                editor: opts.editor,
                summary,
                skip_duplicate_check: true,
            },
        )
        .await
    }

    /// Delete every version object and the index, best-effort in parallel.
    /// Returns the number of objects actually deleted.
    pub async fn delete_workflow(&self, template_id: &str) -> Result<usize, VersionError> {
        check_template_id(template_id)?;
        let keys = self.store.list(&template_prefix(template_id)).await?;
        if keys.is_empty() {
            return Err(VersionError::TemplateNotFound(template_id.to_string()));
        }

        let deletions = join_all(keys.iter().map(|key| self.store.delete(key))).await;
        let mut deleted = 0;
        for (key, result) in keys.iter().zip(deletions) {
            match result {
                Ok(()) => deleted += 1,
                Err(e) => log::warn!("failed to delete '{}': {}", key, e),
            }
        }
        Ok(deleted)
    }

    /// Enumerate all templates by their index objects
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, VersionError> {
        let keys = self.store.list(WORKFLOWS_PREFIX).await?;
        let mut summaries = Vec::new();
        for key in keys {
            if !key.ends_with(INDEX_FILE) {
                continue;
            }
            let Some(template_id) = key
                .strip_prefix(WORKFLOWS_PREFIX)
                .and_then(|rest| rest.strip_suffix(&format!("/{}", INDEX_FILE)))
            else {
                continue;
            };
            let (index, _) = self
                .load_index(template_id)
                .await?
                .ok_or_else(|| VersionError::TemplateNotFound(template_id.to_string()))?;
            summaries.push(WorkflowSummary {
                template_id: index.template_id,
                current_version: index.current_version,
                last_modified: index.last_modified,
            });
        }
        Ok(summaries)
    }

    /// Maintenance path: rebuild a template's index from its version
    /// objects. Never invoked automatically; a corrupt index stays a hard
    /// error on every read/save path until an operator calls this.
    pub async fn rebuild_index(
        &self,
        template_id: &str,
    ) -> Result<WorkflowVersionIndex, VersionError> {
        check_template_id(template_id)?;
        let keys = self.store.list(&versions_prefix(template_id)).await?;
        let mut numbered: Vec<(u64, String)> = keys
            .into_iter()
            .filter_map(|key| version_from_key(template_id, &key).map(|n| (n, key)))
            .collect();
        numbered.sort();
        if numbered.is_empty() {
            return Err(VersionError::TemplateNotFound(template_id.to_string()));
        }

        let mut index = WorkflowVersionIndex::new(template_id);
        for (version, key) in numbered {
            let bytes = self.store.get(&key).await?;
            let doc: WorkflowDocument = serde_json::from_slice(&bytes)?;
            index.versions.push(WorkflowVersion {
                version,
                template_id: template_id.to_string(),
                created_at: doc.metadata.last_modified,
                created_by: "index-rebuild".to_string(),
                edit_summary: "Recovered from version objects".to_string(),
                storage_key: key,
                size: bytes.len() as u64,
                checksum: compute_checksum(&bytes),
            });
            index.current_version = version;
        }
        index.last_modified = Utc::now();

        let index_bytes = serde_json::to_vec_pretty(&index)?;
        self.store.put(&index_key(template_id), index_bytes).await?;
        log::warn!(
            "rebuilt index for '{}' from {} version objects",
            template_id,
            index.versions.len()
        );
        Ok(index)
    }

    /// Load the index and the tag of the bytes it was parsed from.
    ///
    /// A missing index is `Ok(None)`; existing-but-unparseable bytes are a
    /// hard `CorruptIndex` error, never treated as an empty index (that
    /// would orphan still-present version objects).
    async fn load_index(
        &self,
        template_id: &str,
    ) -> Result<Option<(WorkflowVersionIndex, String)>, VersionError> {
        let bytes = match self.store.get(&index_key(template_id)).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let index: WorkflowVersionIndex =
            serde_json::from_slice(&bytes).map_err(|e| VersionError::CorruptIndex {
                template_id: template_id.to_string(),
                detail: e.to_string(),
            })?;
        Ok(Some((index, object_tag(&bytes))))
    }
}

fn check_template_id(template_id: &str) -> Result<(), VersionError> {
    if template_id.is_empty()
        || template_id.contains('/')
        || template_id.contains("..")
    {
        return Err(VersionError::InvalidTemplateId(template_id.to_string()));
    }
    Ok(())
}
