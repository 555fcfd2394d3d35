//! Content checksums and duplicate-detection fingerprints

use crate::types::WorkflowDocument;
use sha2::{Digest, Sha256};

/// SHA-256 checksum of stored version bytes, recomputed on read to detect
/// corruption.
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fingerprint of a document's content for duplicate detection.
///
/// Only the top-level `metadata.last_modified` is excluded: two saves that
/// differ in nothing but the edit timestamp count as the same content.
/// Nested per-entity timestamps, if the model ever grows them, need the
/// same exclusion here.
pub fn content_fingerprint(doc: &WorkflowDocument) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(doc)?;
    if let Some(metadata) = value.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        metadata.remove("last_modified");
    }
    // serde_json objects iterate in sorted key order, so this is canonical
    let canonical = serde_json::to_vec(&value)?;
    Ok(compute_checksum(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkflowDocument;

    #[test]
    fn test_fingerprint_ignores_last_modified() {
        let mut a = WorkflowDocument::new("wf", "Doc", "tester");
        let mut b = a.clone();
        b.touch();
        b.metadata.last_modified = b.metadata.last_modified + chrono::Duration::seconds(90);

        assert_ne!(a.metadata.last_modified, b.metadata.last_modified);
        assert_eq!(
            content_fingerprint(&a).unwrap(),
            content_fingerprint(&b).unwrap()
        );

        a.name = "Renamed".to_string();
        assert_ne!(
            content_fingerprint(&a).unwrap(),
            content_fingerprint(&b).unwrap()
        );
    }

    #[test]
    fn test_checksum_detects_byte_changes() {
        let a = compute_checksum(b"{\"v\":1}");
        let b = compute_checksum(b"{\"v\":2}");
        assert_ne!(a, b);
    }
}
