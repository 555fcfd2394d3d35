//! Version store lifecycle integration tests
//!
//! Exercises the full save / load / revert / delete lifecycle over the
//! in-memory object store, plus the filesystem store for persistence, and
//! the failure paths: duplicate-save skipping, index corruption, and
//! content-write failures that must leave the index untouched.
//!
//! Run with:
//!   cargo test --test version_lifecycle

use std::sync::Arc;

use weftline::storage::{LocalObjectStore, MemoryObjectStore, ObjectStore, StorageConfig};
use weftline::types::{Assignee, AssigneeType, Goal, Task, WorkflowDocument};
use weftline::versioning::{
    content_fingerprint, HistoryOptions, SaveOptions, VersionError, VersionStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_task(id: &str, depends_on: &[&str]) -> Task {
    Task {
        id: id.to_string(),
        description: format!("Task {}", id),
        assignee: Assignee {
            assignee_type: AssigneeType::AiAgent,
            model: Some("default".to_string()),
            role: None,
            capabilities: None,
        },
        timeout_minutes: Some(60),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        trigger_condition: None,
        schedule: None,
        continuous: None,
        approval_required: None,
        human_review: None,
        sla_minutes: None,
    }
}

fn make_goal(id: &str, order: u32, tasks: Vec<Task>) -> Goal {
    Goal {
        id: id.to_string(),
        name: format!("Goal {}", id),
        description: "integration fixture".to_string(),
        order,
        constraints: Vec::new(),
        policies: Vec::new(),
        tasks,
        forms: Vec::new(),
    }
}

fn make_doc(name: &str) -> WorkflowDocument {
    let mut doc = WorkflowDocument::new("wf-fixture", name, "integration");
    // Pin created_at so two fixtures with the same name have the same
    // content; only last_modified is excluded from duplicate detection.
    let epoch = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    doc.metadata.created_at = epoch;
    doc.metadata.last_modified = epoch;
    doc.objective = "Exercise the version store".to_string();
    doc.goals.push(make_goal(
        "g1",
        1,
        vec![make_task("t1", &[]), make_task("t2", &["t1"])],
    ));
    doc
}

fn memory_store() -> (Arc<MemoryObjectStore>, VersionStore) {
    let objects = Arc::new(MemoryObjectStore::new());
    let versions = VersionStore::new(objects.clone());
    (objects, versions)
}

/// Content equality the way the duplicate check sees it: everything except
/// the top-level last_modified stamp.
fn same_content(a: &WorkflowDocument, b: &WorkflowDocument) -> bool {
    content_fingerprint(a).unwrap() == content_fingerprint(b).unwrap()
}

// ---------------------------------------------------------------------------
// Save semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn monotonic_versions_in_call_order() {
    let (_objects, versions) = memory_store();
    for i in 1..=4u64 {
        let outcome = versions
            .save_version(
                "t1",
                &make_doc(&format!("rev {}", i)),
                SaveOptions::new("sys", format!("save {}", i)),
            )
            .await
            .unwrap();
        assert_eq!(outcome.version, i);
        assert!(!outcome.skipped);
    }

    let history = versions
        .get_version_history("t1", HistoryOptions::default())
        .await
        .unwrap();
    let numbers: Vec<u64> = history.iter().map(|e| e.record.version).collect();
    assert_eq!(numbers, vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn duplicate_save_is_skipped_without_new_version() {
    let (_objects, versions) = memory_store();
    let outcome = versions
        .save_version("t1", &make_doc("A"), SaveOptions::new("sys", "init"))
        .await
        .unwrap();
    assert_eq!(outcome.version, 1);

    // Identical content, fresh timestamp: still a duplicate
    let mut again = make_doc("A");
    again.touch();
    let outcome = versions
        .save_version("t1", &again, SaveOptions::new("sys", "noop"))
        .await
        .unwrap();
    assert_eq!(outcome.version, 1);
    assert!(outcome.skipped);

    let history = versions
        .get_version_history("t1", HistoryOptions::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(versions.load_version("t1", 2).await.is_err());
}

#[tokio::test]
async fn skip_duplicate_check_forces_a_new_version() {
    let (_objects, versions) = memory_store();
    versions
        .save_version("t1", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();

    let mut opts = SaveOptions::new("sys", "forced");
    opts.skip_duplicate_check = true;
    let outcome = versions
        .save_version("t1", &make_doc("A"), opts)
        .await
        .unwrap();
    assert_eq!(outcome.version, 2);
    assert!(!outcome.skipped);
}

#[tokio::test]
async fn round_trip_preserves_the_document() {
    let (_objects, versions) = memory_store();
    let doc = make_doc("round trip");
    versions
        .save_version("t1", &doc, SaveOptions::default())
        .await
        .unwrap();

    let loaded = versions.load_version("t1", 1).await.unwrap();
    assert_eq!(loaded, doc);

    let current = versions.load_current_version("t1").await.unwrap();
    assert_eq!(current, doc);
}

// ---------------------------------------------------------------------------
// Revert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn revert_creates_a_new_version_with_old_content() {
    let (_objects, versions) = memory_store();
    let doc_a = make_doc("A");
    let doc_b = make_doc("B");
    versions
        .save_version("t1", &doc_a, SaveOptions::new("sys", "init"))
        .await
        .unwrap();
    versions
        .save_version("t1", &doc_b, SaveOptions::new("sys", "second"))
        .await
        .unwrap();

    let outcome = versions
        .revert_to_version("t1", 1, SaveOptions::new("sys", ""))
        .await
        .unwrap();
    assert_eq!(outcome.version, 3);
    assert!(!outcome.skipped);

    // Version 3 matches version 1's content, modulo the revert timestamp
    let v3 = versions.load_version("t1", 3).await.unwrap();
    assert!(same_content(&v3, &doc_a));

    // Intervening versions are untouched and still loadable
    let v1 = versions.load_version("t1", 1).await.unwrap();
    let v2 = versions.load_version("t1", 2).await.unwrap();
    assert_eq!(v1, doc_a);
    assert_eq!(v2, doc_b);

    let history = versions
        .get_version_history("t1", HistoryOptions::default())
        .await
        .unwrap();
    assert_eq!(history[0].record.edit_summary, "Reverted to version 1");
}

#[tokio::test]
async fn revert_to_current_content_still_advances() {
    let (_objects, versions) = memory_store();
    versions
        .save_version("t1", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();

    // Reverting to the current version duplicates content on purpose: the
    // revert is its own auditable act.
    let outcome = versions
        .revert_to_version("t1", 1, SaveOptions::new("auditor", ""))
        .await
        .unwrap();
    assert_eq!(outcome.version, 2);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn corrupted_index_is_fatal_not_recreated() {
    let (objects, versions) = memory_store();
    versions
        .save_version("t1", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();

    objects
        .corrupt("workflows/t1/index.json", b"}} not json {{".to_vec())
        .await;

    let err = versions
        .save_version("t1", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VersionError::CorruptIndex { .. }));

    // Reads fail the same way; nothing fabricated an empty index
    assert!(matches!(
        versions.load_current_version("t1").await.unwrap_err(),
        VersionError::CorruptIndex { .. }
    ));
    let raw = objects.get("workflows/t1/index.json").await.unwrap();
    assert_eq!(raw, b"}} not json {{");
}

#[tokio::test]
async fn content_write_failure_leaves_index_untouched() {
    let (objects, versions) = memory_store();
    versions
        .save_version("t1", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();

    objects.fail_puts_matching(Some("versions/")).await;
    let err = versions
        .save_version("t1", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VersionError::Storage(_)));
    objects.fail_puts_matching(None).await;

    // currentVersion never advanced past the durable content
    let current = versions.load_current_version("t1").await.unwrap();
    assert_eq!(current.name, "A");
    let history = versions
        .get_version_history("t1", HistoryOptions::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);

    // And the store recovers on the next save
    let outcome = versions
        .save_version("t1", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.version, 2);
}

#[tokio::test]
async fn index_write_failure_rolls_back_the_content_object() {
    let (objects, versions) = memory_store();
    versions
        .save_version("t1", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();

    objects.fail_puts_matching(Some("index.json")).await;
    let err = versions
        .save_version("t1", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VersionError::Storage(_)));
    objects.fail_puts_matching(None).await;

    // The orphaned content object was cleaned up
    assert!(!objects.exists("workflows/t1/versions/2.json").await.unwrap());
    let outcome = versions
        .save_version("t1", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.version, 2);
}

#[tokio::test]
async fn stale_content_object_does_not_block_saves() {
    let (objects, versions) = memory_store();
    versions
        .save_version("t1", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();

    // A writer that died between its content write and its index update
    // leaves an unreferenced object at the next version key.
    objects
        .put(
            "workflows/t1/versions/2.json",
            b"{\"half\":\"written\"}".to_vec(),
        )
        .await
        .unwrap();

    // The save treats it as removable and still claims version 2
    let outcome = versions
        .save_version("t1", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.version, 2);
    assert!(!outcome.skipped);

    // The stored content is ours, checksum intact, not the dead writer's
    let v2 = versions.load_version("t1", 2).await.unwrap();
    assert_eq!(v2.name, "B");

    // And the store keeps working afterwards
    let outcome = versions
        .save_version("t1", &make_doc("C"), SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.version, 3);
}

// ---------------------------------------------------------------------------
// Delete and list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_workflow_removes_everything() {
    let (objects, versions) = memory_store();
    versions
        .save_version("t1", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();
    versions
        .save_version("t1", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap();
    versions
        .save_version("t2", &make_doc("other"), SaveOptions::default())
        .await
        .unwrap();

    let deleted = versions.delete_workflow("t1").await.unwrap();
    assert_eq!(deleted, 3); // two versions + index
    assert!(objects.list("workflows/t1/").await.unwrap().is_empty());

    assert!(matches!(
        versions.load_current_version("t1").await.unwrap_err(),
        VersionError::TemplateNotFound(_)
    ));
    // Other templates are untouched
    assert_eq!(versions.load_current_version("t2").await.unwrap().name, "other");
}

#[tokio::test]
async fn list_workflows_enumerates_templates() {
    let (_objects, versions) = memory_store();
    versions
        .save_version("alpha", &make_doc("A"), SaveOptions::default())
        .await
        .unwrap();
    versions
        .save_version("beta", &make_doc("B"), SaveOptions::default())
        .await
        .unwrap();
    versions
        .save_version("beta", &make_doc("B2"), SaveOptions::default())
        .await
        .unwrap();

    let mut summaries = versions.list_workflows().await.unwrap();
    summaries.sort_by(|a, b| a.template_id.cmp(&b.template_id));
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].template_id, "alpha");
    assert_eq!(summaries[0].current_version, 1);
    assert_eq!(summaries[1].template_id, "beta");
    assert_eq!(summaries[1].current_version, 2);
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lifecycle_survives_on_the_filesystem_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        base_dir: dir.path().to_path_buf(),
    };

    {
        let store = Arc::new(LocalObjectStore::new(config.clone()).await.unwrap());
        let versions = VersionStore::new(store);
        versions
            .save_version("t1", &make_doc("A"), SaveOptions::new("sys", "init"))
            .await
            .unwrap();
        versions
            .save_version("t1", &make_doc("B"), SaveOptions::new("sys", "update"))
            .await
            .unwrap();
    }

    // A fresh store over the same directory sees the full history
    let store = Arc::new(LocalObjectStore::new(config).await.unwrap());
    let versions = VersionStore::new(store);
    let history = versions
        .get_version_history("t1", HistoryOptions::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(versions.load_current_version("t1").await.unwrap().name, "B");
    assert_eq!(versions.load_version("t1", 1).await.unwrap().name, "A");
}
