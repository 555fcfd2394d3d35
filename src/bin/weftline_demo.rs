//! End-to-end lifecycle demo: create a template, edit it through the
//! service facade, revert, and print the resulting history.
//!
//! Run with:
//!   cargo run --bin weftline_demo

use anyhow::Result;
use std::sync::Arc;
use weftline::editing::EditOperation;
use weftline::storage::{LocalObjectStore, StorageConfig};
use weftline::service::WorkflowService;
use weftline::types::{Assignee, AssigneeType, Goal, Task, WorkflowDocument};
use weftline::versioning::HistoryOptions;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // Keep the TempDir handle alive for the whole run
    let data_dir = tempfile::tempdir()?;
    let store = LocalObjectStore::new(StorageConfig {
        base_dir: data_dir.path().to_path_buf(),
    })
    .await?;
    let service = WorkflowService::new(Arc::new(store));

    let mut doc = WorkflowDocument::new("onboarding", "Customer Onboarding", "demo");
    doc.objective = "Onboard a new customer end to end".to_string();

    let outcome = service.create("onboarding", &doc, "demo", "initial draft").await?;
    println!("created version {}", outcome.version);

    let goal = Goal {
        id: "goal-intake".to_string(),
        name: "Intake".to_string(),
        description: "Collect customer details".to_string(),
        order: 0,
        constraints: Vec::new(),
        policies: Vec::new(),
        tasks: Vec::new(),
        forms: Vec::new(),
    };
    let task = Task {
        id: "task-collect".to_string(),
        description: "Collect signed paperwork".to_string(),
        assignee: Assignee {
            assignee_type: AssigneeType::Human,
            model: None,
            role: Some("account manager".to_string()),
            capabilities: None,
        },
        timeout_minutes: Some(120),
        depends_on: Vec::new(),
        trigger_condition: None,
        schedule: None,
        continuous: None,
        approval_required: Some(true),
        human_review: None,
        sla_minutes: None,
    };

    let outcome = service
        .edit(
            "onboarding",
            &[
                EditOperation::AddGoal { goal },
                EditOperation::AddTask {
                    goal_id: "goal-intake".to_string(),
                    task,
                },
            ],
            "demo",
            "add intake goal",
        )
        .await?;
    println!("edited into version {}", outcome.version);

    let outcome = service.revert("onboarding", 1, "demo", "").await?;
    println!("reverted as version {}", outcome.version);

    println!("\nhistory (most recent first):");
    for entry in service
        .history("onboarding", HistoryOptions::default())
        .await?
    {
        println!(
            "  v{} by {} - {}",
            entry.record.version, entry.record.created_by, entry.record.edit_summary
        );
    }

    println!("\ndata written under {}", data_dir.path().display());
    Ok(())
}
