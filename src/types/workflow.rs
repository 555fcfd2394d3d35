//! Workflow template document types
//!
//! A WorkflowDocument is a tree: goals own constraints, policies, tasks and
//! forms. Entity ids are unique across the whole document, not just within
//! their owning goal, and goal `order` values form a contiguous 1..N
//! sequence matching array position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// The kinds of entity nested under a goal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Constraint,
    Policy,
    Task,
    Form,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Constraint => write!(f, "constraint"),
            ElementKind::Policy => write!(f, "policy"),
            ElementKind::Task => write!(f, "task"),
            ElementKind::Form => write!(f, "form"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    TimeLimit,
    Budget,
    Quality,
    Compliance,
    Resource,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementLevel {
    Hard,
    Soft,
    Advisory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeType {
    AiAgent,
    Human,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Structured,
    Conversational,
    Automated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
    Event,
    Webhook,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    pub description: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub enforcement: EnforcementLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Condition of a policy's if-clause: a single field comparison, a raw
/// condition string, or an all_of/any_of composite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyCondition {
    Comparison {
        field: String,
        operator: String,
        value: Value,
    },
    Raw {
        condition: String,
    },
    AllOf {
        all_of: Vec<PolicyCondition>,
    },
    AnyOf {
        any_of: Vec<PolicyCondition>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyAction {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(rename = "if")]
    pub when: PolicyCondition,
    pub then: PolicyAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    #[serde(rename = "type")]
    pub assignee_type: AssigneeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub assignee: Assignee,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<i64>,
    /// Ids of tasks that must complete before this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_review: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_minutes: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default)]
    pub sections: Vec<FormSection>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub form_type: FormType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<FormSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_filled: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_provided: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub description: String,
    /// 1-based position, contiguous, matches array index + 1.
    /// 0 in an add-goal payload means "assign the next position".
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub forms: Vec<Form>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            author: "unknown".to_string(),
            created_at: now,
            last_modified: now,
            tags: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub id: String,
    pub name: String,
    pub version: String,
    pub objective: String,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_settings: Option<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<Trigger>>,
}

impl WorkflowDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "1.0".to_string(),
            objective: String::new(),
            metadata: DocumentMetadata {
                author: author.into(),
                ..Default::default()
            },
            goals: Vec::new(),
            global_settings: None,
            triggers: None,
        }
    }

    /// Every entity id in the document: goals plus all nested entities
    pub fn all_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for goal in &self.goals {
            ids.insert(goal.id.clone());
            ids.extend(goal.constraints.iter().map(|c| c.id.clone()));
            ids.extend(goal.policies.iter().map(|p| p.id.clone()));
            ids.extend(goal.tasks.iter().map(|t| t.id.clone()));
            ids.extend(goal.forms.iter().map(|f| f.id.clone()));
        }
        ids
    }

    pub fn find_goal(&self, goal_id: &str) -> Option<usize> {
        self.goals.iter().position(|g| g.id == goal_id)
    }

    /// Locate a nested entity by id: (goal index, entity index)
    pub fn find_element(&self, kind: ElementKind, id: &str) -> Option<(usize, usize)> {
        for (gi, goal) in self.goals.iter().enumerate() {
            let pos = match kind {
                ElementKind::Constraint => goal.constraints.iter().position(|c| c.id == id),
                ElementKind::Policy => goal.policies.iter().position(|p| p.id == id),
                ElementKind::Task => goal.tasks.iter().position(|t| t.id == id),
                ElementKind::Form => goal.forms.iter().position(|f| f.id == id),
            };
            if let Some(ei) = pos {
                return Some((gi, ei));
            }
        }
        None
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.goals
            .iter()
            .flat_map(|g| g.tasks.iter())
            .find(|t| t.id == task_id)
    }

    /// All task ids across every goal
    pub fn task_ids(&self) -> HashSet<String> {
        self.goals
            .iter()
            .flat_map(|g| g.tasks.iter())
            .map(|t| t.id.clone())
            .collect()
    }

    /// Stamp the last-modified timestamp
    pub fn touch(&mut self) {
        self.metadata.last_modified = Utc::now();
    }
}

/// Metadata record for one stored version
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowVersion {
    pub version: u64,
    pub template_id: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub edit_summary: String,
    pub storage_key: String,
    pub size: u64,
    pub checksum: String,
}

/// The single mutable per-template record: ordered version list plus the
/// current-version pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowVersionIndex {
    pub template_id: String,
    pub current_version: u64,
    pub versions: Vec<WorkflowVersion>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl WorkflowVersionIndex {
    pub fn new(template_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            template_id: template_id.into(),
            current_version: 0,
            versions: Vec::new(),
            created_at: now,
            last_modified: now,
        }
    }

    pub fn record_for(&self, version: u64) -> Option<&WorkflowVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub fn current_record(&self) -> Option<&WorkflowVersion> {
        self.record_for(self.current_version)
    }
}
