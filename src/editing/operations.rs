//! Tagged edit intents
//!
//! Callers describe an edit as one `EditOperation` variant rather than a
//! free-form merged map; required fields are enforced by the types before
//! any dispatch happens. Update intents carry typed patch structs whose
//! `None` fields are left untouched.

use super::{engine, EditError};
use crate::types::{
    Assignee, Constraint, ConstraintType, ElementKind, EnforcementLevel, Form, FormSchema,
    FormType, Goal, Policy, PolicyAction, PolicyCondition, Task, WorkflowDocument,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub constraint_type: Option<ConstraintType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<EnforcementLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub when: Option<PolicyCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub then: Option<PolicyAction>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,
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

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub form_type: Option<FormType>,
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

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// One structured edit intent
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    AddGoal { goal: Goal },
    UpdateGoal { id: String, patch: GoalPatch },
    DeleteGoal { id: String },
    ReorderGoals { ordered_ids: Vec<String> },
    DuplicateGoal {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_name: Option<String>,
    },
    AddConstraint { goal_id: String, constraint: Constraint },
    UpdateConstraint { id: String, patch: ConstraintPatch },
    DeleteConstraint { id: String },
    AddPolicy { goal_id: String, policy: Policy },
    UpdatePolicy { id: String, patch: PolicyPatch },
    DeletePolicy { id: String },
    AddTask { goal_id: String, task: Task },
    UpdateTask { id: String, patch: TaskPatch },
    DeleteTask { id: String },
    AddForm { goal_id: String, form: Form },
    UpdateForm { id: String, patch: FormPatch },
    DeleteForm { id: String },
    MoveElement {
        kind: ElementKind,
        id: String,
        from_goal_id: String,
        to_goal_id: String,
    },
    UpdateWorkflowMetadata { patch: MetadataPatch },
    UpdateGlobalSettings { settings: serde_json::Map<String, Value> },
}

impl EditOperation {
    /// Apply this intent to a document, producing a new document.
    pub fn apply(&self, doc: &WorkflowDocument) -> Result<WorkflowDocument, EditError> {
        match self {
            EditOperation::AddGoal { goal } => engine::add_goal(doc, goal.clone()),
            EditOperation::UpdateGoal { id, patch } => engine::update_goal(doc, id, patch.clone()),
            EditOperation::DeleteGoal { id } => engine::delete_goal(doc, id),
            EditOperation::ReorderGoals { ordered_ids } => engine::reorder_goals(doc, ordered_ids),
            EditOperation::DuplicateGoal { id, new_name } => {
                engine::duplicate_goal(doc, id, new_name.clone())
            }
            EditOperation::AddConstraint { goal_id, constraint } => {
                engine::add_constraint(doc, goal_id, constraint.clone())
            }
            EditOperation::UpdateConstraint { id, patch } => {
                engine::update_constraint(doc, id, patch.clone())
            }
            EditOperation::DeleteConstraint { id } => engine::delete_constraint(doc, id),
            EditOperation::AddPolicy { goal_id, policy } => {
                engine::add_policy(doc, goal_id, policy.clone())
            }
            EditOperation::UpdatePolicy { id, patch } => {
                engine::update_policy(doc, id, patch.clone())
            }
            EditOperation::DeletePolicy { id } => engine::delete_policy(doc, id),
            EditOperation::AddTask { goal_id, task } => engine::add_task(doc, goal_id, task.clone()),
            EditOperation::UpdateTask { id, patch } => engine::update_task(doc, id, patch.clone()),
            EditOperation::DeleteTask { id } => engine::delete_task(doc, id),
            EditOperation::AddForm { goal_id, form } => engine::add_form(doc, goal_id, form.clone()),
            EditOperation::UpdateForm { id, patch } => engine::update_form(doc, id, patch.clone()),
            EditOperation::DeleteForm { id } => engine::delete_form(doc, id),
            EditOperation::MoveElement {
                kind,
                id,
                from_goal_id,
                to_goal_id,
            } => engine::move_element(doc, *kind, id, from_goal_id, to_goal_id),
            EditOperation::UpdateWorkflowMetadata { patch } => {
                engine::update_workflow_metadata(doc, patch.clone())
            }
            EditOperation::UpdateGlobalSettings { settings } => {
                engine::update_global_settings(doc, settings.clone())
            }
        }
    }

    /// Short human-readable label for logs and edit summaries
    pub fn describe(&self) -> String {
        match self {
            EditOperation::AddGoal { goal } => format!("add goal '{}'", goal.id),
            EditOperation::UpdateGoal { id, .. } => format!("update goal '{}'", id),
            EditOperation::DeleteGoal { id } => format!("delete goal '{}'", id),
            EditOperation::ReorderGoals { .. } => "reorder goals".to_string(),
            EditOperation::DuplicateGoal { id, .. } => format!("duplicate goal '{}'", id),
            EditOperation::AddConstraint { constraint, .. } => {
                format!("add constraint '{}'", constraint.id)
            }
            EditOperation::UpdateConstraint { id, .. } => format!("update constraint '{}'", id),
            EditOperation::DeleteConstraint { id } => format!("delete constraint '{}'", id),
            EditOperation::AddPolicy { policy, .. } => format!("add policy '{}'", policy.id),
            EditOperation::UpdatePolicy { id, .. } => format!("update policy '{}'", id),
            EditOperation::DeletePolicy { id } => format!("delete policy '{}'", id),
            EditOperation::AddTask { task, .. } => format!("add task '{}'", task.id),
            EditOperation::UpdateTask { id, .. } => format!("update task '{}'", id),
            EditOperation::DeleteTask { id } => format!("delete task '{}'", id),
            EditOperation::AddForm { form, .. } => format!("add form '{}'", form.id),
            EditOperation::UpdateForm { id, .. } => format!("update form '{}'", id),
            EditOperation::DeleteForm { id } => format!("delete form '{}'", id),
            EditOperation::MoveElement { kind, id, .. } => format!("move {} '{}'", kind, id),
            EditOperation::UpdateWorkflowMetadata { .. } => "update workflow metadata".to_string(),
            EditOperation::UpdateGlobalSettings { .. } => "update global settings".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_wire_format() {
        let op: EditOperation = serde_json::from_value(json!({
            "op": "delete_task",
            "id": "t1"
        }))
        .unwrap();
        assert!(matches!(op, EditOperation::DeleteTask { ref id } if id == "t1"));
    }

    #[test]
    fn test_intent_missing_required_field_rejected() {
        // An add_task without its task payload never reaches dispatch
        let result: Result<EditOperation, _> = serde_json::from_value(json!({
            "op": "add_task",
            "goal_id": "g1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_roundtrip_omits_unset_fields() {
        let patch = TaskPatch {
            description: Some("new".to_string()),
            ..Default::default()
        };
        let v = serde_json::to_value(&patch).unwrap();
        assert_eq!(v, json!({"description": "new"}));
    }
}
