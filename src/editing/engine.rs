//! The structural transformation functions
//!
//! Each function clones the input document, applies one edit, stamps
//! `metadata.last_modified`, and re-establishes invariants. Structural
//! operations (goal add/delete/reorder, goal duplication, task add) also
//! run the schema validator on the result and refuse to return a document
//! that would not pass.

use super::operations::{ConstraintPatch, FormPatch, GoalPatch, MetadataPatch, PolicyPatch, TaskPatch};
use super::EditError;
use crate::types::{
    Constraint, ElementKind, Form, Goal, Policy, Task, WorkflowDocument,
};
use crate::validation::validate_document;
use std::collections::HashSet;
use uuid::Uuid;

type EditResult = Result<WorkflowDocument, EditError>;

// === Goals ===

/// Add a goal. An `order` of 0 means "unassigned" and gets the next
/// sequential position; an explicit order must equal the next position.
pub fn add_goal(doc: &WorkflowDocument, mut goal: Goal) -> EditResult {
    if goal.id.is_empty() {
        return Err(EditError::InvalidInput("goal id must not be empty".to_string()));
    }
    check_new_ids(doc, &collect_goal_ids(&goal))?;

    let next_order = doc.goals.len() as u32 + 1;
    if goal.order == 0 {
        goal.order = next_order;
    } else if goal.order != next_order {
        return Err(EditError::InvalidInput(format!(
            "goal order {} does not match next position {}",
            goal.order, next_order
        )));
    }

    let mut out = doc.clone();
    out.goals.push(goal);
    out.touch();
    check_result(out)
}

pub fn update_goal(doc: &WorkflowDocument, goal_id: &str, patch: GoalPatch) -> EditResult {
    let gi = doc
        .find_goal(goal_id)
        .ok_or_else(|| EditError::not_found("goal", goal_id))?;

    let mut out = doc.clone();
    let goal = &mut out.goals[gi];
    if let Some(name) = patch.name {
        goal.name = name;
    }
    if let Some(description) = patch.description {
        goal.description = description;
    }
    out.touch();
    Ok(out)
}

/// Delete a goal and everything it owns, then renumber the remaining goals
/// to a contiguous 1..N. Tasks elsewhere that depended on the deleted
/// goal's tasks have those entries pruned.
pub fn delete_goal(doc: &WorkflowDocument, goal_id: &str) -> EditResult {
    let gi = doc
        .find_goal(goal_id)
        .ok_or_else(|| EditError::not_found("goal", goal_id))?;

    let mut out = doc.clone();
    let removed = out.goals.remove(gi);
    let removed_tasks: HashSet<String> = removed.tasks.iter().map(|t| t.id.clone()).collect();
    for goal in &mut out.goals {
        for task in &mut goal.tasks {
            task.depends_on.retain(|dep| !removed_tasks.contains(dep));
        }
    }
    renumber(&mut out);
    out.touch();
    check_result(out)
}

/// Reorder goals to match `ordered_ids`, which must be an exact permutation
/// of the existing goal ids.
pub fn reorder_goals(doc: &WorkflowDocument, ordered_ids: &[String]) -> EditResult {
    if ordered_ids.len() != doc.goals.len() {
        return Err(EditError::InvalidReorder(format!(
            "expected {} goal ids, got {}",
            doc.goals.len(),
            ordered_ids.len()
        )));
    }
    let mut seen = HashSet::new();
    for id in ordered_ids {
        if !seen.insert(id.as_str()) {
            return Err(EditError::InvalidReorder(format!("duplicate goal id '{}'", id)));
        }
        if doc.find_goal(id).is_none() {
            return Err(EditError::InvalidReorder(format!("unknown goal id '{}'", id)));
        }
    }

    let mut out = doc.clone();
    let mut reordered = Vec::with_capacity(out.goals.len());
    for id in ordered_ids {
        if let Some(gi) = out.goals.iter().position(|g| &g.id == id) {
            reordered.push(out.goals.remove(gi));
        }
    }
    out.goals = reordered;
    renumber(&mut out);
    out.touch();
    check_result(out)
}

/// Deep-copy a goal and all nested entities with fresh ids, appended at the
/// end. Copied tasks get their `depends_on` cleared: the old references
/// point at the original goal's tasks, not the copies.
pub fn duplicate_goal(
    doc: &WorkflowDocument,
    goal_id: &str,
    new_name: Option<String>,
) -> EditResult {
    let gi = doc
        .find_goal(goal_id)
        .ok_or_else(|| EditError::not_found("goal", goal_id))?;

    let mut occupied = doc.all_ids();
    let source = &doc.goals[gi];
    let mut copy = source.clone();
    copy.id = fresh_id("goal", &mut occupied);
    copy.name = new_name.unwrap_or_else(|| format!("{} (copy)", source.name));
    copy.order = doc.goals.len() as u32 + 1;
    for constraint in &mut copy.constraints {
        constraint.id = fresh_id("constraint", &mut occupied);
    }
    for policy in &mut copy.policies {
        policy.id = fresh_id("policy", &mut occupied);
    }
    for task in &mut copy.tasks {
        task.id = fresh_id("task", &mut occupied);
        task.depends_on.clear();
    }
    for form in &mut copy.forms {
        form.id = fresh_id("form", &mut occupied);
    }

    let mut out = doc.clone();
    out.goals.push(copy);
    out.touch();
    check_result(out)
}

// === Constraints ===

pub fn add_constraint(doc: &WorkflowDocument, goal_id: &str, constraint: Constraint) -> EditResult {
    if constraint.id.is_empty() {
        return Err(EditError::InvalidInput("constraint id must not be empty".to_string()));
    }
    let gi = doc
        .find_goal(goal_id)
        .ok_or_else(|| EditError::not_found("goal", goal_id))?;
    check_new_ids(doc, &[constraint.id.clone()])?;

    let mut out = doc.clone();
    out.goals[gi].constraints.push(constraint);
    out.touch();
    Ok(out)
}

pub fn update_constraint(doc: &WorkflowDocument, id: &str, patch: ConstraintPatch) -> EditResult {
    let (gi, ci) = doc
        .find_element(ElementKind::Constraint, id)
        .ok_or_else(|| EditError::not_found("constraint", id))?;

    let mut out = doc.clone();
    let constraint = &mut out.goals[gi].constraints[ci];
    if let Some(description) = patch.description {
        constraint.description = description;
    }
    if let Some(constraint_type) = patch.constraint_type {
        constraint.constraint_type = constraint_type;
    }
    if let Some(enforcement) = patch.enforcement {
        constraint.enforcement = enforcement;
    }
    if let Some(value) = patch.value {
        constraint.value = Some(value);
    }
    if let Some(unit) = patch.unit {
        constraint.unit = Some(unit);
    }
    if let Some(condition) = patch.condition {
        constraint.condition = Some(condition);
    }
    out.touch();
    Ok(out)
}

pub fn delete_constraint(doc: &WorkflowDocument, id: &str) -> EditResult {
    let (gi, ci) = doc
        .find_element(ElementKind::Constraint, id)
        .ok_or_else(|| EditError::not_found("constraint", id))?;

    let mut out = doc.clone();
    out.goals[gi].constraints.remove(ci);
    out.touch();
    Ok(out)
}

// === Policies ===

pub fn add_policy(doc: &WorkflowDocument, goal_id: &str, policy: Policy) -> EditResult {
    if policy.id.is_empty() {
        return Err(EditError::InvalidInput("policy id must not be empty".to_string()));
    }
    let gi = doc
        .find_goal(goal_id)
        .ok_or_else(|| EditError::not_found("goal", goal_id))?;
    check_new_ids(doc, &[policy.id.clone()])?;

    let mut out = doc.clone();
    out.goals[gi].policies.push(policy);
    out.touch();
    Ok(out)
}

pub fn update_policy(doc: &WorkflowDocument, id: &str, patch: PolicyPatch) -> EditResult {
    let (gi, pi) = doc
        .find_element(ElementKind::Policy, id)
        .ok_or_else(|| EditError::not_found("policy", id))?;

    let mut out = doc.clone();
    let policy = &mut out.goals[gi].policies[pi];
    if let Some(name) = patch.name {
        policy.name = name;
    }
    if let Some(when) = patch.when {
        policy.when = when;
    }
    if let Some(then) = patch.then {
        policy.then = then;
    }
    out.touch();
    Ok(out)
}

pub fn delete_policy(doc: &WorkflowDocument, id: &str) -> EditResult {
    let (gi, pi) = doc
        .find_element(ElementKind::Policy, id)
        .ok_or_else(|| EditError::not_found("policy", id))?;

    let mut out = doc.clone();
    out.goals[gi].policies.remove(pi);
    out.touch();
    Ok(out)
}

// === Tasks ===

pub fn add_task(doc: &WorkflowDocument, goal_id: &str, task: Task) -> EditResult {
    if task.id.is_empty() {
        return Err(EditError::InvalidInput("task id must not be empty".to_string()));
    }
    if task.description.is_empty() {
        return Err(EditError::InvalidInput("task description must not be empty".to_string()));
    }
    let gi = doc
        .find_goal(goal_id)
        .ok_or_else(|| EditError::not_found("goal", goal_id))?;
    check_new_ids(doc, &[task.id.clone()])?;

    let mut out = doc.clone();
    out.goals[gi].tasks.push(task);
    out.touch();
    check_result(out)
}

pub fn update_task(doc: &WorkflowDocument, id: &str, patch: TaskPatch) -> EditResult {
    let (gi, ti) = doc
        .find_element(ElementKind::Task, id)
        .ok_or_else(|| EditError::not_found("task", id))?;

    if let Some(deps) = &patch.depends_on {
        let known = doc.task_ids();
        for dep in deps {
            if !known.contains(dep) {
                return Err(EditError::InvalidInput(format!(
                    "depends_on references unknown task '{}'",
                    dep
                )));
            }
        }
    }

    let mut out = doc.clone();
    let task = &mut out.goals[gi].tasks[ti];
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(assignee) = patch.assignee {
        task.assignee = assignee;
    }
    if let Some(timeout_minutes) = patch.timeout_minutes {
        task.timeout_minutes = Some(timeout_minutes);
    }
    if let Some(depends_on) = patch.depends_on {
        task.depends_on = depends_on;
    }
    if let Some(trigger_condition) = patch.trigger_condition {
        task.trigger_condition = Some(trigger_condition);
    }
    if let Some(schedule) = patch.schedule {
        task.schedule = Some(schedule);
    }
    if let Some(continuous) = patch.continuous {
        task.continuous = Some(continuous);
    }
    if let Some(approval_required) = patch.approval_required {
        task.approval_required = Some(approval_required);
    }
    if let Some(human_review) = patch.human_review {
        task.human_review = Some(human_review);
    }
    if let Some(sla_minutes) = patch.sla_minutes {
        task.sla_minutes = Some(sla_minutes);
    }
    out.touch();
    Ok(out)
}

/// Delete a task and strip its id from every other task's `depends_on`.
pub fn delete_task(doc: &WorkflowDocument, id: &str) -> EditResult {
    let (gi, ti) = doc
        .find_element(ElementKind::Task, id)
        .ok_or_else(|| EditError::not_found("task", id))?;

    let mut out = doc.clone();
    out.goals[gi].tasks.remove(ti);
    for goal in &mut out.goals {
        for task in &mut goal.tasks {
            task.depends_on.retain(|dep| dep != id);
        }
    }
    out.touch();
    Ok(out)
}

// === Forms ===

pub fn add_form(doc: &WorkflowDocument, goal_id: &str, form: Form) -> EditResult {
    if form.id.is_empty() {
        return Err(EditError::InvalidInput("form id must not be empty".to_string()));
    }
    let gi = doc
        .find_goal(goal_id)
        .ok_or_else(|| EditError::not_found("goal", goal_id))?;
    check_new_ids(doc, &[form.id.clone()])?;

    let mut out = doc.clone();
    out.goals[gi].forms.push(form);
    out.touch();
    Ok(out)
}

pub fn update_form(doc: &WorkflowDocument, id: &str, patch: FormPatch) -> EditResult {
    let (gi, fi) = doc
        .find_element(ElementKind::Form, id)
        .ok_or_else(|| EditError::not_found("form", id))?;

    let mut out = doc.clone();
    let form = &mut out.goals[gi].forms[fi];
    if let Some(name) = patch.name {
        form.name = name;
    }
    if let Some(form_type) = patch.form_type {
        form.form_type = form_type;
    }
    if let Some(schema) = patch.schema {
        form.schema = Some(schema);
    }
    if let Some(agent) = patch.agent {
        form.agent = Some(agent);
    }
    if let Some(template) = patch.template {
        form.template = Some(template);
    }
    if let Some(pre_filled) = patch.pre_filled {
        form.pre_filled = Some(pre_filled);
    }
    if let Some(generation) = patch.generation {
        form.generation = Some(generation);
    }
    if let Some(initial_prompt) = patch.initial_prompt {
        form.initial_prompt = Some(initial_prompt);
    }
    if let Some(context_provided) = patch.context_provided {
        form.context_provided = Some(context_provided);
    }
    if let Some(distribution) = patch.distribution {
        form.distribution = Some(distribution);
    }
    out.touch();
    Ok(out)
}

pub fn delete_form(doc: &WorkflowDocument, id: &str) -> EditResult {
    let (gi, fi) = doc
        .find_element(ElementKind::Form, id)
        .ok_or_else(|| EditError::not_found("form", id))?;

    let mut out = doc.clone();
    out.goals[gi].forms.remove(fi);
    out.touch();
    Ok(out)
}

// === Cross-goal and document-level operations ===

/// Move one entity from one goal to another, preserving its id and content.
pub fn move_element(
    doc: &WorkflowDocument,
    kind: ElementKind,
    id: &str,
    from_goal_id: &str,
    to_goal_id: &str,
) -> EditResult {
    let from = doc
        .find_goal(from_goal_id)
        .ok_or_else(|| EditError::not_found("goal", from_goal_id))?;
    let to = doc
        .find_goal(to_goal_id)
        .ok_or_else(|| EditError::not_found("goal", to_goal_id))?;

    let mut out = doc.clone();
    match kind {
        ElementKind::Constraint => {
            let pos = out.goals[from]
                .constraints
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| EditError::not_found(kind, id))?;
            let element = out.goals[from].constraints.remove(pos);
            out.goals[to].constraints.push(element);
        }
        ElementKind::Policy => {
            let pos = out.goals[from]
                .policies
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| EditError::not_found(kind, id))?;
            let element = out.goals[from].policies.remove(pos);
            out.goals[to].policies.push(element);
        }
        ElementKind::Task => {
            let pos = out.goals[from]
                .tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| EditError::not_found(kind, id))?;
            let element = out.goals[from].tasks.remove(pos);
            out.goals[to].tasks.push(element);
        }
        ElementKind::Form => {
            let pos = out.goals[from]
                .forms
                .iter()
                .position(|f| f.id == id)
                .ok_or_else(|| EditError::not_found(kind, id))?;
            let element = out.goals[from].forms.remove(pos);
            out.goals[to].forms.push(element);
        }
    }
    out.touch();
    Ok(out)
}

/// Shallow-merge onto the document and its metadata sub-object.
pub fn update_workflow_metadata(doc: &WorkflowDocument, patch: MetadataPatch) -> EditResult {
    let mut out = doc.clone();
    if let Some(name) = patch.name {
        out.name = name;
    }
    if let Some(objective) = patch.objective {
        out.objective = objective;
    }
    if let Some(version) = patch.version {
        out.version = version;
    }
    if let Some(author) = patch.author {
        out.metadata.author = author;
    }
    if let Some(tags) = patch.tags {
        out.metadata.tags = tags;
    }
    out.touch();
    Ok(out)
}

/// Shallow-merge key/value pairs onto `global_settings`.
pub fn update_global_settings(
    doc: &WorkflowDocument,
    partial: serde_json::Map<String, serde_json::Value>,
) -> EditResult {
    let mut out = doc.clone();
    let settings = out.global_settings.get_or_insert_with(serde_json::Map::new);
    for (key, value) in partial {
        settings.insert(key, value);
    }
    out.touch();
    Ok(out)
}

// === Helpers ===

fn renumber(doc: &mut WorkflowDocument) {
    for (i, goal) in doc.goals.iter_mut().enumerate() {
        goal.order = i as u32 + 1;
    }
}

fn collect_goal_ids(goal: &Goal) -> Vec<String> {
    let mut ids = vec![goal.id.clone()];
    ids.extend(goal.constraints.iter().map(|c| c.id.clone()));
    ids.extend(goal.policies.iter().map(|p| p.id.clone()));
    ids.extend(goal.tasks.iter().map(|t| t.id.clone()));
    ids.extend(goal.forms.iter().map(|f| f.id.clone()));
    ids
}

fn check_new_ids(doc: &WorkflowDocument, new_ids: &[String]) -> Result<(), EditError> {
    let occupied = doc.all_ids();
    let mut incoming = HashSet::new();
    for id in new_ids {
        if occupied.contains(id) || !incoming.insert(id.clone()) {
            return Err(EditError::DuplicateId(id.clone()));
        }
    }
    Ok(())
}

fn fresh_id(prefix: &str, occupied: &mut HashSet<String>) -> String {
    loop {
        let candidate = format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8]);
        if occupied.insert(candidate.clone()) {
            return candidate;
        }
    }
}

fn check_result(doc: WorkflowDocument) -> EditResult {
    let report = validate_document(&doc);
    if report.is_valid {
        Ok(doc)
    } else {
        Err(EditError::InvalidResult(report.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Assignee, AssigneeType, ConstraintType, EnforcementLevel, FormType};

    fn goal(id: &str, order: u32) -> Goal {
        Goal {
            id: id.to_string(),
            name: format!("Goal {}", id),
            description: "A goal".to_string(),
            order,
            constraints: Vec::new(),
            policies: Vec::new(),
            tasks: Vec::new(),
            forms: Vec::new(),
        }
    }

    fn task(id: &str, depends_on: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            description: format!("Task {}", id),
            assignee: Assignee {
                assignee_type: AssigneeType::AiAgent,
                model: Some("gpt".to_string()),
                role: None,
                capabilities: None,
            },
            timeout_minutes: None,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            trigger_condition: None,
            schedule: None,
            continuous: None,
            approval_required: None,
            human_review: None,
            sla_minutes: None,
        }
    }

    fn sample_doc() -> WorkflowDocument {
        let mut doc = WorkflowDocument::new("wf-1", "Sample", "tester");
        doc.objective = "Test editing".to_string();
        let mut g1 = goal("g1", 1);
        g1.tasks.push(task("t1", &[]));
        g1.tasks.push(task("t2", &["t1"]));
        let g2 = goal("g2", 2);
        doc.goals.push(g1);
        doc.goals.push(g2);
        doc
    }

    #[test]
    fn test_add_goal_auto_assigns_order() {
        let doc = sample_doc();
        let out = add_goal(&doc, goal("g3", 0)).unwrap();
        assert_eq!(out.goals[2].order, 3);
        // input untouched
        assert_eq!(doc.goals.len(), 2);
    }

    #[test]
    fn test_add_goal_rejects_id_collision() {
        let doc = sample_doc();
        let err = add_goal(&doc, goal("g1", 0)).unwrap_err();
        assert!(matches!(err, EditError::DuplicateId(id) if id == "g1"));
    }

    #[test]
    fn test_add_goal_rejects_nested_id_collision() {
        let doc = sample_doc();
        let mut g3 = goal("g3", 0);
        g3.tasks.push(task("t1", &[]));
        let err = add_goal(&doc, g3).unwrap_err();
        assert!(matches!(err, EditError::DuplicateId(id) if id == "t1"));
    }

    #[test]
    fn test_delete_goal_renumbers() {
        let doc = sample_doc();
        let out = delete_goal(&doc, "g1").unwrap();
        assert_eq!(out.goals.len(), 1);
        assert_eq!(out.goals[0].id, "g2");
        assert_eq!(out.goals[0].order, 1);
    }

    #[test]
    fn test_delete_goal_prunes_cross_goal_dependencies() {
        let mut doc = sample_doc();
        doc.goals[1].tasks.push(task("t3", &["t1"]));
        let out = delete_goal(&doc, "g1").unwrap();
        assert!(out.goals[0].tasks[0].depends_on.is_empty());
    }

    #[test]
    fn test_delete_task_strips_depends_on() {
        let doc = sample_doc();
        let out = delete_task(&doc, "t1").unwrap();
        let t2 = out.find_task("t2").unwrap();
        assert!(t2.depends_on.is_empty());
    }

    #[test]
    fn test_delete_not_found() {
        let doc = sample_doc();
        let err = delete_task(&doc, "t9").unwrap_err();
        assert!(matches!(err, EditError::NotFound { .. }));
    }

    #[test]
    fn test_reorder_goals() {
        let doc = sample_doc();
        let out = reorder_goals(&doc, &["g2".to_string(), "g1".to_string()]).unwrap();
        assert_eq!(out.goals[0].id, "g2");
        assert_eq!(out.goals[0].order, 1);
        assert_eq!(out.goals[1].id, "g1");
        assert_eq!(out.goals[1].order, 2);
    }

    #[test]
    fn test_reorder_rejects_bad_permutations() {
        let doc = sample_doc();
        assert!(matches!(
            reorder_goals(&doc, &["g1".to_string()]),
            Err(EditError::InvalidReorder(_))
        ));
        assert!(matches!(
            reorder_goals(&doc, &["g1".to_string(), "g1".to_string()]),
            Err(EditError::InvalidReorder(_))
        ));
        assert!(matches!(
            reorder_goals(&doc, &["g1".to_string(), "g9".to_string()]),
            Err(EditError::InvalidReorder(_))
        ));
    }

    #[test]
    fn test_duplicate_goal_fresh_ids_and_cleared_deps() {
        let doc = sample_doc();
        let out = duplicate_goal(&doc, "g1", Some("Copied".to_string())).unwrap();
        assert_eq!(out.goals.len(), 3);
        let copy = &out.goals[2];
        assert_eq!(copy.name, "Copied");
        assert_eq!(copy.order, 3);
        assert_ne!(copy.id, "g1");
        assert_eq!(copy.tasks.len(), 2);
        for t in &copy.tasks {
            assert!(t.depends_on.is_empty());
            assert!(doc.find_task(&t.id).is_none(), "id {} not fresh", t.id);
        }
    }

    #[test]
    fn test_move_task_between_goals() {
        let doc = sample_doc();
        let out = move_element(&doc, ElementKind::Task, "t2", "g1", "g2").unwrap();
        assert_eq!(out.goals[0].tasks.len(), 1);
        assert_eq!(out.goals[1].tasks.len(), 1);
        let moved = &out.goals[1].tasks[0];
        assert_eq!(moved.id, "t2");
        // content preserved, including dependencies that still resolve
        assert_eq!(moved.depends_on, vec!["t1".to_string()]);
    }

    #[test]
    fn test_move_element_wrong_source_goal() {
        let doc = sample_doc();
        let err = move_element(&doc, ElementKind::Task, "t2", "g2", "g1").unwrap_err();
        assert!(matches!(err, EditError::NotFound { .. }));
    }

    #[test]
    fn test_add_constraint_and_update() {
        let doc = sample_doc();
        let c = Constraint {
            id: "c1".to_string(),
            description: "within budget".to_string(),
            constraint_type: ConstraintType::Budget,
            enforcement: EnforcementLevel::Soft,
            value: Some(serde_json::json!(1000)),
            unit: Some("usd".to_string()),
            condition: None,
        };
        let out = add_constraint(&doc, "g1", c).unwrap();
        assert_eq!(out.goals[0].constraints.len(), 1);

        let out2 = update_constraint(
            &out,
            "c1",
            ConstraintPatch {
                enforcement: Some(EnforcementLevel::Hard),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(out2.goals[0].constraints[0].enforcement, EnforcementLevel::Hard);
        // other fields untouched
        assert_eq!(out2.goals[0].constraints[0].unit.as_deref(), Some("usd"));
    }

    #[test]
    fn test_update_task_rejects_unknown_dependency() {
        let doc = sample_doc();
        let err = update_task(
            &doc,
            "t1",
            TaskPatch {
                depends_on: Some(vec!["t9".to_string()]),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidInput(_)));
    }

    #[test]
    fn test_add_form_and_delete() {
        let doc = sample_doc();
        let f = Form {
            id: "f1".to_string(),
            name: "Intake".to_string(),
            form_type: FormType::Structured,
            schema: None,
            agent: None,
            template: None,
            pre_filled: None,
            generation: None,
            initial_prompt: None,
            context_provided: None,
            distribution: None,
        };
        let out = add_form(&doc, "g2", f).unwrap();
        assert_eq!(out.goals[1].forms.len(), 1);
        let out2 = delete_form(&out, "f1").unwrap();
        assert!(out2.goals[1].forms.is_empty());
    }

    #[test]
    fn test_update_form_patches_generation_fields() {
        let doc = sample_doc();
        let f = Form {
            id: "f1".to_string(),
            name: "Intake".to_string(),
            form_type: FormType::Structured,
            schema: None,
            agent: None,
            template: None,
            pre_filled: None,
            generation: None,
            initial_prompt: None,
            context_provided: None,
            distribution: None,
        };
        let doc = add_form(&doc, "g2", f).unwrap();

        let out = update_form(
            &doc,
            "f1",
            FormPatch {
                pre_filled: Some(serde_json::json!({"customer": "acme"})),
                generation: Some(serde_json::json!({"mode": "draft"})),
                context_provided: Some(serde_json::json!(["order_history"])),
                ..Default::default()
            },
        )
        .unwrap();
        let form = &out.goals[1].forms[0];
        assert_eq!(form.pre_filled, Some(serde_json::json!({"customer": "acme"})));
        assert_eq!(form.generation, Some(serde_json::json!({"mode": "draft"})));
        assert_eq!(form.context_provided, Some(serde_json::json!(["order_history"])));
        // untouched fields stay untouched
        assert_eq!(form.name, "Intake");
        assert!(form.initial_prompt.is_none());
    }

    #[test]
    fn test_update_global_settings_shallow_merge() {
        let mut doc = sample_doc();
        let mut existing = serde_json::Map::new();
        existing.insert("retries".to_string(), serde_json::json!(3));
        existing.insert("region".to_string(), serde_json::json!("eu"));
        doc.global_settings = Some(existing);

        let mut patch = serde_json::Map::new();
        patch.insert("retries".to_string(), serde_json::json!(5));
        let out = update_global_settings(&doc, patch).unwrap();
        let settings = out.global_settings.as_ref().unwrap();
        assert_eq!(settings["retries"], serde_json::json!(5));
        assert_eq!(settings["region"], serde_json::json!("eu"));
    }

    #[test]
    fn test_operations_stamp_last_modified() {
        let doc = sample_doc();
        let before = doc.metadata.last_modified;
        let out = update_goal(
            &doc,
            "g1",
            GoalPatch {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(out.metadata.last_modified >= before);
        assert_eq!(out.goals[0].name, "Renamed");
        // id and placement untouched
        assert_eq!(out.goals[0].id, "g1");
        assert_eq!(out.goals[0].order, 1);
    }
}
