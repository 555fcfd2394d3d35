//! Schema validation for workflow template documents
//!
//! The validator is a pure function over a candidate JSON value. It never
//! fails; structural problems come back as errors (which block acceptance)
//! and advisory findings come back as warnings. Every issue carries a path
//! into the document (`goals[0].tasks[1].assignee.type`) and a stable code.

use crate::types::{
    AssigneeType, ConstraintType, EnforcementLevel, FormType, TriggerType, WorkflowDocument,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Stable machine-readable issue codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MissingRequiredField,
    InvalidType,
    InvalidEnumValue,
    InvalidValue,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            IssueCode::InvalidType => "INVALID_TYPE",
            IssueCode::InvalidEnumValue => "INVALID_ENUM_VALUE",
            IssueCode::InvalidValue => "INVALID_VALUE",
        };
        write!(f, "{}", s)
    }
}

/// A single validation finding with its location in the document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub code: IssueCode,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code,
            message: message.into(),
        }
    }
}

/// Outcome of validating a candidate document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn error(&mut self, path: impl Into<String>, code: IssueCode, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(path, code, message));
    }

    fn warn(&mut self, path: impl Into<String>, code: IssueCode, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(path, code, message));
    }
}

/// Validate a typed document by serializing it back to JSON first.
pub fn validate_document(doc: &WorkflowDocument) -> ValidationReport {
    match serde_json::to_value(doc) {
        Ok(value) => validate_value(&value),
        Err(e) => {
            // Unreachable for well-formed typed documents, but the validator
            // contract is that it never panics or returns Err.
            let mut report = ValidationReport::default();
            report.error("", IssueCode::InvalidType, format!("unserializable document: {}", e));
            report
        }
    }
}

/// Validate a raw candidate value against the workflow document schema.
pub fn validate_value(candidate: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let root = match candidate.as_object() {
        Some(obj) => obj,
        None => {
            report.error("", IssueCode::InvalidType, "document must be a JSON object");
            report.is_valid = false;
            return report;
        }
    };

    for field in ["id", "name", "version"] {
        require_string(root, field, field, &mut report);
    }
    match root.get("objective") {
        None => report.warn(
            "objective",
            IssueCode::MissingRequiredField,
            "workflow has no objective",
        ),
        Some(v) if !v.is_string() => {
            report.error("objective", IssueCode::InvalidType, "objective must be a string")
        }
        _ => {}
    }

    validate_metadata(root.get("metadata"), &mut report);

    if let Some(settings) = root.get("global_settings") {
        if !settings.is_object() {
            report.error(
                "global_settings",
                IssueCode::InvalidType,
                "global_settings must be an object",
            );
        }
    }

    validate_triggers(root.get("triggers"), &mut report);

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut task_ids: HashSet<String> = HashSet::new();
    let mut dependency_refs: Vec<(String, String)> = Vec::new();

    match root.get("goals") {
        None => report.warn("goals", IssueCode::MissingRequiredField, "workflow has no goals"),
        Some(Value::Array(goals)) => {
            if goals.is_empty() {
                report.warn("goals", IssueCode::InvalidValue, "workflow has no goals");
            }
            for (gi, goal) in goals.iter().enumerate() {
                validate_goal(
                    goal,
                    gi,
                    &mut seen_ids,
                    &mut task_ids,
                    &mut dependency_refs,
                    &mut report,
                );
            }
        }
        Some(_) => report.error("goals", IssueCode::InvalidType, "goals must be an array"),
    }

    // depends_on entries must resolve to a task somewhere in the document
    for (path, target) in dependency_refs {
        if !task_ids.contains(&target) {
            report.error(
                path,
                IssueCode::InvalidValue,
                format!("depends_on references unknown task '{}'", target),
            );
        }
    }

    report.is_valid = report.errors.is_empty();
    report
}

fn validate_goal(
    goal: &Value,
    gi: usize,
    seen_ids: &mut HashSet<String>,
    task_ids: &mut HashSet<String>,
    dependency_refs: &mut Vec<(String, String)>,
    report: &mut ValidationReport,
) {
    let path = format!("goals[{}]", gi);
    let obj = match goal.as_object() {
        Some(obj) => obj,
        None => {
            report.error(path, IssueCode::InvalidType, "goal must be an object");
            return;
        }
    };

    for field in ["id", "name", "description"] {
        require_string(obj, field, &format!("{}.{}", path, field), report);
    }
    check_unique_id(obj, &path, seen_ids, report);

    match obj.get("order") {
        None => report.error(
            format!("{}.order", path),
            IssueCode::MissingRequiredField,
            "goal is missing an order",
        ),
        Some(v) => match v.as_u64() {
            None => report.error(
                format!("{}.order", path),
                IssueCode::InvalidType,
                "order must be a non-negative integer",
            ),
            Some(0) => report.warn(
                format!("{}.order", path),
                IssueCode::InvalidValue,
                "order 0 is implausible; orders are 1-based",
            ),
            Some(n) if n != (gi as u64) + 1 => report.warn(
                format!("{}.order", path),
                IssueCode::InvalidValue,
                format!("order {} does not match position {}", n, gi + 1),
            ),
            Some(_) => {}
        },
    }

    for (ci, constraint) in iter_list(obj, "constraints", &path, report).iter().enumerate() {
        validate_constraint(constraint, &format!("{}.constraints[{}]", path, ci), seen_ids, report);
    }
    for (pi, policy) in iter_list(obj, "policies", &path, report).iter().enumerate() {
        validate_policy(policy, &format!("{}.policies[{}]", path, pi), seen_ids, report);
    }
    for (ti, task) in iter_list(obj, "tasks", &path, report).iter().enumerate() {
        validate_task(
            task,
            &format!("{}.tasks[{}]", path, ti),
            seen_ids,
            task_ids,
            dependency_refs,
            report,
        );
    }
    for (fi, form) in iter_list(obj, "forms", &path, report).iter().enumerate() {
        validate_form(form, &format!("{}.forms[{}]", path, fi), seen_ids, report);
    }
}

fn validate_constraint(
    constraint: &Value,
    path: &str,
    seen_ids: &mut HashSet<String>,
    report: &mut ValidationReport,
) {
    let obj = match constraint.as_object() {
        Some(obj) => obj,
        None => {
            report.error(path, IssueCode::InvalidType, "constraint must be an object");
            return;
        }
    };
    require_string(obj, "id", &format!("{}.id", path), report);
    require_string(obj, "description", &format!("{}.description", path), report);
    check_unique_id(obj, path, seen_ids, report);
    check_enum::<ConstraintType>(obj, "type", path, "constraint type", report);
    check_enum::<EnforcementLevel>(obj, "enforcement", path, "enforcement level", report);
}

fn validate_policy(
    policy: &Value,
    path: &str,
    seen_ids: &mut HashSet<String>,
    report: &mut ValidationReport,
) {
    let obj = match policy.as_object() {
        Some(obj) => obj,
        None => {
            report.error(path, IssueCode::InvalidType, "policy must be an object");
            return;
        }
    };
    require_string(obj, "id", &format!("{}.id", path), report);
    require_string(obj, "name", &format!("{}.name", path), report);
    check_unique_id(obj, path, seen_ids, report);

    match obj.get("if") {
        None => report.error(
            format!("{}.if", path),
            IssueCode::MissingRequiredField,
            "policy is missing its if-condition",
        ),
        Some(cond) => validate_condition(cond, &format!("{}.if", path), report),
    }

    match obj.get("then") {
        None => report.error(
            format!("{}.then", path),
            IssueCode::MissingRequiredField,
            "policy is missing its then-action",
        ),
        Some(then) => match then.as_object() {
            None => report.error(
                format!("{}.then", path),
                IssueCode::InvalidType,
                "then must be an object",
            ),
            Some(then_obj) => {
                require_string(then_obj, "action", &format!("{}.then.action", path), report)
            }
        },
    }
}

fn validate_condition(cond: &Value, path: &str, report: &mut ValidationReport) {
    let obj = match cond.as_object() {
        Some(obj) => obj,
        None => {
            report.error(path, IssueCode::InvalidType, "condition must be an object");
            return;
        }
    };

    if let Some(branches) = obj.get("all_of").or_else(|| obj.get("any_of")) {
        let key = if obj.contains_key("all_of") { "all_of" } else { "any_of" };
        match branches.as_array() {
            None => report.error(
                format!("{}.{}", path, key),
                IssueCode::InvalidType,
                format!("{} must be an array", key),
            ),
            Some(list) => {
                for (i, branch) in list.iter().enumerate() {
                    validate_condition(branch, &format!("{}.{}[{}]", path, key, i), report);
                }
            }
        }
        return;
    }

    if obj.contains_key("condition") {
        if !obj["condition"].is_string() {
            report.error(
                format!("{}.condition", path),
                IssueCode::InvalidType,
                "condition must be a string",
            );
        }
        return;
    }

    // Otherwise it must be a field comparison
    for field in ["field", "operator"] {
        require_string(obj, field, &format!("{}.{}", path, field), report);
    }
    if !obj.contains_key("value") {
        report.error(
            format!("{}.value", path),
            IssueCode::MissingRequiredField,
            "comparison condition requires a value",
        );
    }
}

fn validate_task(
    task: &Value,
    path: &str,
    seen_ids: &mut HashSet<String>,
    task_ids: &mut HashSet<String>,
    dependency_refs: &mut Vec<(String, String)>,
    report: &mut ValidationReport,
) {
    let obj = match task.as_object() {
        Some(obj) => obj,
        None => {
            report.error(path, IssueCode::InvalidType, "task must be an object");
            return;
        }
    };
    require_string(obj, "id", &format!("{}.id", path), report);
    require_string(obj, "description", &format!("{}.description", path), report);
    check_unique_id(obj, path, seen_ids, report);
    if let Some(id) = obj.get("id").and_then(|v| v.as_str()) {
        task_ids.insert(id.to_string());
    }

    match obj.get("assignee") {
        None => report.error(
            format!("{}.assignee", path),
            IssueCode::MissingRequiredField,
            "task is missing an assignee",
        ),
        Some(assignee) => match assignee.as_object() {
            None => report.error(
                format!("{}.assignee", path),
                IssueCode::InvalidType,
                "assignee must be an object",
            ),
            Some(a) => {
                check_enum::<AssigneeType>(a, "type", &format!("{}.assignee", path), "assignee type", report)
            }
        },
    }

    if let Some(timeout) = obj.get("timeout_minutes") {
        match timeout.as_i64() {
            None => report.error(
                format!("{}.timeout_minutes", path),
                IssueCode::InvalidType,
                "timeout_minutes must be an integer",
            ),
            Some(n) if n <= 0 => report.warn(
                format!("{}.timeout_minutes", path),
                IssueCode::InvalidValue,
                format!("timeout of {} minutes is implausible", n),
            ),
            Some(_) => {}
        }
    }

    if let Some(sla) = obj.get("sla_minutes").and_then(|v| v.as_i64()) {
        if sla < 0 {
            report.warn(
                format!("{}.sla_minutes", path),
                IssueCode::InvalidValue,
                format!("negative SLA of {} minutes", sla),
            );
        }
    }

    if let Some(deps) = obj.get("depends_on") {
        match deps.as_array() {
            None => report.error(
                format!("{}.depends_on", path),
                IssueCode::InvalidType,
                "depends_on must be an array",
            ),
            Some(list) => {
                for (i, dep) in list.iter().enumerate() {
                    match dep.as_str() {
                        None => report.error(
                            format!("{}.depends_on[{}]", path, i),
                            IssueCode::InvalidType,
                            "dependency must be a task id string",
                        ),
                        Some(target) => dependency_refs
                            .push((format!("{}.depends_on[{}]", path, i), target.to_string())),
                    }
                }
            }
        }
    }
}

fn validate_form(
    form: &Value,
    path: &str,
    seen_ids: &mut HashSet<String>,
    report: &mut ValidationReport,
) {
    let obj = match form.as_object() {
        Some(obj) => obj,
        None => {
            report.error(path, IssueCode::InvalidType, "form must be an object");
            return;
        }
    };
    require_string(obj, "id", &format!("{}.id", path), report);
    require_string(obj, "name", &format!("{}.name", path), report);
    check_unique_id(obj, path, seen_ids, report);
    check_enum::<FormType>(obj, "type", path, "form type", report);

    if let Some(schema) = obj.get("schema") {
        match schema.as_object() {
            None => report.error(
                format!("{}.schema", path),
                IssueCode::InvalidType,
                "schema must be an object",
            ),
            Some(s) => {
                if let Some(sections) = s.get("sections") {
                    match sections.as_array() {
                        None => report.error(
                            format!("{}.schema.sections", path),
                            IssueCode::InvalidType,
                            "sections must be an array",
                        ),
                        Some(list) => {
                            for (i, section) in list.iter().enumerate() {
                                if !section.is_object() {
                                    report.error(
                                        format!("{}.schema.sections[{}]", path, i),
                                        IssueCode::InvalidType,
                                        "section must be an object",
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn validate_metadata(metadata: Option<&Value>, report: &mut ValidationReport) {
    match metadata {
        None => report.error(
            "metadata",
            IssueCode::MissingRequiredField,
            "document is missing metadata",
        ),
        Some(meta) => match meta.as_object() {
            None => report.error("metadata", IssueCode::InvalidType, "metadata must be an object"),
            Some(obj) => {
                require_string(obj, "author", "metadata.author", report);
                for field in ["created_at", "last_modified"] {
                    if let Some(v) = obj.get(field) {
                        if !v.is_string() {
                            report.error(
                                format!("metadata.{}", field),
                                IssueCode::InvalidType,
                                format!("{} must be a timestamp string", field),
                            );
                        }
                    }
                }
                if let Some(tags) = obj.get("tags") {
                    if !tags.is_array() {
                        report.error(
                            "metadata.tags",
                            IssueCode::InvalidType,
                            "tags must be an array",
                        );
                    }
                }
            }
        },
    }
}

fn validate_triggers(triggers: Option<&Value>, report: &mut ValidationReport) {
    let Some(triggers) = triggers else { return };
    match triggers.as_array() {
        None => report.error("triggers", IssueCode::InvalidType, "triggers must be an array"),
        Some(list) => {
            for (i, trigger) in list.iter().enumerate() {
                let path = format!("triggers[{}]", i);
                match trigger.as_object() {
                    None => report.error(path, IssueCode::InvalidType, "trigger must be an object"),
                    Some(obj) => {
                        check_enum::<TriggerType>(obj, "type", &path, "trigger type", report)
                    }
                }
            }
        }
    }
}

fn require_string(
    obj: &serde_json::Map<String, Value>,
    field: &str,
    path: &str,
    report: &mut ValidationReport,
) {
    match obj.get(field) {
        None | Some(Value::Null) => report.error(
            path,
            IssueCode::MissingRequiredField,
            format!("missing required field '{}'", field),
        ),
        Some(v) if !v.is_string() => {
            report.error(path, IssueCode::InvalidType, format!("'{}' must be a string", field))
        }
        _ => {}
    }
}

fn check_unique_id(
    obj: &serde_json::Map<String, Value>,
    path: &str,
    seen_ids: &mut HashSet<String>,
    report: &mut ValidationReport,
) {
    if let Some(id) = obj.get("id").and_then(|v| v.as_str()) {
        if !seen_ids.insert(id.to_string()) {
            report.error(
                format!("{}.id", path),
                IssueCode::InvalidValue,
                format!("duplicate id '{}'", id),
            );
        }
    }
}

fn check_enum<T: serde::de::DeserializeOwned>(
    obj: &serde_json::Map<String, Value>,
    field: &str,
    path: &str,
    what: &str,
    report: &mut ValidationReport,
) {
    match obj.get(field) {
        None | Some(Value::Null) => report.error(
            format!("{}.{}", path, field),
            IssueCode::MissingRequiredField,
            format!("missing required field '{}'", field),
        ),
        Some(v) => {
            if serde_json::from_value::<T>(v.clone()).is_err() {
                report.error(
                    format!("{}.{}", path, field),
                    IssueCode::InvalidEnumValue,
                    format!("'{}' is not a valid {}", v, what),
                );
            }
        }
    }
}

fn iter_list(
    obj: &serde_json::Map<String, Value>,
    field: &str,
    path: &str,
    report: &mut ValidationReport,
) -> Vec<Value> {
    match obj.get(field) {
        None => Vec::new(),
        Some(Value::Array(list)) => list.clone(),
        Some(_) => {
            report.error(
                format!("{}.{}", path, field),
                IssueCode::InvalidType,
                format!("{} must be an array", field),
            );
            Vec::new()
        }
    }
}
