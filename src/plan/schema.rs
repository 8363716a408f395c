use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

use crate::patch::{
    AddMembers, AddParameter, AppendStatement, DisablePackageValidation, InjectStatement,
    InsertEntry, ReplaceBody, Retarget, SetXmlElements,
};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchPlan {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One named edit against one file, relative to the project root.
#[derive(Debug, Deserialize, Clone)]
pub struct Step {
    pub id: String,
    /// Target file. For `disable-package-validation` this is the directory
    /// searched for project manifests.
    pub file: String,
    pub operation: Operation,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    AddParameter(AddParameter),
    InjectStatement(InjectStatement),
    ReplaceBody(ReplaceBody),
    AppendStatement(AppendStatement),
    AddMembers(AddMembers),
    InsertEntry(InsertEntry),
    RetargetText(Retarget),
    SetXmlElements(SetXmlElements),
    DisablePackageValidation(DisablePackageValidation),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AddParameter(_) => "add-parameter",
            Operation::InjectStatement(_) => "inject-statement",
            Operation::ReplaceBody(_) => "replace-body",
            Operation::AppendStatement(_) => "append-statement",
            Operation::AddMembers(_) => "add-members",
            Operation::InsertEntry(_) => "insert-entry",
            Operation::RetargetText(_) => "retarget-text",
            Operation::SetXmlElements(_) => "set-xml-elements",
            Operation::DisablePackageValidation(_) => "disable-package-validation",
        }
    }

    /// Type the operation edits, for C# operations.
    pub fn target(&self) -> Option<&str> {
        match self {
            Operation::AddParameter(op) => Some(&op.target),
            Operation::InjectStatement(op) => Some(&op.target),
            Operation::ReplaceBody(op) => Some(&op.target),
            Operation::AppendStatement(op) => Some(&op.target),
            Operation::AddMembers(op) => Some(&op.target),
            Operation::InsertEntry(op) => Some(&op.target),
            Operation::RetargetText(_)
            | Operation::SetXmlElements(_)
            | Operation::DisablePackageValidation(_) => None,
        }
    }

    fn check(&self, id: &str, issues: &mut Vec<ValidationIssue>) {
        let mut missing = |field: &'static str| {
            issues.push(ValidationIssue::MissingField {
                step_id: Some(id.to_string()),
                field,
            })
        };
        if self.target().is_some_and(|t| t.trim().is_empty()) {
            missing("operation.target");
        }
        match self {
            Operation::AddParameter(op) => {
                if op.methods.is_empty() {
                    missing("operation.methods");
                }
                if op.name.trim().is_empty() {
                    missing("operation.name");
                }
                if op.param_type.trim().is_empty() {
                    missing("operation.param-type");
                }
            }
            Operation::InjectStatement(op) => {
                if op.method.trim().is_empty() {
                    missing("operation.method");
                }
                if op.statement.trim().is_empty() {
                    missing("operation.statement");
                }
            }
            Operation::ReplaceBody(op) => {
                if op.method.trim().is_empty() {
                    missing("operation.method");
                }
                if op.statement.trim().is_empty() {
                    missing("operation.statement");
                }
            }
            Operation::AppendStatement(op) => {
                if op.statement.trim().is_empty() {
                    missing("operation.statement");
                }
            }
            Operation::AddMembers(op) => {
                if op.members.iter().all(|m| m.trim().is_empty()) {
                    missing("operation.members");
                }
            }
            Operation::InsertEntry(op) => {
                if op.methods.is_empty() {
                    missing("operation.methods");
                }
                if op.creation.trim().is_empty() {
                    missing("operation.creation");
                }
                if op.key.trim().is_empty() {
                    missing("operation.key");
                }
            }
            Operation::RetargetText(op) => {
                if op.replacements.is_empty() {
                    missing("operation.replacements");
                }
                if op.replacements.iter().any(|r| r.from.is_empty()) {
                    missing("operation.replacements.from");
                }
            }
            Operation::SetXmlElements(op) => {
                if op.values.is_empty() {
                    missing("operation.values");
                }
            }
            Operation::DisablePackageValidation(_) => {}
        }
    }
}

impl PatchPlan {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.steps.is_empty() {
            issues.push(ValidationIssue::EmptyPlan);
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    step_id: None,
                    field: "id",
                });
            } else if !seen.insert(step.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(step.id.clone()));
            }
            if step.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    step_id: Some(step.id.clone()),
                    field: "file",
                });
            }
            if let Operation::RetargetText(Retarget {
                output: Some(output),
                ..
            }) = &step.operation
            {
                if output == &step.file {
                    issues.push(ValidationIssue::InvalidCombo {
                        step_id: Some(step.id.clone()),
                        message: "output must differ from file".to_string(),
                    });
                }
            }
            step.operation.check(&step.id, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyPlan,
    DuplicateId(String),
    MissingField {
        step_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        step_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPlan => write!(f, "patch plan contains no steps"),
            ValidationIssue::DuplicateId(id) => write!(f, "step id '{id}' is used more than once"),
            ValidationIssue::MissingField { step_id, field } => match step_id {
                Some(id) => write!(f, "step '{id}' missing required field '{field}'"),
                None => write!(f, "step missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { step_id, message } => match step_id {
                Some(id) => write!(f, "step '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid plan configuration: {message}"),
            },
        }
    }
}
