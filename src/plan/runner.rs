//! Runs a plan's steps in order against a project root.
//!
//! Each step reads the current file, decides from its contents whether the
//! edit is already there, and otherwise edits, validates and writes it. The
//! first failure stops the run; files written by earlier steps stay written.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cst::{self, ParseError};
use crate::edit::{self, Edit, EditError, EditResult};
use crate::patch::{PatchError, Retarget, StructuralPatch, TextPatch};
use crate::plan::schema::{Operation, PatchPlan, Step};
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::validate::{self, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Write edits to disk.
    Apply,
    /// Keep edits in memory; disk is never touched.
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    AlreadyApplied,
}

/// Text of one file before and after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    /// Empty when the step created the file
    pub before: String,
    pub after: String,
    /// What the disk write did; `None` in check mode.
    pub written: Option<EditResult>,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: String,
    pub file: String,
    pub operation: &'static str,
    pub outcome: StepOutcome,
    pub changes: Vec<FileChange>,
}

#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("step '{step}' failed on {file}: {source}")]
    Step {
        step: String,
        file: String,
        #[source]
        source: StepError,
    },
}

/// Reports of the steps that completed, and the error that stopped the
/// run, if any.
#[derive(Debug)]
pub struct RunOutput {
    pub reports: Vec<StepReport>,
    pub failure: Option<RunError>,
}

impl RunOutput {
    pub fn all_applied(&self) -> bool {
        self.failure.is_none()
            && self
                .reports
                .iter()
                .all(|r| r.outcome == StepOutcome::AlreadyApplied)
    }

    pub fn into_result(self) -> Result<Vec<StepReport>, RunError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.reports),
        }
    }
}

pub struct Runner {
    guard: WorkspaceGuard,
    mode: Mode,
    /// Check-mode file contents, keyed by canonical path
    overlay: HashMap<PathBuf, String>,
}

impl Runner {
    pub fn new(root: impl AsRef<Path>, mode: Mode) -> Result<Self, SafetyError> {
        Ok(Self {
            guard: WorkspaceGuard::new(root)?,
            mode,
            overlay: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        self.guard.workspace_root()
    }

    pub fn run(&mut self, plan: &PatchPlan) -> RunOutput {
        let mut reports = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            match self.run_step(step) {
                Ok(report) => reports.push(report),
                Err(source) => {
                    return RunOutput {
                        reports,
                        failure: Some(RunError::Step {
                            step: step.id.clone(),
                            file: step.file.clone(),
                            source,
                        }),
                    }
                }
            }
        }
        RunOutput {
            reports,
            failure: None,
        }
    }

    fn run_step(&mut self, step: &Step) -> Result<StepReport, StepError> {
        debug!(step = %step.id, file = %step.file, operation = step.operation.name(), "running step");
        let changes = match &step.operation {
            Operation::AddParameter(op) => self.structural(step, op)?,
            Operation::InjectStatement(op) => self.structural(step, op)?,
            Operation::ReplaceBody(op) => self.structural(step, op)?,
            Operation::AppendStatement(op) => self.structural(step, op)?,
            Operation::AddMembers(op) => self.structural(step, op)?,
            Operation::InsertEntry(op) => self.structural(step, op)?,
            Operation::RetargetText(op) => self.retarget(step, op)?,
            Operation::SetXmlElements(op) => self.text(step, op)?,
            Operation::DisablePackageValidation(op) => {
                let dir = self.guard.validate_path(&step.file)?;
                let mut changes = Vec::new();
                for manifest in op.manifests(&dir)? {
                    let path = self.guard.validate_path(&manifest)?;
                    changes.extend(self.text_file(&path, op)?);
                }
                changes
            }
        };

        let outcome = if changes.is_empty() {
            debug!(step = %step.id, "already applied");
            StepOutcome::AlreadyApplied
        } else {
            info!(step = %step.id, files = changes.len(), "applied");
            StepOutcome::Applied
        };
        Ok(StepReport {
            step: step.id.clone(),
            file: step.file.clone(),
            operation: step.operation.name(),
            outcome,
            changes,
        })
    }

    fn read(&self, path: &Path) -> Result<String, StepError> {
        if let Some(text) = self.overlay.get(path) {
            return Ok(text.clone());
        }
        fs::read_to_string(path).map_err(|source| StepError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write(&mut self, path: &Path, before: &str, after: &str) -> Result<FileChange, StepError> {
        let written = match self.mode {
            Mode::Check => {
                self.overlay.insert(path.to_path_buf(), after.to_string());
                None
            }
            Mode::Apply => match Edit::between(path, before, after) {
                Some(edit) => Some(logged(edit.apply()?)),
                None => None,
            },
        };
        Ok(FileChange {
            path: path.to_path_buf(),
            before: before.to_string(),
            after: after.to_string(),
            written,
        })
    }

    fn structural(
        &mut self,
        step: &Step,
        patch: &dyn StructuralPatch,
    ) -> Result<Vec<FileChange>, StepError> {
        let path = self.guard.validate_path(&step.file)?;
        let content = self.read(&path)?;
        let tree = cst::parse(&content)?;
        if patch.is_applied(&tree)? {
            return Ok(Vec::new());
        }
        let edited = patch.apply(&tree)?.serialize();
        if edited == content {
            warn!(step = %step.id, file = %step.file, "step made no changes");
            return Ok(Vec::new());
        }
        validate::pooled::validate_edit(&content, &edited)?;
        Ok(vec![self.write(&path, &content, &edited)?])
    }

    fn text(&mut self, step: &Step, patch: &dyn TextPatch) -> Result<Vec<FileChange>, StepError> {
        let path = self.guard.validate_path(&step.file)?;
        self.text_file(&path, patch)
    }

    fn text_file(&mut self, path: &Path, patch: &dyn TextPatch) -> Result<Vec<FileChange>, StepError> {
        let content = self.read(path)?;
        if patch.is_applied(&content)? {
            return Ok(Vec::new());
        }
        let edited = patch.apply(&content)?;
        if edited == content {
            return Ok(Vec::new());
        }
        Ok(vec![self.write(path, &content, &edited)?])
    }

    /// With an output path, the retargeted text goes to a new file and the
    /// source is left alone.
    fn retarget(&mut self, step: &Step, patch: &Retarget) -> Result<Vec<FileChange>, StepError> {
        let Some(output) = patch.output.as_deref() else {
            return self.text(step, patch);
        };
        let output = self.guard.validate_new_path(output)?;
        let existing = match self.read(&output) {
            Ok(text) => Some(text),
            Err(StepError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };
        if let Some(existing) = &existing {
            if patch.is_applied(existing)? {
                return Ok(Vec::new());
            }
        }

        let source = self.guard.validate_path(&step.file)?;
        let content = self.read(&source)?;
        let renamed = patch.apply(&content)?;
        let written = match self.mode {
            Mode::Check => {
                self.overlay.insert(output.clone(), renamed.clone());
                None
            }
            Mode::Apply => Some(logged(edit::write_new(&output, &renamed)?)),
        };
        Ok(vec![FileChange {
            path: output,
            before: existing.unwrap_or_default(),
            after: renamed,
            written,
        }])
    }
}

fn logged(result: EditResult) -> EditResult {
    match &result {
        EditResult::Applied {
            file,
            bytes_changed,
        } => debug!(file = %file.display(), bytes_changed, "edit written"),
        EditResult::AlreadyApplied { file } => {
            warn!(file = %file.display(), "file already held the edited text")
        }
    }
    result
}
