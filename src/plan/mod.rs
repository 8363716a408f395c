//! Patch plans: an ordered list of named steps, loaded from TOML and run
//! fail-fast against a project root.

pub mod loader;
pub mod runner;
pub mod schema;

pub use loader::{builtin, load_from_path, load_from_str, ConfigError, BUILTIN_PLAN};
pub use runner::{
    FileChange, Mode, RunError, RunOutput, Runner, StepError, StepOutcome, StepReport,
};
pub use schema::{Metadata, Operation, PatchPlan, Step, ValidationError, ValidationIssue};
