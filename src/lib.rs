//! CS Patcher: structural patching of C# source trees
//!
//! Applies an ordered plan of named edits (add a parameter to every overload,
//! inject a leading statement, append members, insert an initializer entry)
//! to a .NET project. Every byte outside the edited regions is preserved.
//!
//! # Architecture
//!
//! - [`cst`] parses C# into a lossless tree; serializing it reproduces the
//!   input exactly.
//! - [`locator`] finds types, members, invocations and object creations by
//!   name and returns handles into one tree snapshot.
//! - [`patch`] builds new trees from old ones, copying neighbouring trivia
//!   so edits match the file's layout ([`format`]).
//! - [`guard`] decides from the current file whether an edit is present.
//! - [`plan`] runs the steps fail-fast. Writes are byte-span [`Edit`]s,
//!   checked with tree-sitter first.
//!
//! # Example
//!
//! ```no_run
//! use cs_patcher::plan::{builtin, Mode, Runner};
//!
//! let plan = builtin()?;
//! let mut runner = Runner::new("playwright-dotnet", Mode::Apply)?;
//! let reports = runner.run(&plan).into_result()?;
//! println!("{} steps", reports.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cst;
pub mod edit;
pub mod format;
pub mod guard;
pub mod locator;
pub mod patch;
pub mod plan;
pub mod pool;
pub mod safety;
pub mod ts;
pub mod validate;

// Re-exports
pub use cst::{parse, ParseError, Tree};
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use format::{FormattingStyle, LineEnding};
pub use locator::LocateError;
pub use patch::{PatchError, StructuralPatch, TextPatch};
pub use plan::{
    builtin, load_from_path, load_from_str, ConfigError, Mode, PatchPlan, RunError, RunOutput,
    Runner, StepOutcome, StepReport,
};
pub use safety::{SafetyError, WorkspaceGuard};
pub use ts::TreeSitterError;
pub use validate::{ParseValidator, ValidationError};
