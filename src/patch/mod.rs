//! Structural edit primitives.
//!
//! Every primitive takes a tree, locates its target by name and returns a
//! new tree. Nothing is written here; the plan runner serializes, validates
//! and writes the result.

pub mod collection;
pub mod lists;
pub mod member;
pub mod parameter;
pub mod statement;
pub mod text;

use thiserror::Error;

use crate::cst::{ParseError, Tree, TreeError};
use crate::locator::LocateError;

pub use collection::InsertEntry;
pub use member::AddMembers;
pub use parameter::AddParameter;
pub use statement::{AppendStatement, InjectStatement, ReplaceBody};
pub use text::{DisablePackageValidation, Replacement, Retarget, SetXmlElements, TextPatch, XmlValue};

#[derive(Error, Debug)]
pub enum PatchError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("invalid code fragment: {0}")]
    Fragment(#[from] ParseError),

    #[error("{0}")]
    Unsupported(String),

    #[error("text not found: {0}")]
    TextNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TreeError> for PatchError {
    fn from(err: TreeError) -> Self {
        PatchError::Locate(err.into())
    }
}

/// A tree-to-tree edit with its own idempotency marker.
pub trait StructuralPatch {
    /// Whether the edit is already present in `tree`.
    fn is_applied(&self, tree: &Tree) -> Result<bool, PatchError>;

    /// Produce the edited tree. Only called when [`is_applied`] is false.
    ///
    /// [`is_applied`]: StructuralPatch::is_applied
    fn apply(&self, tree: &Tree) -> Result<Tree, PatchError>;
}

pub(crate) fn default_send_method() -> String {
    "SendMessageToServerAsync".to_string()
}
