//! Tree-sitter C# grammar, used only to confirm an edit did not introduce
//! syntax errors. Locating and editing go through [`crate::cst`].

pub mod errors;
pub mod parser;

pub use errors::TreeSitterError;
pub use parser::{CSharpParser, ErrorNode, ParsedSource};
