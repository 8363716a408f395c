//! Full-fidelity C# syntax tree.
//!
//! [`parse`] turns source text into an immutable [`Tree`] whose
//! [`Tree::serialize`] reproduces the input byte for byte. Edits build new
//! trees through [`Tree::replace_children`].

pub mod errors;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod tree;

pub use errors::{ParseError, TreeError};
pub use parser::{parse, parse_expression, parse_member, parse_parameter, parse_statement};
pub use tree::{
    Delim, Element, MemberKind, Node, NodeHandle, NodeKind, Token, TokenKind, Tree, Trivia,
    TriviaKind, TypeKind,
};
