//! Post-edit syntax regression check.
//!
//! The edited text is re-parsed with the tree-sitter C# grammar. The edit is
//! rejected when the result has more ERROR/MISSING nodes than the original:
//! pre-existing errors (preprocessor-heavy files, newer syntax the grammar
//! lags on) are tolerated, new ones are not.

use crate::ts::{CSharpParser, ParsedSource, TreeSitterError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("edit introduced syntax errors: {before} ERROR nodes before, {after} after{}", first_location(.errors))]
    ParseErrorIntroduced {
        before: usize,
        after: usize,
        errors: Vec<ErrorLocation>,
    },

    #[error("Tree-sitter error: {0}")]
    TreeSitter(#[from] TreeSitterError),
}

fn first_location(errors: &[ErrorLocation]) -> String {
    match errors.first() {
        Some(e) => format!(" (first at {}:{} near `{}`)", e.line, e.column, e.context),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

pub struct ParseValidator {
    parser: CSharpParser,
}

impl ParseValidator {
    pub fn new() -> Result<Self, TreeSitterError> {
        Ok(Self {
            parser: CSharpParser::new()?,
        })
    }

    /// Fails when `edited` has more syntax errors than `original`.
    pub fn validate_edit(&mut self, original: &str, edited: &str) -> Result<(), ValidationError> {
        check(&mut self.parser, original, edited)
    }
}

fn check(parser: &mut CSharpParser, original: &str, edited: &str) -> Result<(), ValidationError> {
    let before = parser.parse_with_source(original)?.error_count();
    let edited_parsed = parser.parse_with_source(edited)?;
    let errors = collect_errors(&edited_parsed);
    if errors.len() > before {
        return Err(ValidationError::ParseErrorIntroduced {
            before,
            after: errors.len(),
            errors,
        });
    }
    Ok(())
}

/// Same checks on the thread's pooled parser.
pub mod pooled {
    use super::*;
    use crate::pool;

    pub fn validate_edit(original: &str, edited: &str) -> Result<(), ValidationError> {
        pool::with_parser(|parser| check(parser, original, edited))?
    }
}

fn collect_errors(parsed: &ParsedSource<'_>) -> Vec<ErrorLocation> {
    let source = parsed.source;
    parsed
        .error_nodes()
        .into_iter()
        .map(|node| {
            let context_start = floor_char_boundary(source, node.byte_start.saturating_sub(20));
            let context_end = floor_char_boundary(source, (node.byte_end + 20).min(source.len()));
            ErrorLocation {
                byte_start: node.byte_start,
                byte_end: node.byte_end,
                line: node.start_point.row + 1,
                column: node.start_point.column + 1,
                context: source[context_start..context_end].replace(['\r', '\n'], " "),
            }
        })
        .collect()
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_introduces_error() {
        let mut validator = ParseValidator::new().unwrap();
        let original = "class Page { void M() { Run(); } }";
        let edited = "class Page { void M( { Run(); } }";
        let err = validator.validate_edit(original, edited).unwrap_err();
        assert!(matches!(err, ValidationError::ParseErrorIntroduced { before: 0, .. }));
    }

    #[test]
    fn test_existing_errors_are_tolerated() {
        let original = "class Page { void M( { } }\n";
        let edited = "class Page { void M( { } }\n// patched\n";
        assert!(pooled::validate_edit(original, edited).is_ok());
    }

    #[test]
    fn test_clean_edit_passes() {
        let original = "class Page { void M(string a) { } }";
        let edited = "class Page { void M(string a, bool isolatedContext = true) { } }";
        assert!(pooled::validate_edit(original, edited).is_ok());
    }
}
