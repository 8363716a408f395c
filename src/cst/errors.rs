use thiserror::Error;

/// Input text is not syntactically valid. Fatal for the file being parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character {ch:?} at {line}:{column}")]
    UnexpectedChar { ch: char, line: usize, column: usize },

    #[error("unterminated {what} starting at {line}:{column}")]
    Unterminated {
        what: &'static str,
        line: usize,
        column: usize,
    },

    #[error("unmatched '{found}' at {line}:{column}")]
    UnmatchedClose {
        found: String,
        line: usize,
        column: usize,
    },

    #[error("'{open}' opened at {line}:{column} is never closed")]
    UnclosedDelimiter {
        open: String,
        line: usize,
        column: usize,
    },

    #[error("mismatched delimiter: '{open}' at {open_line}:{open_column} closed by '{close}' at {line}:{column}")]
    MismatchedDelimiter {
        open: String,
        close: String,
        open_line: usize,
        open_column: usize,
        line: usize,
        column: usize,
    },

    #[error("expected a single {expected} in fragment, found {found}")]
    Fragment { expected: &'static str, found: usize },
}

/// Failure to resolve a handle against a tree snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("handle from snapshot {handle} used against snapshot {tree}")]
    StaleHandle { handle: u64, tree: u64 },

    #[error("handle path {path:?} does not address a node")]
    InvalidPath { path: Vec<usize> },
}

/// 1-based line and column of a byte offset.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(pos) => before[pos + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
