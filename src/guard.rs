//! Idempotency markers.
//!
//! Each primitive has a marker recomputed from the current file contents;
//! when the marker holds the step reports `AlreadyApplied` and touches
//! nothing. No state is kept between runs.

use tracing::debug;

use crate::cst::{Delim, Element, Node, NodeHandle, NodeKind, Tree};
use crate::locator::{find_member, find_methods, has_parameter, LocateError};
use crate::patch::lists;

/// Every overload of every listed method already takes `parameter`.
pub fn parameter_on_every_overload(
    tree: &Tree,
    ty: &NodeHandle,
    methods: &[String],
    parameter: &str,
) -> Result<bool, LocateError> {
    for method in methods {
        for handle in find_methods(tree, ty, method)? {
            if !has_parameter(tree.resolve(&handle)?, parameter) {
                debug!(method = %method, parameter, "overload lacks parameter");
                return Ok(false);
            }
        }
    }
    Ok(true)
}

pub fn member_present(tree: &Tree, ty: &NodeHandle, name: &str) -> Result<bool, LocateError> {
    Ok(find_member(tree, ty, name, None)?.is_some())
}

/// Statement nodes of a block body.
pub fn statements(block: &Node) -> Vec<&Node> {
    block
        .children()
        .iter()
        .filter_map(Element::as_node)
        .filter(|n| n.kind() == NodeKind::Statement)
        .collect()
}

/// How an injected leading statement is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementMarker {
    /// The first statement mentions this identifier.
    Identifier(String),
    /// The first statement equals this code, layout ignored.
    Code(String),
}

impl StatementMarker {
    pub fn matches(&self, statement: &Node) -> bool {
        match self {
            StatementMarker::Identifier(name) => statement.contains_identifier(name),
            StatementMarker::Code(code) => statement.normalized_text() == *code,
        }
    }
}

pub fn leading_statement_present(block: &Node, marker: &StatementMarker) -> bool {
    statements(block)
        .first()
        .is_some_and(|s| marker.matches(s))
}

/// The body consists of exactly `normalized`.
pub fn body_is(block: &Node, normalized: &str) -> bool {
    let stmts = statements(block);
    stmts.len() == 1 && stmts[0].normalized_text() == normalized
}

pub fn contains_statement(block: &Node, normalized: &str) -> bool {
    statements(block)
        .iter()
        .any(|s| s.normalized_text() == normalized)
}

/// Key of one initializer entry: `["k"] = v`, `{ "k", v }` or `K = v`.
pub fn entry_key(entry: &[Element]) -> Option<String> {
    match entry {
        [index, eq, ..] if eq.is_punct("=") && index.is_group(Delim::Bracket) => {
            let inner = index.as_node()?.children();
            match inner {
                [_, key, _] => key.as_token()?.simple_string_value().map(str::to_string),
                _ => None,
            }
        }
        [name, eq, ..] if eq.is_punct("=") => name.identifier_name().map(str::to_string),
        [pair] if pair.is_group(Delim::Brace) => {
            let first = *lists::items(pair.as_node()?).first()?;
            match first {
                [key] => key.as_token()?.simple_string_value().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }
}

pub fn initializer_has_key(initializer: &Node, key: &str) -> bool {
    lists::items(initializer)
        .into_iter()
        .any(|entry| entry_key(entry).as_deref() == Some(key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextState {
    /// Replacement present and search text gone.
    Applied,
    /// Search text present.
    Pending,
    /// Neither present: the file diverged from what the step expects.
    Missing,
}

/// Occurrences of `from` are only pending when they are not part of an
/// occurrence of `to`, so a replacement that extends its search text settles
/// after one run.
pub fn text_state(content: &str, from: &str, to: &str) -> TextState {
    if pending_count(content, from, to) > 0 {
        TextState::Pending
    } else if content.contains(to) {
        TextState::Applied
    } else {
        TextState::Missing
    }
}

/// Stretches of `content` where `from` still counts as pending. When `to`
/// embeds `from`, text inside existing `to` occurrences is skipped.
fn pending_segments<'a>(content: &'a str, from: &str, to: &'a str) -> Vec<&'a str> {
    if to.is_empty() || !to.contains(from) {
        vec![content]
    } else {
        content.split(to).collect()
    }
}

/// Replace `from` with `to` everywhere except inside existing `to` text.
pub fn replace_pending(content: &str, from: &str, to: &str) -> String {
    pending_segments(content, from, to)
        .into_iter()
        .map(|segment| segment.replace(from, to))
        .collect::<Vec<_>>()
        .join(to)
}

/// Number of `from` occurrences [`replace_pending`] would rewrite.
pub fn pending_count(content: &str, from: &str, to: &str) -> usize {
    pending_segments(content, from, to)
        .into_iter()
        .map(|segment| segment.matches(from).count())
        .sum()
}
