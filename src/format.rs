//! Formatting inference: line endings, indentation and re-indentation of
//! inserted snippets.

use crate::cst::{Element, Node, NodeHandle, NodeKind, Tree, TreeError, Trivia, TriviaKind};

/// Indentation assumed when a file gives no evidence.
pub const DEFAULT_INDENT: &str = "        ";

const DEFAULT_UNIT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    CrLf,
    Lf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::CrLf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }

    pub fn trivia(self) -> Trivia {
        Trivia::end_of_line(self.as_str())
    }
}

/// First line break in document order decides. CRLF when there is none.
pub fn detect_line_ending(tree: &Tree) -> LineEnding {
    tree.root()
        .tokens()
        .into_iter()
        .flat_map(|t| t.leading.iter().chain(t.trailing.iter()))
        .find(|t| t.kind == TriviaKind::EndOfLine)
        .map(|t| {
            if t.text == "\r\n" {
                LineEnding::CrLf
            } else {
                LineEnding::Lf
            }
        })
        .unwrap_or_default()
}

/// Whitespace directly in front of the node's first token.
pub fn detect_indentation(node: &Node) -> Option<String> {
    leading_indentation(node.first_token()?.leading.as_slice())
}

pub fn element_indentation(element: &Element) -> Option<String> {
    leading_indentation(element.first_token()?.leading.as_slice())
}

fn leading_indentation(leading: &[Trivia]) -> Option<String> {
    leading
        .last()
        .filter(|t| t.kind == TriviaKind::Whitespace)
        .map(|t| t.text.clone())
}

pub fn indentation_or_default(node: &Node) -> String {
    detect_indentation(node).unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

/// Style of one type declaration: its line ending, the indentation of its
/// members, and the unit added per nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingStyle {
    pub line_ending: LineEnding,
    pub member_indent: String,
    pub unit: String,
}

impl Default for FormattingStyle {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::default(),
            member_indent: DEFAULT_INDENT.to_string(),
            unit: DEFAULT_UNIT.to_string(),
        }
    }
}

impl FormattingStyle {
    pub fn for_type(tree: &Tree, ty: &NodeHandle) -> Result<Self, TreeError> {
        let node = tree.resolve(ty)?;
        let line_ending = detect_line_ending(tree);
        let type_indent = detect_indentation(node).unwrap_or_default();
        let first_member = node
            .children()
            .iter()
            .filter_map(Element::as_node)
            .find(|n| n.kind() == NodeKind::MemberList)
            .and_then(|list| list.children().iter().filter_map(Element::as_node).next());

        let member_indent = first_member
            .and_then(detect_indentation)
            .unwrap_or_else(|| format!("{type_indent}{DEFAULT_UNIT}"));
        let unit = member_indent
            .strip_prefix(type_indent.as_str())
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT)
            .to_string();

        Ok(Self {
            line_ending,
            member_indent,
            unit,
        })
    }

    /// Indentation of statements inside a member at `member_indent`.
    pub fn body_indent(&self, member_indent: &str) -> String {
        format!("{member_indent}{}", self.unit)
    }
}

/// Strip the common indentation of `text`, prefix every non-blank line with
/// `indent` and join with `line_ending`. Leading and trailing blank lines are
/// dropped; blank lines inside become empty.
pub fn reindent(text: &str, indent: &str, line_ending: LineEnding) -> String {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", &l[common..])
            }
        })
        .collect::<Vec<_>>()
        .join(line_ending.as_str())
}
