//! Append member declarations to a type.

use serde::Deserialize;
use tracing::{debug, info};

use super::{PatchError, StructuralPatch};
use crate::cst::{parse_member, Element, NodeKind, Token, Tree, Trivia};
use crate::format::{detect_indentation, reindent, FormattingStyle};
use crate::guard;
use crate::locator::{find_type, member_list};

/// Append `members` (C# source text, any indentation) before the closing
/// brace of `target`. Members whose name already exists are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddMembers {
    pub target: String,
    pub members: Vec<String>,
}

impl AddMembers {
    fn names(&self) -> Result<Vec<String>, PatchError> {
        self.members
            .iter()
            .map(|text| {
                let node = parse_member(text)?;
                node.name().map(str::to_string).ok_or_else(|| {
                    PatchError::Unsupported(format!(
                        "cannot determine the name of member `{}`",
                        text.trim()
                    ))
                })
            })
            .collect()
    }
}

impl StructuralPatch for AddMembers {
    fn is_applied(&self, tree: &Tree) -> Result<bool, PatchError> {
        let ty = find_type(tree, &self.target)?;
        for name in self.names()? {
            if !guard::member_present(tree, &ty, &name)? {
                debug!(type_name = %self.target, member = %name, "member missing");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply(&self, tree: &Tree) -> Result<Tree, PatchError> {
        let ty = find_type(tree, &self.target)?;
        let style = FormattingStyle::for_type(tree, &ty)?;
        let list = member_list(tree, &ty)?;
        let list_node = tree.resolve(&list)?;
        let eol = style.line_ending.trivia();

        let existing: Vec<_> = list_node
            .children()
            .iter()
            .filter_map(Element::as_node)
            .filter(|n| matches!(n.kind(), NodeKind::Member(_) | NodeKind::Type(_)))
            .collect();
        // blank lines between members unless the type packs them tightly
        let blank_lines = existing.len() < 2
            || existing[1..].iter().any(|m| {
                m.first_token()
                    .is_some_and(|t| t.leading.iter().any(Trivia::is_end_of_line))
            });

        let mut added = Vec::new();
        for (text, name) in self.members.iter().zip(self.names()?) {
            if guard::member_present(tree, &ty, &name)? {
                debug!(type_name = %self.target, member = %name, "member already present");
                continue;
            }
            let node = parse_member(&reindent(text, &style.member_indent, style.line_ending))?;
            let mut element = Element::node(node).map_last_token(|t| t.trailing = vec![eol.clone()]);
            if blank_lines && !(existing.is_empty() && added.is_empty()) {
                element = element.map_first_token(|t| t.leading.insert(0, eol.clone()));
            }
            info!(type_name = %self.target, member = %name, "adding member");
            added.push(element);
        }
        if added.is_empty() {
            return Ok(tree.clone());
        }

        let mut children = list_node.children().to_vec();
        let close = children.len() - 1;
        let before = close - 1;
        if !children[before]
            .last_token()
            .is_some_and(Token::trailing_has_end_of_line)
        {
            children[before] = children[before].map_last_token(|t| t.trailing.push(eol.clone()));
        }
        let closes_on_own_line = children[close]
            .first_token()
            .is_some_and(|t| !t.leading.is_empty());
        if !closes_on_own_line {
            let type_indent = detect_indentation(tree.resolve(&ty)?).unwrap_or_default();
            children[close] = children[close].map_first_token(|t| {
                if !type_indent.is_empty() {
                    t.leading = vec![Trivia::whitespace(type_indent)];
                }
            });
        }
        children.splice(close..close, added);
        Ok(tree.replace_node(&list, list_node.with_children(children))?)
    }
}
