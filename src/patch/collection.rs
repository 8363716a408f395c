//! Insert an entry at the front of a collection or object initializer.

use serde::Deserialize;
use tracing::{debug, info};

use super::{lists, PatchError, StructuralPatch};
use crate::cst::{parse_expression, Node, NodeHandle, Tree};
use crate::format::detect_line_ending;
use crate::guard;
use crate::locator::{find_methods, find_object_creation, find_type, LocateError, ObjectCreation};

/// Layout of initializer entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStyle {
    /// `["key"] = value`
    Keyed,
    /// `{ "key", value }`
    Positional,
    /// `Key = value`
    Member,
}

impl EntryStyle {
    /// Style of the first entry; for an empty initializer, keyed when the
    /// created type is a dictionary and member otherwise.
    pub fn detect(initializer: &Node, type_name: &str) -> Self {
        match lists::items(initializer).first() {
            Some([first, ..]) if first.is_group(crate::cst::Delim::Brace) => EntryStyle::Positional,
            Some([first, ..]) if first.is_group(crate::cst::Delim::Bracket) => EntryStyle::Keyed,
            Some(_) => EntryStyle::Member,
            None if type_name.ends_with("Dictionary") => EntryStyle::Keyed,
            None => EntryStyle::Member,
        }
    }

    pub fn render(self, key: &str, value: &str) -> String {
        match self {
            EntryStyle::Keyed => format!("[\"{key}\"] = {value}"),
            EntryStyle::Positional => format!("{{ \"{key}\", {value} }}"),
            EntryStyle::Member => format!("{key} = {value}"),
        }
    }
}

/// Add `key` → `value` to the first `new <creation>... { ... }` in each of
/// `methods` of `target`. Skips initializers that already hold the key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InsertEntry {
    pub target: String,
    pub methods: Vec<String>,
    pub creation: String,
    pub key: String,
    pub value: String,
}

impl InsertEntry {
    fn creation_in(&self, tree: &Tree, method: &str) -> Result<(ObjectCreation, NodeHandle), PatchError> {
        let ty = find_type(tree, &self.target)?;
        let handle = find_methods(tree, &ty, method)?
            .into_iter()
            .next()
            .ok_or_else(|| LocateError::NotFound {
                what: "method",
                name: format!("{}.{method}", self.target),
            })?;
        let creation = find_object_creation(tree, &handle, &self.creation)?.ok_or_else(|| {
            LocateError::NotFound {
                what: "object initializer",
                name: format!("new {} in {}.{method}", self.creation, self.target),
            }
        })?;
        let init = creation
            .initializer()
            .ok_or_else(|| LocateError::Malformed("object creation without initializer".to_string()))?;
        Ok((creation, init))
    }
}

/// Insert `key`/`value` at the front of the initializer at `init`.
pub fn insert_initializer_entry(
    tree: &Tree,
    init: &NodeHandle,
    type_name: &str,
    key: &str,
    value: &str,
) -> Result<Tree, PatchError> {
    let node = tree.resolve(init)?;
    if guard::initializer_has_key(node, key) {
        return Ok(tree.clone());
    }
    let style = EntryStyle::detect(node, type_name);
    let entry = parse_expression(&style.render(key, value))?;
    let separator = vec![detect_line_ending(tree).trivia()];
    let edited = lists::prepend_item(node, entry, separator);
    Ok(tree.replace_node(init, edited)?)
}

impl StructuralPatch for InsertEntry {
    fn is_applied(&self, tree: &Tree) -> Result<bool, PatchError> {
        for method in &self.methods {
            let (_, init) = self.creation_in(tree, method)?;
            if !guard::initializer_has_key(tree.resolve(&init)?, &self.key) {
                debug!(method = %method, key = %self.key, "entry missing");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply(&self, tree: &Tree) -> Result<Tree, PatchError> {
        let mut tree = tree.clone();
        for method in &self.methods {
            let (creation, init) = self.creation_in(&tree, method)?;
            if guard::initializer_has_key(tree.resolve(&init)?, &self.key) {
                continue;
            }
            tree = insert_initializer_entry(&tree, &init, &creation.type_name, &self.key, &self.value)?;
            info!(type_name = %self.target, method = %method, key = %self.key, "inserted initializer entry");
        }
        Ok(tree)
    }
}
