//! Add a defaulted parameter to every overload of a method and thread it
//! through to the calls the method makes.

use serde::Deserialize;
use tracing::{debug, info};

use super::{default_send_method, lists, PatchError, StructuralPatch};
use crate::cst::{parse_expression, parse_parameter, Element, NodeHandle, NodeKind, Tree, Trivia};
use crate::guard;
use crate::locator::{
    find_invocation, find_methods, find_type, first_object_creation_argument, has_parameter,
    CalleeKind, LocateError,
};

fn default_simple_prefixes() -> Vec<String> {
    vec!["_eval".to_string(), "Eval".to_string()]
}

fn default_member_prefixes() -> Vec<String> {
    vec!["Eval".to_string()]
}

/// `type name = default` on every overload of `methods` in type `target`.
///
/// Per overload, in this order: the first call to `send-method` gets a
/// `["name"] = name` entry in its first object-creation argument; the first
/// pass-through call gets a `name: name` argument; the signature gets the
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddParameter {
    pub target: String,
    pub methods: Vec<String>,
    pub name: String,
    pub param_type: String,
    pub default: String,
    #[serde(default = "default_send_method")]
    pub send_method: String,
    /// Prefixes of simple-name calls that receive the new argument.
    #[serde(default = "default_simple_prefixes")]
    pub pass_through_prefixes: Vec<String>,
    /// Prefixes of member-access calls that receive the new argument.
    #[serde(default = "default_member_prefixes")]
    pub member_pass_through_prefixes: Vec<String>,
}

impl AddParameter {
    /// First overload of `method` still lacking the parameter.
    fn next_overload(&self, tree: &Tree, method: &str) -> Result<Option<NodeHandle>, LocateError> {
        let ty = find_type(tree, &self.target)?;
        for handle in find_methods(tree, &ty, method)? {
            if !has_parameter(tree.resolve(&handle)?, &self.name) {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    fn is_pass_through(&self, name: &str, kind: CalleeKind) -> bool {
        let prefixes = match kind {
            CalleeKind::Simple => &self.pass_through_prefixes,
            CalleeKind::MemberAccess => &self.member_pass_through_prefixes,
        };
        prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    fn patch_overload(&self, tree: Tree, method: &str) -> Result<Tree, PatchError> {
        let tree = self.add_send_entry(tree, method)?;
        let tree = self.add_pass_through_argument(tree, method)?;
        self.add_signature_parameter(tree, method)
    }

    fn current(&self, tree: &Tree, method: &str) -> Result<NodeHandle, PatchError> {
        self.next_overload(tree, method)?.ok_or_else(|| {
            PatchError::Locate(LocateError::NotFound {
                what: "method overload",
                name: method.to_string(),
            })
        })
    }

    fn add_send_entry(&self, tree: Tree, method: &str) -> Result<Tree, PatchError> {
        let overload = self.current(&tree, method)?;
        let send = find_invocation(&tree, &overload, |c| {
            c.kind == CalleeKind::Simple && c.name == self.send_method
        })?;
        let Some(send) = send else {
            return Ok(tree);
        };
        let Some(creation) = first_object_creation_argument(&tree, &send)? else {
            return Ok(tree);
        };
        let Some(init) = creation.initializer() else {
            return Ok(tree);
        };
        let node = tree.resolve(&init)?;
        if guard::initializer_has_key(node, &self.name) {
            debug!(method, key = %self.name, "send entry already present");
            return Ok(tree);
        }
        let entry = parse_expression(&format!("[\"{0}\"] = {0}", self.name))?;
        let edited = lists::append_item(node, entry, vec![Trivia::space()]);
        Ok(tree.replace_node(&init, edited)?)
    }

    fn add_pass_through_argument(&self, tree: Tree, method: &str) -> Result<Tree, PatchError> {
        let overload = self.current(&tree, method)?;
        let call = find_invocation(&tree, &overload, |c| self.is_pass_through(c.name, c.kind))?;
        let Some(call) = call else {
            return Ok(tree);
        };
        let args = call.arguments();
        let node = tree.resolve(&args)?;
        let already_named = lists::items(node).iter().any(|arg| {
            arg.len() > 1 && arg[0].identifier_name() == Some(self.name.as_str()) && arg[1].is_punct(":")
        });
        if already_named {
            return Ok(tree);
        }
        debug!(method, callee = %call.name, "threading argument through call");
        let argument = parse_expression(&format!("{0}: {0}", self.name))?;
        let edited = lists::append_item(node, argument, vec![Trivia::space()]);
        Ok(tree.replace_node(&args, edited)?)
    }

    fn add_signature_parameter(&self, tree: Tree, method: &str) -> Result<Tree, PatchError> {
        let overload = self.current(&tree, method)?;
        let node = tree.resolve(&overload)?;
        let Some(list_at) = node.position_of(NodeKind::ParameterList) else {
            return Err(PatchError::Unsupported(format!(
                "method '{method}' has no parameter list"
            )));
        };
        let list = overload.child(list_at);
        let list_node = tree.resolve(&list)?;
        let parameter = parse_parameter(&format!(
            "{} {} = {}",
            self.param_type, self.name, self.default
        ))?;
        let edited = lists::append_item(list_node, vec![Element::node(parameter)], vec![Trivia::space()]);
        Ok(tree.replace_node(&list, edited)?)
    }
}

impl StructuralPatch for AddParameter {
    fn is_applied(&self, tree: &Tree) -> Result<bool, PatchError> {
        let ty = find_type(tree, &self.target)?;
        Ok(guard::parameter_on_every_overload(
            tree,
            &ty,
            &self.methods,
            &self.name,
        )?)
    }

    fn apply(&self, tree: &Tree) -> Result<Tree, PatchError> {
        let mut tree = tree.clone();
        for method in &self.methods {
            let ty = find_type(&tree, &self.target)?;
            let overloads = find_methods(&tree, &ty, method)?.len();
            let mut patched = 0usize;
            while self.next_overload(&tree, method)?.is_some() {
                if patched == overloads {
                    return Err(PatchError::Unsupported(format!(
                        "parameter '{}' could not be added to '{method}'",
                        self.name
                    )));
                }
                tree = self.patch_overload(tree, method)?;
                patched += 1;
            }
            if patched == 0 {
                debug!(type_name = %self.target, method = %method, "no overloads to patch");
            } else {
                info!(type_name = %self.target, method = %method, overloads = patched, "added parameter '{}'", self.name);
            }
        }
        Ok(tree)
    }
}
