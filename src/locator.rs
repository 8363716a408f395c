//! Read-only queries over a [`Tree`] that return [`NodeHandle`]s.
//!
//! Handles stay valid only for the snapshot they were taken from; callers
//! re-run the query after every replacement.

use thiserror::Error;

use crate::cst::syntax::{angle_close, angle_open, split_separated};
use crate::cst::{Delim, Element, MemberKind, Node, NodeHandle, NodeKind, TokenKind, Tree, TreeError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },

    #[error("{what} '{name}' is ambiguous: {count} matches")]
    Ambiguous {
        what: &'static str,
        name: String,
        count: usize,
    },

    #[error("stale handle: taken from snapshot {handle}, tree is at snapshot {tree}")]
    StaleHandle { handle: u64, tree: u64 },

    #[error("malformed target: {0}")]
    Malformed(String),
}

impl From<TreeError> for LocateError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::StaleHandle { handle, tree } => LocateError::StaleHandle { handle, tree },
            TreeError::InvalidPath { path } => {
                LocateError::Malformed(format!("no node at path {path:?}"))
            }
        }
    }
}

/// The unique type declaration named `name`.
pub fn find_type(tree: &Tree, name: &str) -> Result<NodeHandle, LocateError> {
    let mut found = Vec::new();
    tree.root().walk(&mut |path, node| {
        if matches!(node.kind(), NodeKind::Type(_)) && node.name() == Some(name) {
            found.push(path.to_vec());
        }
        true
    });
    match found.len() {
        0 => Err(LocateError::NotFound {
            what: "type",
            name: name.to_string(),
        }),
        1 => Ok(tree.handle(found.remove(0))),
        count => Err(LocateError::Ambiguous {
            what: "type",
            name: name.to_string(),
            count,
        }),
    }
}

/// Handle to the member list (`{ ... }`) of a type.
pub fn member_list(tree: &Tree, ty: &NodeHandle) -> Result<NodeHandle, LocateError> {
    let node = tree.resolve(ty)?;
    if !matches!(node.kind(), NodeKind::Type(_)) {
        return Err(LocateError::Malformed(format!(
            "expected a type declaration, found {:?}",
            node.kind()
        )));
    }
    node.position_of(NodeKind::MemberList)
        .map(|i| ty.child(i))
        .ok_or_else(|| {
            LocateError::Malformed(format!(
                "type '{}' has no member body",
                node.name().unwrap_or_default()
            ))
        })
}

/// Direct members of a type, in document order.
fn members<'t>(tree: &'t Tree, ty: &NodeHandle) -> Result<Vec<(NodeHandle, &'t Node)>, LocateError> {
    let list = member_list(tree, ty)?;
    let node = tree.resolve(&list)?;
    Ok(node
        .children()
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_node().map(|n| (list.child(i), n)))
        .filter(|(_, n)| matches!(n.kind(), NodeKind::Member(_)))
        .collect())
}

/// Every overload of method `name` declared directly in `ty`.
pub fn find_methods(tree: &Tree, ty: &NodeHandle, name: &str) -> Result<Vec<NodeHandle>, LocateError> {
    Ok(members(tree, ty)?
        .into_iter()
        .filter(|(_, n)| n.kind() == NodeKind::Member(MemberKind::Method) && n.name() == Some(name))
        .map(|(h, _)| h)
        .collect())
}

/// First member called `name`, optionally restricted to one kind.
pub fn find_member(
    tree: &Tree,
    ty: &NodeHandle,
    name: &str,
    kind: Option<MemberKind>,
) -> Result<Option<NodeHandle>, LocateError> {
    Ok(members(tree, ty)?
        .into_iter()
        .find(|(_, n)| {
            n.name() == Some(name) && kind.is_none_or(|k| n.kind() == NodeKind::Member(k))
        })
        .map(|(h, _)| h))
}

/// Constructor taking exactly one parameter of type `param_type`.
pub fn find_constructor(
    tree: &Tree,
    ty: &NodeHandle,
    param_type: &str,
) -> Result<Option<NodeHandle>, LocateError> {
    Ok(members(tree, ty)?
        .into_iter()
        .find(|(_, n)| {
            if n.kind() != NodeKind::Member(MemberKind::Constructor) {
                return false;
            }
            let params = parameters(n);
            params.len() == 1 && parameter_type(params[0]) == param_type
        })
        .map(|(h, _)| h))
}

/// Whether the member's first token list carries `modifier`.
pub fn has_modifier(member: &Node, modifier: &str) -> bool {
    member
        .children()
        .iter()
        .skip_while(|e| e.is_group(Delim::Bracket))
        .take_while(|e| e.as_token().is_some())
        .any(|e| e.as_token().is_some_and(|t| t.text == modifier))
}

/// Parameter nodes of a method or constructor.
pub fn parameters(member: &Node) -> Vec<&Node> {
    member
        .position_of(NodeKind::ParameterList)
        .and_then(|i| member.child_node(i))
        .map(|list| {
            list.children()
                .iter()
                .filter_map(Element::as_node)
                .filter(|n| n.kind() == NodeKind::Parameter)
                .collect()
        })
        .unwrap_or_default()
}

pub fn has_parameter(member: &Node, name: &str) -> bool {
    parameters(member).iter().any(|p| p.name() == Some(name))
}

/// Type text of a parameter: everything between modifiers and the name.
pub fn parameter_type(param: &Node) -> String {
    const PARAM_MODIFIERS: &[&str] = &["this", "ref", "out", "in", "params", "scoped", "readonly"];
    let elems = param.children();
    let end = elems
        .iter()
        .position(|e| e.is_punct("="))
        .unwrap_or(elems.len());
    let Some(name_at) = elems[..end]
        .iter()
        .rposition(|e| e.identifier_name().is_some())
    else {
        return String::new();
    };
    elems[..name_at]
        .iter()
        .skip_while(|e| e.is_group(Delim::Bracket))
        .skip_while(|e| e.as_token().is_some_and(|t| PARAM_MODIFIERS.contains(&t.text.as_str())))
        .flat_map(Element::tokens)
        .map(|t| t.text.as_str())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalleeKind {
    /// `Foo(...)`
    Simple,
    /// `x.Foo(...)` or `x?.Foo(...)`
    MemberAccess,
}

/// What an invocation predicate gets to see.
#[derive(Debug, Clone, Copy)]
pub struct Callee<'a> {
    pub name: &'a str,
    pub kind: CalleeKind,
}

/// An invocation `name<...>(args)` found inside some node's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub parent: NodeHandle,
    pub name_index: usize,
    pub args_index: usize,
    pub name: String,
    pub kind: CalleeKind,
}

impl Invocation {
    /// Handle to the argument list group.
    pub fn arguments(&self) -> NodeHandle {
        self.parent.child(self.args_index)
    }
}

/// `new T<...>(...) { ... }` found inside some node's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreation {
    pub parent: NodeHandle,
    pub new_index: usize,
    pub type_name: String,
    pub generic: bool,
    pub initializer_index: Option<usize>,
}

impl ObjectCreation {
    pub fn initializer(&self) -> Option<NodeHandle> {
        self.initializer_index.map(|i| self.parent.child(i))
    }
}

/// Contextual keywords that may precede a parenthesized expression.
const NOT_CALLEES: &[&str] = &["await", "when", "var"];

fn is_callee_name(e: &Element) -> bool {
    e.as_token().is_some_and(|t| t.kind == TokenKind::Identifier)
        && e.identifier_name().is_some_and(|n| !NOT_CALLEES.contains(&n))
}

fn is_access(e: &Element) -> bool {
    e.is_punct(".") || e.is_punct("?.") || e.is_punct("::")
}

/// Leftmost element of the postfix chain ending at `name_at`.
fn chain_start(elems: &[Element], name_at: usize) -> usize {
    let mut s = name_at;
    while s > 0 {
        let prev = &elems[s - 1];
        let cur = &elems[s];
        let next = if is_access(cur) {
            if prev.is_punct(">") {
                angle_open(elems, s - 1).map(|o| o - 1)
            } else if is_callee_name(prev)
                || prev.is_keyword("this")
                || prev.is_keyword("base")
                || prev.group().is_some()
                || prev.is_punct("!")
                || prev.as_token().is_some_and(|t| {
                    matches!(t.kind, TokenKind::String | TokenKind::Number | TokenKind::Keyword)
                })
            {
                Some(s - 1)
            } else {
                None
            }
        } else if cur.identifier_name().is_some() || cur.is_keyword("this") || cur.is_keyword("base") {
            is_access(prev).then_some(s - 1)
        } else if cur.group().is_some() || cur.is_punct("!") {
            if prev.is_punct(">") {
                angle_open(elems, s - 1).map(|o| o - 1)
            } else if is_callee_name(prev) || prev.group().is_some() {
                Some(s - 1)
            } else {
                None
            }
        } else {
            None
        };
        match next {
            Some(n) => s = n,
            None => break,
        }
    }
    s
}

/// Whether the qualified name ending at `name_at` follows `new`.
fn is_constructed(elems: &[Element], name_at: usize) -> bool {
    let mut q = name_at;
    while q >= 2 && is_access(&elems[q - 1]) && elems[q - 2].identifier_name().is_some() {
        q -= 2;
    }
    q >= 1 && elems[q - 1].is_keyword("new")
}

fn invocations_in(node: &Node, parent: &NodeHandle) -> Vec<(usize, usize, Invocation)> {
    let elems = node.children();
    let mut out = Vec::new();
    for (i, e) in elems.iter().enumerate() {
        if i == 0 || !e.is_group(Delim::Paren) {
            continue;
        }
        let mut name_at = i - 1;
        if elems[name_at].is_punct(">") {
            match angle_open(elems, name_at) {
                Some(open) => name_at = open - 1,
                None => continue,
            }
        }
        if !is_callee_name(&elems[name_at]) || is_constructed(elems, name_at) {
            continue;
        }
        let Some(name) = elems[name_at].identifier_name() else {
            continue;
        };
        let kind = if name_at > 0 && (elems[name_at - 1].is_punct(".") || elems[name_at - 1].is_punct("?.")) {
            CalleeKind::MemberAccess
        } else {
            CalleeKind::Simple
        };
        out.push((
            chain_start(elems, name_at),
            i,
            Invocation {
                parent: parent.clone(),
                name_index: name_at,
                args_index: i,
                name: name.to_string(),
                kind,
            },
        ));
    }
    out
}

/// Parse `new Type<...>[..](...) { ... }` at `new_at`.
fn creation_at(elems: &[Element], new_at: usize) -> Option<(String, bool, Option<usize>)> {
    let mut j = new_at + 1;
    let mut name = String::new();
    while let Some(e) = elems.get(j) {
        if let Some(n) = e.identifier_name() {
            name = n.to_string();
            j += 1;
        } else if e.as_token().is_some_and(|t| t.kind == TokenKind::Keyword) && name.is_empty() {
            name = e.as_token().map(|t| t.text.clone()).unwrap_or_default();
            j += 1;
        } else {
            break;
        }
        if elems.get(j).is_some_and(is_access) {
            j += 1;
        } else {
            break;
        }
    }
    let mut generic = false;
    if elems.get(j).is_some_and(|e| e.is_punct("<")) {
        let close = angle_close(elems, j)?;
        generic = true;
        j = close + 1;
    }
    while elems.get(j).is_some_and(|e| e.is_group(Delim::Bracket)) {
        j += 1;
    }
    if elems.get(j).is_some_and(|e| e.is_group(Delim::Paren)) {
        j += 1;
    }
    let initializer = elems
        .get(j)
        .filter(|e| e.is_group(Delim::Brace))
        .map(|_| j);
    Some((name, generic, initializer))
}

fn creations_in(node: &Node, parent: &NodeHandle) -> Vec<(usize, usize, ObjectCreation)> {
    let elems = node.children();
    elems
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_keyword("new"))
        .filter_map(|(i, _)| {
            let (type_name, generic, initializer_index) = creation_at(elems, i)?;
            Some((
                i,
                0,
                ObjectCreation {
                    parent: parent.clone(),
                    new_index: i,
                    type_name,
                    generic,
                    initializer_index,
                },
            ))
        })
        .collect()
}

/// Collect items from every node under `scope` in syntax pre-order. Items
/// anchored at child index `k` of a node come before the subtree of child
/// `k`; ties at one anchor are ordered by descending key.
fn preorder<T>(
    tree: &Tree,
    scope: &NodeHandle,
    collect: &dyn Fn(&Node, &[usize]) -> Vec<(usize, usize, T)>,
) -> Result<Vec<T>, LocateError> {
    fn visit<T>(
        node: &Node,
        path: &mut Vec<usize>,
        collect: &dyn Fn(&Node, &[usize]) -> Vec<(usize, usize, T)>,
        out: &mut Vec<T>,
    ) {
        let mut items = collect(node, path);
        items.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let mut items = items.into_iter().peekable();
        for (k, child) in node.children().iter().enumerate() {
            while let Some((_, _, item)) = items.next_if(|it| it.0 <= k) {
                out.push(item);
            }
            if let Element::Node(n) = child {
                path.push(k);
                visit(n, path, collect, out);
                path.pop();
            }
        }
        out.extend(items.map(|(_, _, item)| item));
    }

    let node = tree.resolve(scope)?;
    let mut path = scope.path().to_vec();
    let mut out = Vec::new();
    visit(node, &mut path, collect, &mut out);
    Ok(out)
}

/// Every invocation under `scope`, outer calls before inner calls.
pub fn invocations(tree: &Tree, scope: &NodeHandle) -> Result<Vec<Invocation>, LocateError> {
    preorder(tree, scope, &|node, path| {
        invocations_in(node, &tree.handle(path.to_vec()))
    })
}

/// First invocation under `scope` accepted by `predicate`.
pub fn find_invocation(
    tree: &Tree,
    scope: &NodeHandle,
    predicate: impl Fn(&Callee<'_>) -> bool,
) -> Result<Option<Invocation>, LocateError> {
    Ok(invocations(tree, scope)?.into_iter().find(|inv| {
        predicate(&Callee {
            name: &inv.name,
            kind: inv.kind,
        })
    }))
}

/// Every `new T...` expression under `scope` in pre-order.
pub fn object_creations(tree: &Tree, scope: &NodeHandle) -> Result<Vec<ObjectCreation>, LocateError> {
    preorder(tree, scope, &|node, path| {
        creations_in(node, &tree.handle(path.to_vec()))
    })
}

/// First `new type_name... { ... }` under `scope` that has an initializer.
pub fn find_object_creation(
    tree: &Tree,
    scope: &NodeHandle,
    type_name: &str,
) -> Result<Option<ObjectCreation>, LocateError> {
    Ok(object_creations(tree, scope)?
        .into_iter()
        .find(|c| c.type_name == type_name && c.initializer_index.is_some()))
}

/// The first argument of `invocation` that is a `new T...` expression.
pub fn first_object_creation_argument(
    tree: &Tree,
    invocation: &Invocation,
) -> Result<Option<ObjectCreation>, LocateError> {
    let args = invocation.arguments();
    let node = tree.resolve(&args)?;
    let children = node.children();
    if children.len() < 2 {
        return Ok(None);
    }
    let inner = &children[1..children.len() - 1];
    let (items, _) = split_separated(inner);
    for item in items {
        let mut first = item.start;
        // named argument `name: new ...`
        if item.len() > 2 && inner[first].identifier_name().is_some() && inner[first + 1].is_punct(":") {
            first += 2;
        }
        if !inner.get(first).is_some_and(|e| e.is_keyword("new")) {
            continue;
        }
        let new_at = first + 1;
        if let Some((type_name, generic, initializer_index)) = creation_at(children, new_at) {
            if type_name.is_empty() {
                continue;
            }
            return Ok(Some(ObjectCreation {
                parent: args,
                new_index: new_at,
                type_name,
                generic,
                initializer_index,
            }));
        }
    }
    Ok(None)
}
