//! Immutable, lossless syntax tree on top of rowan's green tree.
//!
//! Every byte of the source lives either in a token's text or in the trivia
//! attached to a token. Nodes only group elements; they own no text of their
//! own, so serializing is a walk over green leaves in document order.
//!
//! A token is stored as a small green node holding its leading trivia, its
//! text and its trailing trivia, which keeps trivia ownership exact. Typed
//! children are decoded from the green node on first access.
//!
//! Trees are never mutated. [`Tree::replace_children`] produces a new tree
//! that shares every untouched green subtree with the old one and carries a
//! fresh snapshot id, which invalidates handles taken from the old tree.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use rowan::{GreenNode, GreenNodeData, GreenToken, GreenTokenData, NodeOrToken, SyntaxKind};

use super::errors::TreeError;
use super::syntax::declared_name;

static NEXT_SNAPSHOT: AtomicU64 = AtomicU64::new(1);

fn next_snapshot() -> u64 {
    NEXT_SNAPSHOT.fetch_add(1, Ordering::Relaxed)
}

/// Raw kind of the leaf holding a token's own text.
const TEXT: SyntaxKind = SyntaxKind(0);
const TRIVIA_BASE: u16 = 1;
const TOKEN_BASE: u16 = 16;
const NODE_BASE: u16 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriviaKind {
    Whitespace,
    EndOfLine,
    SingleLineComment,
    MultiLineComment,
    Directive,
}

const TRIVIA_KINDS: [TriviaKind; 5] = [
    TriviaKind::Whitespace,
    TriviaKind::EndOfLine,
    TriviaKind::SingleLineComment,
    TriviaKind::MultiLineComment,
    TriviaKind::Directive,
];

impl TriviaKind {
    fn raw(self) -> SyntaxKind {
        raw_kind(TRIVIA_BASE, &TRIVIA_KINDS, self)
    }

    fn from_raw(kind: SyntaxKind) -> Option<Self> {
        from_raw_kind(TRIVIA_BASE, &TRIVIA_KINDS, kind)
    }
}

fn raw_kind<K: PartialEq>(base: u16, table: &[K], kind: K) -> SyntaxKind {
    let index = table.iter().position(|k| *k == kind).unwrap_or_default();
    SyntaxKind(base + index as u16)
}

fn from_raw_kind<K: Copy>(base: u16, table: &[K], kind: SyntaxKind) -> Option<K> {
    table.get(usize::from(kind.0.checked_sub(base)?)).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub text: String,
}

impl Trivia {
    pub fn new(kind: TriviaKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn whitespace(text: impl Into<String>) -> Self {
        Self::new(TriviaKind::Whitespace, text)
    }

    pub fn space() -> Self {
        Self::whitespace(" ")
    }

    pub fn end_of_line(text: impl Into<String>) -> Self {
        Self::new(TriviaKind::EndOfLine, text)
    }

    pub fn is_end_of_line(&self) -> bool {
        self.kind == TriviaKind::EndOfLine
    }

    fn to_green(&self) -> GreenToken {
        GreenToken::new(self.kind.raw(), &self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delim {
    Paren,
    Bracket,
    Brace,
}

impl Delim {
    pub fn open(self) -> &'static str {
        match self {
            Delim::Paren => "(",
            Delim::Bracket => "[",
            Delim::Brace => "{",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Delim::Paren => ")",
            Delim::Bracket => "]",
            Delim::Brace => "}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    String,
    Char,
    Punct,
    Open(Delim),
    Close(Delim),
    EndOfFile,
}

const TOKEN_KINDS: [TokenKind; 13] = [
    TokenKind::Identifier,
    TokenKind::Keyword,
    TokenKind::Number,
    TokenKind::String,
    TokenKind::Char,
    TokenKind::Punct,
    TokenKind::Open(Delim::Paren),
    TokenKind::Open(Delim::Bracket),
    TokenKind::Open(Delim::Brace),
    TokenKind::Close(Delim::Paren),
    TokenKind::Close(Delim::Bracket),
    TokenKind::Close(Delim::Brace),
    TokenKind::EndOfFile,
];

impl TokenKind {
    fn raw(self) -> SyntaxKind {
        raw_kind(TOKEN_BASE, &TOKEN_KINDS, self)
    }

    fn from_raw(kind: SyntaxKind) -> Option<Self> {
        from_raw_kind(TOKEN_BASE, &TOKEN_KINDS, kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub leading: Vec<Trivia>,
    pub trailing: Vec<Trivia>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            leading: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub fn punct(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Punct, text)
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Identifier, text)
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Keyword, text)
    }

    pub fn with_leading(mut self, leading: Vec<Trivia>) -> Self {
        self.leading = leading;
        self
    }

    pub fn with_trailing(mut self, trailing: Vec<Trivia>) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == text
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Identifier text with any `@` verbatim prefix removed.
    pub fn identifier_name(&self) -> Option<&str> {
        if self.kind == TokenKind::Identifier {
            Some(self.text.strip_prefix('@').unwrap_or(&self.text))
        } else {
            None
        }
    }

    /// Literal value of a plain `"..."` string without escapes.
    pub fn simple_string_value(&self) -> Option<&str> {
        if self.kind != TokenKind::String {
            return None;
        }
        let inner = self.text.strip_prefix('"')?.strip_suffix('"')?;
        if inner.contains('\\') || inner.contains('"') {
            return None;
        }
        Some(inner)
    }

    pub fn write_to(&self, out: &mut String) {
        for t in &self.leading {
            out.push_str(&t.text);
        }
        out.push_str(&self.text);
        for t in &self.trailing {
            out.push_str(&t.text);
        }
    }

    pub fn trailing_has_end_of_line(&self) -> bool {
        self.trailing.iter().any(Trivia::is_end_of_line)
    }

    /// Green form: leading trivia leaves, the text leaf, trailing trivia
    /// leaves.
    fn to_green(&self) -> GreenNode {
        let leaves = self
            .leading
            .iter()
            .map(Trivia::to_green)
            .chain(std::iter::once(GreenToken::new(TEXT, &self.text)))
            .chain(self.trailing.iter().map(Trivia::to_green))
            .map(NodeOrToken::Token)
            .collect::<Vec<NodeOrToken<GreenNode, GreenToken>>>();
        GreenNode::new(self.kind.raw(), leaves)
    }

    fn from_green(kind: TokenKind, green: &GreenNodeData) -> Token {
        let mut token = Token::new(kind, "");
        let mut seen_text = false;
        for leaf in green.children().filter_map(NodeOrToken::into_token) {
            match TriviaKind::from_raw(leaf.kind()) {
                Some(trivia) if seen_text => token.trailing.push(Trivia::new(trivia, leaf.text())),
                Some(trivia) => token.leading.push(Trivia::new(trivia, leaf.text())),
                None => {
                    token.text = leaf.text().to_string();
                    seen_text = true;
                }
            }
        }
        token
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Record,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Constructor,
    Property,
    Field,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    CompilationUnit,
    Namespace,
    Type(TypeKind),
    /// `{ ... }` body of a namespace or type, split into members.
    MemberList,
    Member(MemberKind),
    ParameterList,
    Parameter,
    /// `{ ... }` body of a method or constructor, split into statements.
    Block,
    Statement,
    /// `=> expr` of an expression-bodied member, without the `;`.
    ArrowBody,
    Group(Delim),
    /// Loose elements produced by fragment parsing.
    Fragment,
}

const NODE_KINDS: [NodeKind; 22] = [
    NodeKind::CompilationUnit,
    NodeKind::Namespace,
    NodeKind::Type(TypeKind::Class),
    NodeKind::Type(TypeKind::Struct),
    NodeKind::Type(TypeKind::Interface),
    NodeKind::Type(TypeKind::Record),
    NodeKind::Type(TypeKind::Enum),
    NodeKind::MemberList,
    NodeKind::Member(MemberKind::Method),
    NodeKind::Member(MemberKind::Constructor),
    NodeKind::Member(MemberKind::Property),
    NodeKind::Member(MemberKind::Field),
    NodeKind::Member(MemberKind::Other),
    NodeKind::ParameterList,
    NodeKind::Parameter,
    NodeKind::Block,
    NodeKind::Statement,
    NodeKind::ArrowBody,
    NodeKind::Group(Delim::Paren),
    NodeKind::Group(Delim::Bracket),
    NodeKind::Group(Delim::Brace),
    NodeKind::Fragment,
];

impl NodeKind {
    fn raw(self) -> SyntaxKind {
        raw_kind(NODE_BASE, &NODE_KINDS, self)
    }

    fn from_raw(kind: SyntaxKind) -> Option<Self> {
        from_raw_kind(NODE_BASE, &NODE_KINDS, kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Node(Node),
    Token(Token),
}

impl Element {
    pub fn token(token: Token) -> Self {
        Element::Token(token)
    }

    pub fn node(node: Node) -> Self {
        Element::Node(node)
    }

    fn to_green(&self) -> NodeOrToken<GreenNode, GreenToken> {
        match self {
            Element::Node(n) => NodeOrToken::Node(n.green.clone()),
            Element::Token(t) => NodeOrToken::Node(t.to_green()),
        }
    }

    fn from_green(child: NodeOrToken<&GreenNodeData, &GreenTokenData>) -> Option<Element> {
        let green = child.into_node()?;
        match TokenKind::from_raw(green.kind()) {
            Some(kind) => Some(Element::Token(Token::from_green(kind, green))),
            None => Node::from_green(green.to_owned()).map(Element::Node),
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Element::Token(t) => Some(t),
            Element::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(n) => Some(n),
            Element::Token(_) => None,
        }
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.as_token().is_some_and(|t| t.is_punct(text))
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.as_token().is_some_and(|t| t.is_keyword(text))
    }

    pub fn identifier_name(&self) -> Option<&str> {
        self.as_token().and_then(Token::identifier_name)
    }

    pub fn group(&self) -> Option<Delim> {
        match self.as_node()?.kind {
            NodeKind::Group(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_group(&self, delim: Delim) -> bool {
        self.group() == Some(delim)
    }

    pub fn first_token(&self) -> Option<&Token> {
        match self {
            Element::Token(t) => Some(t),
            Element::Node(n) => n.first_token(),
        }
    }

    pub fn last_token(&self) -> Option<&Token> {
        match self {
            Element::Token(t) => Some(t),
            Element::Node(n) => n.last_token(),
        }
    }

    pub fn tokens(&self) -> Vec<&Token> {
        match self {
            Element::Token(t) => vec![t],
            Element::Node(n) => n.tokens(),
        }
    }

    pub fn write_to(&self, out: &mut String) {
        match self {
            Element::Token(t) => t.write_to(out),
            Element::Node(n) => n.write_to(out),
        }
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Copy of this element with its first token rewritten by `f`.
    pub fn map_first_token(&self, f: impl FnOnce(&mut Token)) -> Element {
        match self {
            Element::Token(t) => {
                let mut token = Token::clone(t);
                f(&mut token);
                Element::token(token)
            }
            Element::Node(n) => Element::node(n.map_edge_token(true, f)),
        }
    }

    /// Copy of this element with its last token rewritten by `f`.
    pub fn map_last_token(&self, f: impl FnOnce(&mut Token)) -> Element {
        match self {
            Element::Token(t) => {
                let mut token = Token::clone(t);
                f(&mut token);
                Element::token(token)
            }
            Element::Node(n) => Element::node(n.map_edge_token(false, f)),
        }
    }
}

/// Typed view of one green node. Children and the declared name are decoded
/// on first use; clones share the green node and start with empty caches.
pub struct Node {
    kind: NodeKind,
    green: GreenNode,
    children: OnceLock<Vec<Element>>,
    name: OnceLock<Option<String>>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self::with_green(self.kind, self.green.clone())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.green == other.green
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("text", &self.text())
            .finish()
    }
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Element>) -> Self {
        let green = GreenNode::new(kind.raw(), children.iter().map(Element::to_green));
        Self {
            kind,
            green,
            children: OnceLock::from(children),
            name: OnceLock::new(),
        }
    }

    fn with_green(kind: NodeKind, green: GreenNode) -> Self {
        Self {
            kind,
            green,
            children: OnceLock::new(),
            name: OnceLock::new(),
        }
    }

    /// View over a green node built by this module; `None` for foreign kinds.
    pub fn from_green(green: GreenNode) -> Option<Self> {
        let kind = NodeKind::from_raw(green.kind())?;
        Some(Self::with_green(kind, green))
    }

    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Declared name for namespaces, types, members and parameters, if one
    /// is recognised.
    pub fn name(&self) -> Option<&str> {
        self.name
            .get_or_init(|| declared_name(self.kind, self.children()))
            .as_deref()
    }

    pub fn children(&self) -> &[Element] {
        self.children
            .get_or_init(|| self.green.children().filter_map(Element::from_green).collect())
    }

    pub fn with_children(&self, children: Vec<Element>) -> Node {
        Node::new(self.kind, children)
    }

    pub fn child_node(&self, index: usize) -> Option<&Node> {
        self.children().get(index).and_then(Element::as_node)
    }

    /// Index of the first direct child node of `kind`.
    pub fn position_of(&self, kind: NodeKind) -> Option<usize> {
        self.children()
            .iter()
            .position(|c| c.as_node().is_some_and(|n| n.kind == kind))
    }

    pub fn first_token(&self) -> Option<&Token> {
        self.children().iter().find_map(Element::first_token)
    }

    pub fn last_token(&self) -> Option<&Token> {
        self.children().iter().rev().find_map(Element::last_token)
    }

    /// All tokens in document order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        for child in self.children() {
            match child {
                Element::Token(t) => out.push(t),
                Element::Node(n) => n.collect_tokens(out),
            }
        }
    }

    pub fn write_to(&self, out: &mut String) {
        push_leaves(&self.green, out);
    }

    /// Full text including the outer trivia.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Token texts joined without any trivia. Used to compare code while
    /// ignoring layout.
    pub fn normalized_text(&self) -> String {
        normalize_tokens(self.tokens())
    }

    /// Whether any token in this subtree is the identifier `name`.
    pub fn contains_identifier(&self, name: &str) -> bool {
        self.tokens()
            .iter()
            .any(|t| t.identifier_name() == Some(name))
    }

    fn map_edge_token(&self, first: bool, f: impl FnOnce(&mut Token)) -> Node {
        let mut children = self.children().to_vec();
        let index = if first {
            children.iter().position(|c| c.first_token().is_some())
        } else {
            children.iter().rposition(|c| c.last_token().is_some())
        };
        if let Some(i) = index {
            children[i] = if first {
                children[i].map_first_token(f)
            } else {
                children[i].map_last_token(f)
            };
        }
        self.with_children(children)
    }

    /// Pre-order walk over this node and every descendant node, yielding the
    /// path relative to `self`.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&[usize], &'a Node) -> bool) {
        let mut path = Vec::new();
        self.walk_inner(&mut path, f);
    }

    fn walk_inner<'a>(
        &'a self,
        path: &mut Vec<usize>,
        f: &mut impl FnMut(&[usize], &'a Node) -> bool,
    ) {
        if !f(path, self) {
            return;
        }
        for (i, child) in self.children().iter().enumerate() {
            if let Element::Node(n) = child {
                path.push(i);
                n.walk_inner(path, f);
                path.pop();
            }
        }
    }

    fn at_path(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self;
        for &i in path {
            node = node.child_node(i)?;
        }
        Some(node)
    }
}

fn push_leaves(green: &GreenNodeData, out: &mut String) {
    for child in green.children() {
        match child {
            NodeOrToken::Node(n) => push_leaves(n, out),
            NodeOrToken::Token(t) => out.push_str(t.text()),
        }
    }
}

/// `node` with the green node at `path` swapped for `replacement`. Siblings
/// along the way are shared, not copied.
fn splice_green(node: &GreenNodeData, path: &[usize], replacement: GreenNode) -> Option<GreenNode> {
    let Some((&index, rest)) = path.split_first() else {
        return Some(replacement);
    };
    let child = node.children().nth(index)?.into_node()?;
    let replaced = splice_green(child, rest, replacement)?;
    Some(node.replace_child(index, NodeOrToken::Node(replaced)))
}

/// Token texts concatenated without trivia.
pub fn normalize_tokens<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> String {
    tokens.into_iter().map(|t| t.text.as_str()).collect()
}

/// Reference to a node within one specific tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    snapshot: u64,
    path: Vec<usize>,
}

impl NodeHandle {
    pub fn snapshot(&self) -> u64 {
        self.snapshot
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Handle to the direct child at `index` of the addressed node.
    pub fn child(&self, index: usize) -> NodeHandle {
        let mut path = self.path.clone();
        path.push(index);
        NodeHandle {
            snapshot: self.snapshot,
            path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    root: Node,
    snapshot: u64,
}

impl Tree {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            snapshot: next_snapshot(),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn snapshot(&self) -> u64 {
        self.snapshot
    }

    pub fn root_handle(&self) -> NodeHandle {
        self.handle(Vec::new())
    }

    pub fn handle(&self, path: Vec<usize>) -> NodeHandle {
        NodeHandle {
            snapshot: self.snapshot,
            path,
        }
    }

    pub fn resolve(&self, handle: &NodeHandle) -> Result<&Node, TreeError> {
        if handle.snapshot != self.snapshot {
            return Err(TreeError::StaleHandle {
                handle: handle.snapshot,
                tree: self.snapshot,
            });
        }
        self.root
            .at_path(&handle.path)
            .ok_or_else(|| TreeError::InvalidPath {
                path: handle.path.clone(),
            })
    }

    /// New tree where `range` of the addressed node's children is replaced.
    pub fn replace_children(
        &self,
        handle: &NodeHandle,
        range: Range<usize>,
        replacement: Vec<Element>,
    ) -> Result<Tree, TreeError> {
        let node = self.resolve(handle)?;
        if range.start > range.end || range.end > node.children().len() {
            return Err(TreeError::InvalidPath {
                path: handle.path.clone(),
            });
        }
        self.replace_node_with(handle, |n| {
            let mut children = n.children().to_vec();
            children.splice(range, replacement);
            n.with_children(children)
        })
    }

    /// New tree with the addressed node swapped for `node`.
    pub fn replace_node(&self, handle: &NodeHandle, node: Node) -> Result<Tree, TreeError> {
        self.replace_node_with(handle, |_| node)
    }

    fn replace_node_with(
        &self,
        handle: &NodeHandle,
        f: impl FnOnce(&Node) -> Node,
    ) -> Result<Tree, TreeError> {
        let replacement = f(self.resolve(handle)?);
        let invalid = || TreeError::InvalidPath {
            path: handle.path.clone(),
        };
        let green = splice_green(&self.root.green, &handle.path, replacement.green).ok_or_else(invalid)?;
        Ok(Tree::new(Node::from_green(green).ok_or_else(invalid)?))
    }

    pub fn serialize(&self) -> String {
        self.root.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> Element {
        Element::token(Token::identifier(text).with_trailing(vec![Trivia::space()]))
    }

    fn sample() -> Tree {
        let inner = Node::new(NodeKind::Statement, vec![leaf("b"), leaf("c")]);
        Tree::new(Node::new(
            NodeKind::CompilationUnit,
            vec![leaf("a"), Element::node(inner)],
        ))
    }

    #[test]
    fn serialize_walks_tokens_in_order() {
        assert_eq!(sample().serialize(), "a b c ");
    }

    #[test]
    fn replace_children_produces_new_snapshot() {
        let tree = sample();
        let stmt = tree.handle(vec![1]);
        let edited = tree
            .replace_children(&stmt, 1..2, vec![leaf("x"), leaf("y")])
            .unwrap();
        assert_eq!(edited.serialize(), "a b x y ");
        assert_eq!(tree.serialize(), "a b c ");
        assert_ne!(tree.snapshot(), edited.snapshot());
    }

    #[test]
    fn stale_handle_is_rejected() {
        let tree = sample();
        let stmt = tree.handle(vec![1]);
        let edited = tree.replace_children(&stmt, 0..0, vec![leaf("z")]).unwrap();
        let err = edited.resolve(&stmt).unwrap_err();
        assert!(matches!(err, TreeError::StaleHandle { .. }));
    }

    #[test]
    fn untouched_subtrees_are_shared() {
        let tree = sample();
        let edited = tree
            .replace_children(&tree.root_handle(), 0..1, vec![leaf("q")])
            .unwrap();
        let (Some(before), Some(after)) = (tree.root().child_node(1), edited.root().child_node(1)) else {
            panic!("expected statement nodes");
        };
        let before: &GreenNodeData = before.green();
        let after: &GreenNodeData = after.green();
        assert!(std::ptr::eq(before, after));
    }

    #[test]
    fn tokens_keep_their_trivia_through_the_green_tree() {
        let token = Token::keyword("return")
            .with_leading(vec![Trivia::end_of_line("\r\n"), Trivia::whitespace("    ")])
            .with_trailing(vec![Trivia::space(), Trivia::new(TriviaKind::SingleLineComment, "// x")]);
        let node = Node::new(NodeKind::Statement, vec![Element::token(token.clone())]);
        let decoded = Node::from_green(node.green().clone()).unwrap();
        assert_eq!(decoded.kind(), NodeKind::Statement);
        assert_eq!(decoded.children(), &[Element::token(token)]);
        assert_eq!(decoded.text(), "\r\n    return // x");
    }

    #[test]
    fn every_kind_has_its_own_raw_kind() {
        let mut seen = std::collections::HashSet::new();
        for kind in NODE_KINDS {
            assert_eq!(NodeKind::from_raw(kind.raw()), Some(kind));
            assert!(seen.insert(kind.raw().0));
        }
        for kind in TOKEN_KINDS {
            assert_eq!(TokenKind::from_raw(kind.raw()), Some(kind));
            assert!(seen.insert(kind.raw().0));
        }
        for kind in TRIVIA_KINDS {
            assert_eq!(TriviaKind::from_raw(kind.raw()), Some(kind));
            assert!(seen.insert(kind.raw().0));
        }
        assert!(!seen.contains(&TEXT.0));
    }

    #[test]
    fn map_last_token_rewrites_trailing_trivia() {
        let tree = sample();
        let stmt = Element::node(tree.root().child_node(1).unwrap().clone());
        let mapped = stmt.map_last_token(|t| t.trailing.clear());
        assert_eq!(mapped.text(), "b c");
    }
}
