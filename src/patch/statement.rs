//! Statement-level edits inside method and constructor bodies.

use serde::Deserialize;
use tracing::{debug, info};

use super::{default_send_method, PatchError, StructuralPatch};
use crate::cst::syntax::{angle_close, is_modifier_element};
use crate::cst::{
    parse_expression, parse_statement, Delim, Element, Node, NodeHandle, NodeKind, Token,
    TokenKind, Tree, Trivia, TriviaKind,
};
use crate::format::{detect_indentation, element_indentation, FormattingStyle, LineEnding};
use crate::guard::{self, StatementMarker};
use crate::locator::{find_constructor, find_methods, find_type, has_modifier, LocateError};

/// Insert `statement` as the first statement of `method` in `target`.
///
/// Expression-bodied methods are converted to a block whose last statement
/// awaits the old expression. A bare `return send(...)` becomes an awaited
/// call, and `async` is added when the body now awaits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InjectStatement {
    pub target: String,
    pub method: String,
    pub statement: String,
    /// Identifier whose presence in the first statement marks the edit as
    /// done. Defaults to comparing the whole statement.
    #[serde(default)]
    pub marker: Option<String>,
    /// Only consider overloads carrying this modifier.
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default = "default_send_method")]
    pub send_method: String,
}

/// Replace a method body with a single statement, keeping the braces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReplaceBody {
    pub target: String,
    pub method: String,
    pub statement: String,
}

/// Append `statement` to the copy constructor of `target`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppendStatement {
    pub target: String,
    pub statement: String,
    /// Parameter type of the constructor; defaults to `target` itself.
    #[serde(default)]
    pub constructor: Option<String>,
}

enum Body {
    Block(usize),
    Arrow { arrow: usize, semicolon: Option<usize> },
    Missing,
}

fn body_of(member: &Node) -> Body {
    if let Some(i) = member.position_of(NodeKind::Block) {
        return Body::Block(i);
    }
    match member.position_of(NodeKind::ArrowBody) {
        Some(arrow) => Body::Arrow {
            arrow,
            semicolon: member
                .children()
                .get(arrow + 1)
                .filter(|e| e.is_punct(";"))
                .map(|_| arrow + 1),
        },
        None => Body::Missing,
    }
}

fn indent(text: &str) -> Vec<Trivia> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Trivia::whitespace(text)]
    }
}

fn statement_element(text: &str, leading: Vec<Trivia>, trailing: Vec<Trivia>) -> Result<Element, PatchError> {
    let node = parse_statement(text.trim())?;
    Ok(Element::node(node)
        .map_first_token(|t| t.leading = leading)
        .map_last_token(|t| t.trailing = trailing))
}

/// Make sure the `{` of a block ends its line before statements are added
/// to an empty body.
fn open_brace_on_own_line(children: &mut [Element], line_ending: LineEnding) {
    if let Some(open) = children.first_mut() {
        if !open.last_token().is_some_and(Token::trailing_has_end_of_line) {
            *open = open.map_last_token(|t| t.trailing = vec![line_ending.trivia()]);
        }
    }
}

fn close_brace_indented(children: &mut [Element], member_indent: &str) {
    if let Some(close) = children.last_mut() {
        let indented = close
            .first_token()
            .is_some_and(|t| t.leading.last().is_some_and(|l| l.kind == TriviaKind::Whitespace));
        if !indented {
            *close = close.map_first_token(|t| t.leading = indent(member_indent));
        }
    }
}

fn statement_positions(block: &Node) -> Vec<usize> {
    block
        .children()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.as_node().is_some_and(|n| n.kind() == NodeKind::Statement))
        .map(|(i, _)| i)
        .collect()
}

/// Whether `elems` is exactly `send<...>(...)`.
fn is_bare_send(elems: &[Element], send: &str) -> bool {
    let Some(end) = send_call_end(elems, 0, send) else {
        return false;
    };
    end + 1 == elems.len() && !elems.iter().any(|e| mentions(e, "ConfigureAwait"))
}

fn mentions(e: &Element, name: &str) -> bool {
    e.tokens().iter().any(|t| t.identifier_name() == Some(name))
}

/// Index of the argument group of a `send<...>(...)` call starting at `at`.
fn send_call_end(elems: &[Element], at: usize, send: &str) -> Option<usize> {
    if elems.get(at)?.identifier_name() != Some(send) {
        return None;
    }
    let mut j = at + 1;
    if elems.get(j)?.is_punct("<") {
        j = angle_close(elems, j)? + 1;
    }
    elems.get(j)?.is_group(Delim::Paren).then_some(j)
}

fn configure_await_false() -> Result<Vec<Element>, PatchError> {
    Ok(parse_expression(".ConfigureAwait(false)")?)
}

/// Rewrite the first `return send(...);` under `node`, in document order,
/// into `await send(...).ConfigureAwait(false);`.
fn await_first_return(node: &Node, send: &str) -> Result<Option<Node>, PatchError> {
    let children = node.children();
    for k in 0..children.len() {
        if let Some(edited) = await_return_at(children, k, send)? {
            return Ok(Some(node.with_children(edited)));
        }
        if let Some(inner) = children[k].as_node() {
            if let Some(replaced) = await_first_return(inner, send)? {
                let mut edited = children.to_vec();
                edited[k] = Element::node(replaced);
                return Ok(Some(node.with_children(edited)));
            }
        }
    }
    Ok(None)
}

/// `children` with the `return send(...);` starting at `k` awaited, when
/// one starts there.
fn await_return_at(
    children: &[Element],
    k: usize,
    send: &str,
) -> Result<Option<Vec<Element>>, PatchError> {
    if !children[k].is_keyword("return") {
        return Ok(None);
    }
    let Some(args) = send_call_end(children, k + 1, send) else {
        return Ok(None);
    };
    if !children.get(args + 1).is_some_and(|e| e.is_punct(";"))
        || children[k + 1..=args].iter().any(|e| mentions(e, "ConfigureAwait"))
    {
        return Ok(None);
    }
    let mut edited = children.to_vec();
    let moved = children[args]
        .last_token()
        .map(|t| t.trailing.clone())
        .unwrap_or_default();
    edited[args] = edited[args].map_last_token(|t| t.trailing.clear());
    edited[k] = edited[k].map_first_token(|t| {
        t.kind = TokenKind::Identifier;
        t.text = "await".to_string();
    });
    let mut suffix = configure_await_false()?;
    if let Some(last) = suffix.last_mut() {
        *last = last.map_last_token(|t| t.trailing = moved);
    }
    edited.splice(args + 1..args + 1, suffix);
    Ok(Some(edited))
}

/// Add `async` after the last modifier, or in front of the return type when
/// there are no modifiers.
fn ensure_async(member: &Node) -> Node {
    let children = member.children();
    let start = children
        .iter()
        .position(|e| !e.is_group(Delim::Bracket))
        .unwrap_or(children.len());
    let modifiers = children[start..]
        .iter()
        .take_while(|e| is_modifier_element(e))
        .count();
    let end = start + modifiers;
    if children[start..end]
        .iter()
        .any(|e| e.as_token().is_some_and(|t| t.text == "async"))
    {
        return member.clone();
    }

    let mut edited = children.to_vec();
    if modifiers > 0 {
        let token = Token::identifier("async").with_trailing(vec![Trivia::space()]);
        edited.insert(end, Element::token(token));
    } else if let Some(first) = children.get(start) {
        let leading = first.first_token().map(|t| t.leading.clone()).unwrap_or_default();
        edited[start] = first.map_first_token(|t| t.leading.clear());
        let token = Token::identifier("async")
            .with_leading(leading)
            .with_trailing(vec![Trivia::space()]);
        edited.insert(start, Element::token(token));
    }
    member.with_children(edited)
}

impl InjectStatement {
    fn locate(&self, tree: &Tree) -> Result<(NodeHandle, NodeHandle), PatchError> {
        let ty = find_type(tree, &self.target)?;
        let mut found = None;
        for handle in find_methods(tree, &ty, &self.method)? {
            let node = tree.resolve(&handle)?;
            if self.modifier.as_deref().is_none_or(|m| has_modifier(node, m)) {
                found = Some(handle);
                break;
            }
        }
        let method = found.ok_or_else(|| LocateError::NotFound {
            what: "method",
            name: format!("{}.{}", self.target, self.method),
        })?;
        Ok((ty, method))
    }

    fn marker(&self) -> Result<StatementMarker, PatchError> {
        Ok(match &self.marker {
            Some(name) => StatementMarker::Identifier(name.clone()),
            None => StatementMarker::Code(parse_statement(self.statement.trim())?.normalized_text()),
        })
    }

    fn inject_into_block(
        &self,
        member: &Node,
        block_at: usize,
        style: &FormattingStyle,
    ) -> Result<(Node, bool), PatchError> {
        let member_indent = detect_indentation(member).unwrap_or_else(|| style.member_indent.clone());
        let Some(block) = member.child_node(block_at) else {
            return Err(PatchError::Unsupported(format!("'{}' has no body", self.method)));
        };
        let eol = style.line_ending.trivia();
        let mut children = block.children().to_vec();

        match statement_positions(block).first() {
            Some(&first) => {
                let ind = element_indentation(&children[first])
                    .unwrap_or_else(|| style.body_indent(&member_indent));
                let stmt = statement_element(&self.statement, indent(&ind), vec![eol.clone(), eol])?;
                children.insert(first, stmt);
            }
            None => {
                let ind = style.body_indent(&member_indent);
                let stmt = statement_element(&self.statement, indent(&ind), vec![eol])?;
                open_brace_on_own_line(&mut children, style.line_ending);
                close_brace_indented(&mut children, &member_indent);
                let close = children.len() - 1;
                children.insert(close, stmt);
            }
        }

        let mut block = block.with_children(children);
        let mut awaited = self.statement.contains("await");
        if let Some(rewritten) = await_first_return(&block, &self.send_method)? {
            debug!(method = %self.method, "awaiting former return of send call");
            block = rewritten;
            awaited = true;
        }
        let mut edited = member.children().to_vec();
        edited[block_at] = Element::node(block);
        Ok((member.with_children(edited), awaited))
    }

    fn convert_arrow(
        &self,
        member: &Node,
        arrow_at: usize,
        semicolon: Option<usize>,
        style: &FormattingStyle,
    ) -> Result<Node, PatchError> {
        let member_indent = detect_indentation(member).unwrap_or_else(|| style.member_indent.clone());
        let body_indent = style.body_indent(&member_indent);
        let eol = style.line_ending.trivia();
        let children = member.children();
        let Some(arrow) = member.child_node(arrow_at) else {
            return Err(PatchError::Unsupported(format!("'{}' has no body", self.method)));
        };

        let mut expr: Vec<Element> = arrow.children().iter().skip(1).cloned().collect();
        if let Some(first) = expr.first_mut() {
            *first = first.map_first_token(|t| t.leading.clear());
        }
        if let Some(last) = expr.last_mut() {
            *last = last.map_last_token(|t| t.trailing.clear());
        }
        if is_bare_send(&expr, &self.send_method) {
            expr.extend(configure_await_false()?);
        }

        let mut await_stmt = vec![Element::token(
            Token::identifier("await")
                .with_leading(indent(&body_indent))
                .with_trailing(vec![Trivia::space()]),
        )];
        await_stmt.extend(expr);
        await_stmt.push(Element::token(Token::punct(";").with_trailing(vec![eol.clone()])));

        let injected = statement_element(&self.statement, indent(&body_indent), vec![eol.clone(), eol.clone()])?;
        let close_trailing = semicolon
            .and_then(|i| children[i].last_token())
            .map(|t| t.trailing.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| vec![eol.clone()]);
        let block = Node::new(
            NodeKind::Block,
            vec![
                Element::token(
                    Token::new(TokenKind::Open(Delim::Brace), "{")
                        .with_leading(indent(&member_indent))
                        .with_trailing(vec![eol.clone()]),
                ),
                injected,
                Element::node(Node::new(NodeKind::Statement, await_stmt)),
                Element::token(
                    Token::new(TokenKind::Close(Delim::Brace), "}")
                        .with_leading(indent(&member_indent))
                        .with_trailing(close_trailing),
                ),
            ],
        );

        let mut edited = children.to_vec();
        if arrow_at > 0 {
            let prev = arrow_at - 1;
            if !edited[prev].last_token().is_some_and(Token::trailing_has_end_of_line) {
                edited[prev] = edited[prev].map_last_token(|t| t.trailing = vec![eol]);
            }
        }
        let end = semicolon.map_or(arrow_at + 1, |s| s + 1);
        edited.splice(arrow_at..end, [Element::node(block)]);
        Ok(member.with_children(edited))
    }
}

impl StructuralPatch for InjectStatement {
    fn is_applied(&self, tree: &Tree) -> Result<bool, PatchError> {
        let (_, method) = self.locate(tree)?;
        let node = tree.resolve(&method)?;
        match body_of(node) {
            Body::Block(i) => {
                let block = node.child_node(i).ok_or_else(|| {
                    PatchError::Unsupported(format!("'{}' has no body", self.method))
                })?;
                Ok(guard::leading_statement_present(block, &self.marker()?))
            }
            Body::Arrow { .. } => Ok(false),
            Body::Missing => Err(PatchError::Unsupported(format!(
                "'{}.{}' has no body to inject into",
                self.target, self.method
            ))),
        }
    }

    fn apply(&self, tree: &Tree) -> Result<Tree, PatchError> {
        let (ty, method) = self.locate(tree)?;
        let style = FormattingStyle::for_type(tree, &ty)?;
        let node = tree.resolve(&method)?;
        let (edited, awaited) = match body_of(node) {
            Body::Block(i) => self.inject_into_block(node, i, &style)?,
            Body::Arrow { arrow, semicolon } => (self.convert_arrow(node, arrow, semicolon, &style)?, true),
            Body::Missing => {
                return Err(PatchError::Unsupported(format!(
                    "'{}.{}' has no body to inject into",
                    self.target, self.method
                )))
            }
        };
        let edited = if awaited { ensure_async(&edited) } else { edited };
        info!(type_name = %self.target, method = %self.method, "injected leading statement");
        Ok(tree.replace_node(&method, edited)?)
    }
}

impl ReplaceBody {
    fn locate(&self, tree: &Tree) -> Result<(NodeHandle, NodeHandle), PatchError> {
        let ty = find_type(tree, &self.target)?;
        let method = find_methods(tree, &ty, &self.method)?
            .into_iter()
            .next()
            .ok_or_else(|| LocateError::NotFound {
                what: "method",
                name: format!("{}.{}", self.target, self.method),
            })?;
        Ok((ty, method))
    }

    fn block<'t>(&self, tree: &'t Tree, method: &NodeHandle) -> Result<(NodeHandle, &'t Node), PatchError> {
        let node = tree.resolve(method)?;
        match body_of(node) {
            Body::Block(i) => {
                let handle = method.child(i);
                Ok((handle.clone(), tree.resolve(&handle)?))
            }
            _ => Err(PatchError::Unsupported(format!(
                "'{}.{}' has no block body",
                self.target, self.method
            ))),
        }
    }
}

impl StructuralPatch for ReplaceBody {
    fn is_applied(&self, tree: &Tree) -> Result<bool, PatchError> {
        let (_, method) = self.locate(tree)?;
        let (_, block) = self.block(tree, &method)?;
        let wanted = parse_statement(self.statement.trim())?.normalized_text();
        Ok(guard::body_is(block, &wanted))
    }

    fn apply(&self, tree: &Tree) -> Result<Tree, PatchError> {
        let (ty, method) = self.locate(tree)?;
        let style = FormattingStyle::for_type(tree, &ty)?;
        let member_indent = detect_indentation(tree.resolve(&method)?)
            .unwrap_or_else(|| style.member_indent.clone());
        let (handle, block) = self.block(tree, &method)?;
        let children = block.children();
        let ind = statement_positions(block)
            .first()
            .and_then(|&i| element_indentation(&children[i]))
            .unwrap_or_else(|| style.body_indent(&member_indent));

        let mut edited = vec![children[0].clone()];
        open_brace_on_own_line(&mut edited, style.line_ending);
        edited.push(statement_element(&self.statement, indent(&ind), vec![style.line_ending.trivia()])?);
        edited.push(children[children.len() - 1].clone());
        close_brace_indented(&mut edited, &member_indent);

        info!(type_name = %self.target, method = %self.method, "replaced method body");
        Ok(tree.replace_node(&handle, block.with_children(edited))?)
    }
}

impl AppendStatement {
    fn block(&self, tree: &Tree) -> Result<(NodeHandle, NodeHandle), PatchError> {
        let ty = find_type(tree, &self.target)?;
        let param_type = self.constructor.as_deref().unwrap_or(&self.target);
        let ctor = find_constructor(tree, &ty, param_type)?.ok_or_else(|| LocateError::NotFound {
            what: "copy constructor",
            name: format!("{}({param_type})", self.target),
        })?;
        let node = tree.resolve(&ctor)?;
        match body_of(node) {
            Body::Block(i) => Ok((ty, ctor.child(i))),
            _ => Err(PatchError::Unsupported(format!(
                "constructor of '{}' has no block body",
                self.target
            ))),
        }
    }
}

impl StructuralPatch for AppendStatement {
    fn is_applied(&self, tree: &Tree) -> Result<bool, PatchError> {
        let (_, block) = self.block(tree)?;
        let wanted = parse_statement(self.statement.trim())?.normalized_text();
        Ok(guard::contains_statement(tree.resolve(&block)?, &wanted))
    }

    fn apply(&self, tree: &Tree) -> Result<Tree, PatchError> {
        let (ty, handle) = self.block(tree)?;
        let style = FormattingStyle::for_type(tree, &ty)?;
        let block = tree.resolve(&handle)?;
        let mut children = block.children().to_vec();
        let eol = style.line_ending.trivia();

        match statement_positions(block).last() {
            Some(&last) => {
                let ind = element_indentation(&children[last])
                    .unwrap_or_else(|| style.body_indent(&style.member_indent));
                if !children[last].last_token().is_some_and(Token::trailing_has_end_of_line) {
                    children[last] = children[last].map_last_token(|t| t.trailing = vec![eol.clone()]);
                }
                children.insert(last + 1, statement_element(&self.statement, indent(&ind), vec![eol])?);
            }
            None => {
                let ind = style.body_indent(&style.member_indent);
                open_brace_on_own_line(&mut children, style.line_ending);
                close_brace_indented(&mut children, &style.member_indent);
                let close = children.len() - 1;
                children.insert(close, statement_element(&self.statement, indent(&ind), vec![eol])?);
            }
        }
        info!(type_name = %self.target, "appended statement to copy constructor");
        Ok(tree.replace_node(&handle, block.with_children(children))?)
    }
}
