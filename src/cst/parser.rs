//! Structural parser over the token stream.
//!
//! Recognition is deliberately shallow: bracket structure is exact, while
//! declarations are recognised by shape (modifiers, type keywords, a name in
//! front of a parameter list). Expressions and statements inside nested
//! braces stay as raw token/group sequences, which is all the locator needs.

use super::errors::{line_col, ParseError};
use super::lexer::lex;
use super::syntax::{
    method_shape, property_or_field_shape, skip_attributes_and_modifiers, split_separated,
    type_header,
};
use super::tree::{Delim, Element, MemberKind, Node, NodeKind, Token, TokenKind, Tree, TypeKind};

const BLOCK_STATEMENT_KEYWORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "try", "catch", "finally", "using",
    "lock", "fixed", "unsafe", "checked", "unchecked",
];

/// Statement starters after which a `) {` sequence belongs to an expression.
const EXPRESSION_STARTERS: &[&str] = &["return", "throw", "await", "yield", "new"];

/// Parse a whole compilation unit.
pub fn parse(source: &str) -> Result<Tree, ParseError> {
    let tokens = lex(source)?;
    let (elements, eof) = group(source, tokens)?;
    let mut children = members(elements);
    children.push(Element::token(eof));
    Ok(Tree::new(Node::new(NodeKind::CompilationUnit, children)))
}

/// Parse a single member declaration.
pub fn parse_member(text: &str) -> Result<Node, ParseError> {
    let elements = fragment(text)?;
    let mut chunks = split_members(elements);
    if chunks.len() != 1 {
        return Err(ParseError::Fragment {
            expected: "member",
            found: chunks.len(),
        });
    }
    Ok(classify_member(chunks.remove(0)))
}

/// Parse a single statement.
pub fn parse_statement(text: &str) -> Result<Node, ParseError> {
    let elements = fragment(text)?;
    let mut chunks = split_statements(elements);
    if chunks.len() != 1 {
        return Err(ParseError::Fragment {
            expected: "statement",
            found: chunks.len(),
        });
    }
    Ok(Node::new(NodeKind::Statement, chunks.remove(0)))
}

/// Parse an expression (or any token run) into top-level elements.
pub fn parse_expression(text: &str) -> Result<Vec<Element>, ParseError> {
    fragment(text)
}

/// Parse a single formal parameter such as `bool isolatedContext = true`.
pub fn parse_parameter(text: &str) -> Result<Node, ParseError> {
    let elements = fragment(text)?;
    let (items, _) = split_separated(&elements);
    if items.len() != 1 {
        return Err(ParseError::Fragment {
            expected: "parameter",
            found: items.len(),
        });
    }
    Ok(parameter(elements))
}

fn fragment(text: &str) -> Result<Vec<Element>, ParseError> {
    let tokens = lex(text)?;
    let (mut elements, eof) = group(text, tokens)?;
    let Some(last) = elements.pop() else {
        return Err(ParseError::Fragment {
            expected: "token",
            found: 0,
        });
    };
    let last = last.map_last_token(|t| t.trailing.extend(eof.leading));
    elements.push(last);
    Ok(elements)
}

/// Nest tokens into bracket groups. Returns the top-level elements and the
/// end-of-file token.
fn group(source: &str, tokens: Vec<Token>) -> Result<(Vec<Element>, Token), ParseError> {
    struct Open {
        token: Token,
        delim: Delim,
        offset: usize,
        outer: Vec<Element>,
    }

    let mut stack: Vec<Open> = Vec::new();
    let mut current: Vec<Element> = Vec::new();
    let mut offset = 0usize;
    let mut eof = Token::new(TokenKind::EndOfFile, "");

    for token in tokens {
        let leading: usize = token.leading.iter().map(|t| t.text.len()).sum();
        let trailing: usize = token.trailing.iter().map(|t| t.text.len()).sum();
        let token_offset = offset + leading;
        offset = token_offset + token.text.len() + trailing;

        match token.kind {
            TokenKind::Open(delim) => stack.push(Open {
                token,
                delim,
                offset: token_offset,
                outer: std::mem::take(&mut current),
            }),
            TokenKind::Close(delim) => {
                let Some(open) = stack.pop() else {
                    let (line, column) = line_col(source, token_offset);
                    return Err(ParseError::UnmatchedClose {
                        found: token.text,
                        line,
                        column,
                    });
                };
                if open.delim != delim {
                    let (open_line, open_column) = line_col(source, open.offset);
                    let (line, column) = line_col(source, token_offset);
                    return Err(ParseError::MismatchedDelimiter {
                        open: open.token.text,
                        close: token.text,
                        open_line,
                        open_column,
                        line,
                        column,
                    });
                }
                let inner = std::mem::replace(&mut current, open.outer);
                let mut children = Vec::with_capacity(inner.len() + 2);
                children.push(Element::token(open.token));
                children.extend(inner);
                children.push(Element::token(token));
                current.push(Element::node(Node::new(NodeKind::Group(delim), children)));
            }
            TokenKind::EndOfFile => eof = token,
            _ => current.push(Element::token(token)),
        }
    }

    if let Some(open) = stack.pop() {
        let (line, column) = line_col(source, open.offset);
        return Err(ParseError::UnclosedDelimiter {
            open: open.token.text,
            line,
            column,
        });
    }
    Ok((current, eof))
}

/// Split a member-level sequence into declaration chunks. A chunk ends at a
/// top-level `;`, or at a brace group that is a body rather than an
/// initializer value.
fn split_members(elements: Vec<Element>) -> Vec<Vec<Element>> {
    let mut chunks = Vec::new();
    let mut chunk: Vec<Element> = Vec::new();
    let mut seen_assign = false;
    let mut iter = elements.into_iter().peekable();

    while let Some(e) = iter.next() {
        let ends = if e.is_punct(";") {
            true
        } else if e.is_punct("=") || e.is_punct("=>") {
            seen_assign = true;
            false
        } else if e.is_group(Delim::Brace) && !seen_assign {
            // `int X { get; set; } = 1;` continues into the initializer
            !iter.peek().is_some_and(|n| n.is_punct("="))
        } else {
            false
        };
        chunk.push(e);
        if ends {
            chunks.push(std::mem::take(&mut chunk));
            seen_assign = false;
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

/// Classify member chunks. A file-scoped namespace absorbs every member
/// after it.
fn members(elements: Vec<Element>) -> Vec<Element> {
    let mut out = Vec::new();
    let mut chunks = split_members(elements).into_iter();
    while let Some(chunk) = chunks.next() {
        let node = classify_member(chunk);
        let file_scoped = node.kind() == NodeKind::Namespace
            && node.children().last().is_some_and(|e| e.is_punct(";"));
        if file_scoped {
            let mut children = node.children().to_vec();
            children.extend(chunks.by_ref().map(|c| Element::node(classify_member(c))));
            out.push(Element::node(node.with_children(children)));
            break;
        }
        out.push(Element::node(node));
    }
    out
}

fn classify_member(mut chunk: Vec<Element>) -> Node {
    let start = skip_attributes_and_modifiers(&chunk);
    let Some(first) = chunk.get(start) else {
        return Node::new(NodeKind::Member(MemberKind::Other), chunk);
    };

    if first.is_keyword("namespace") {
        return namespace(chunk);
    }
    let is_directive = first.is_keyword("using")
        || first.is_keyword("extern")
        || (first.identifier_name() == Some("global")
            && chunk.get(start + 1).is_some_and(|e| e.is_keyword("using")));
    if is_directive || chunk.iter().any(|e| e.is_keyword("delegate")) {
        return Node::new(NodeKind::Member(MemberKind::Other), chunk);
    }
    if let Some((kind, _)) = type_header(&chunk, start) {
        if kind != TypeKind::Enum {
            if let Some(body) = chunk.iter().rposition(|e| e.is_group(Delim::Brace)) {
                chunk[body] = convert_group(&chunk[body], NodeKind::MemberList, members);
            }
        }
        return Node::new(NodeKind::Type(kind), chunk);
    }
    if let Some((_, name_at, params_at)) = method_shape(&chunk, start) {
        let constructor = name_at == start || chunk[start].is_punct("~");
        let kind = if constructor {
            MemberKind::Constructor
        } else {
            MemberKind::Method
        };
        return method(chunk, kind, params_at);
    }
    let (kind, _) = property_or_field_shape(&chunk, start);
    Node::new(NodeKind::Member(kind), chunk)
}

fn namespace(mut chunk: Vec<Element>) -> Node {
    if let Some(body) = chunk.iter().rposition(|e| e.is_group(Delim::Brace)) {
        chunk[body] = convert_group(&chunk[body], NodeKind::MemberList, members);
    }
    Node::new(NodeKind::Namespace, chunk)
}

fn method(mut chunk: Vec<Element>, kind: MemberKind, params_at: usize) -> Node {
    chunk[params_at] = convert_group(&chunk[params_at], NodeKind::ParameterList, parameters);

    let body_brace = chunk
        .iter()
        .rposition(|e| e.is_group(Delim::Brace))
        .filter(|&i| i > params_at);
    if let Some(body) = body_brace {
        chunk[body] = convert_group(&chunk[body], NodeKind::Block, statements);
    } else if let Some(arrow) = chunk[params_at..]
        .iter()
        .position(|e| e.is_punct("=>"))
        .map(|i| i + params_at)
    {
        let end = if chunk.last().is_some_and(|e| e.is_punct(";")) {
            chunk.len() - 1
        } else {
            chunk.len()
        };
        let body: Vec<Element> = chunk.drain(arrow..end).collect();
        chunk.insert(arrow, Element::node(Node::new(NodeKind::ArrowBody, body)));
    }
    Node::new(NodeKind::Member(kind), chunk)
}

/// Re-shape a bracket group as `kind`, re-chunking its inner elements.
fn convert_group(
    group: &Element,
    kind: NodeKind,
    inner: fn(Vec<Element>) -> Vec<Element>,
) -> Element {
    let Some(node) = group.as_node() else {
        return group.clone();
    };
    let children = node.children();
    if children.len() < 2 {
        return group.clone();
    }
    let open = children[0].clone();
    let close = children[children.len() - 1].clone();
    let mut out = vec![open];
    out.extend(inner(children[1..children.len() - 1].to_vec()));
    out.push(close);
    Element::node(Node::new(kind, out))
}

fn parameters(elements: Vec<Element>) -> Vec<Element> {
    let (items, separators) = split_separated(&elements);
    let mut out = Vec::with_capacity(items.len() + separators.len());
    for (i, range) in items.into_iter().enumerate() {
        out.push(Element::node(parameter(elements[range].to_vec())));
        if let Some(&sep) = separators.get(i) {
            out.push(elements[sep].clone());
        }
    }
    out
}

fn parameter(elements: Vec<Element>) -> Node {
    Node::new(NodeKind::Parameter, elements)
}

fn statements(elements: Vec<Element>) -> Vec<Element> {
    split_statements(elements)
        .into_iter()
        .map(|c| Element::node(Node::new(NodeKind::Statement, c)))
        .collect()
}

/// Split a block's contents into statements.
fn split_statements(elements: Vec<Element>) -> Vec<Vec<Element>> {
    let mut chunks = Vec::new();
    let mut chunk: Vec<Element> = Vec::new();
    let mut seen_assign = false;

    for e in elements {
        let ends = if e.is_punct(";") {
            true
        } else if e.is_punct("=") || e.is_punct("=>") {
            seen_assign = true;
            false
        } else if e.is_group(Delim::Brace) {
            statement_ends_at_brace(&chunk, seen_assign)
        } else {
            false
        };
        chunk.push(e);
        if ends {
            chunks.push(std::mem::take(&mut chunk));
            seen_assign = false;
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

fn statement_ends_at_brace(chunk: &[Element], seen_assign: bool) -> bool {
    let Some(first) = chunk.first() else {
        return true;
    };
    if seen_assign {
        return false;
    }
    let first_text = first.as_token().map(|t| t.text.as_str()).unwrap_or("");
    if first.as_token().is_some_and(|t| t.kind == TokenKind::Keyword)
        && BLOCK_STATEMENT_KEYWORDS.contains(&first_text)
    {
        return true;
    }
    // local function body
    !EXPRESSION_STARTERS.contains(&first_text)
        && chunk.last().is_some_and(|e| e.is_group(Delim::Paren))
}
