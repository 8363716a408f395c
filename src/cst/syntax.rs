//! Shape helpers over flat element sequences.

use std::ops::Range;

use super::tree::{Delim, Element, MemberKind, NodeKind, TokenKind, TypeKind};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "async", "override", "virtual",
    "abstract", "sealed", "readonly", "extern", "unsafe", "new", "partial", "const", "volatile",
    "required", "file",
];

const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "char", "decimal", "double", "float", "int", "long", "object", "sbyte",
    "short", "string", "uint", "ulong", "ushort", "void",
];

pub fn is_modifier(text: &str) -> bool {
    MODIFIERS.contains(&text)
}

pub fn is_modifier_element(e: &Element) -> bool {
    e.as_token().is_some_and(|t| {
        matches!(t.kind, TokenKind::Keyword | TokenKind::Identifier) && is_modifier(&t.text)
    })
}

/// Index of the first element after leading attribute lists and modifiers.
pub fn skip_attributes_and_modifiers(elems: &[Element]) -> usize {
    let mut i = 0;
    while i < elems.len() && elems[i].is_group(Delim::Bracket) {
        i += 1;
    }
    while i < elems.len() && is_modifier_element(&elems[i]) {
        // `partial class` / `partial void` keep `partial` a modifier; a
        // lone identifier followed by `(` is a name, not a modifier.
        if elems.get(i + 1).is_some_and(|n| n.is_group(Delim::Paren)) {
            break;
        }
        i += 1;
    }
    i
}

fn is_type_argument_element(e: &Element) -> bool {
    match e {
        Element::Token(t) => match t.kind {
            TokenKind::Identifier => true,
            TokenKind::Keyword => PREDEFINED_TYPES.contains(&t.text.as_str()),
            TokenKind::Punct => matches!(t.text.as_str(), "," | "." | "?" | "::" | "*"),
            _ => false,
        },
        Element::Node(_) => matches!(e.group(), Some(Delim::Bracket | Delim::Paren)),
    }
}

/// Index of the `>` closing a type argument list opened at `open`, when the
/// `<` follows a name and everything up to the closer is type-shaped.
pub fn angle_close(elems: &[Element], open: usize) -> Option<usize> {
    if !elems.get(open)?.is_punct("<") || open == 0 || elems[open - 1].identifier_name().is_none() {
        return None;
    }
    let mut depth = 1usize;
    for (j, e) in elems.iter().enumerate().skip(open + 1) {
        if e.is_punct("<") {
            depth += 1;
        } else if e.is_punct(">") {
            depth -= 1;
            if depth == 0 {
                return Some(j);
            }
        } else if !is_type_argument_element(e) {
            return None;
        }
    }
    None
}

/// Index of the `<` opening the type argument list closed at `close`.
pub fn angle_open(elems: &[Element], close: usize) -> Option<usize> {
    if !elems.get(close)?.is_punct(">") {
        return None;
    }
    let mut depth = 1usize;
    for j in (0..close).rev() {
        let e = &elems[j];
        if e.is_punct(">") {
            depth += 1;
        } else if e.is_punct("<") {
            depth -= 1;
            if depth == 0 {
                return (j > 0 && elems[j - 1].identifier_name().is_some()).then_some(j);
            }
        } else if !is_type_argument_element(e) {
            return None;
        }
    }
    None
}

/// Items and separator positions of a comma-separated sequence. Commas inside
/// a generic argument list do not separate.
pub fn split_separated(elems: &[Element]) -> (Vec<Range<usize>>, Vec<usize>) {
    let mut items = Vec::new();
    let mut separators = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < elems.len() {
        if let Some(close) = angle_close(elems, i) {
            i = close + 1;
            continue;
        }
        if elems[i].is_punct(",") {
            items.push(start..i);
            separators.push(i);
            start = i + 1;
        }
        i += 1;
    }
    if start < elems.len() {
        items.push(start..elems.len());
    }
    (items, separators)
}

/// Position of the first top-level token `text` in `elems`.
pub fn find_punct(elems: &[Element], text: &str) -> Option<usize> {
    elems.iter().position(|e| e.is_punct(text))
}

/// Name a node of `kind` declares, read back from its children.
pub fn declared_name(kind: NodeKind, children: &[Element]) -> Option<String> {
    let start = skip_attributes_and_modifiers(children);
    match kind {
        NodeKind::Namespace => Some(namespace_name(children, start)),
        NodeKind::Type(_) => type_header(children, start).map(|(_, name)| name),
        NodeKind::Member(MemberKind::Method | MemberKind::Constructor) => {
            method_shape(children, start).map(|(name, _, _)| name)
        }
        NodeKind::Member(MemberKind::Property | MemberKind::Field) => {
            property_or_field_shape(children, start).1
        }
        NodeKind::Parameter => parameter_name(children),
        _ => None,
    }
}

/// Dotted name after the `namespace` keyword at `start`.
pub fn namespace_name(chunk: &[Element], start: usize) -> String {
    chunk
        .get(start + 1..)
        .unwrap_or_default()
        .iter()
        .map_while(Element::as_token)
        .take_while(|t| !t.is_punct(";"))
        .map(|t| t.text.as_str())
        .collect()
}

/// Kind and name of a type declaration starting at `start`.
pub fn type_header(chunk: &[Element], start: usize) -> Option<(TypeKind, String)> {
    for (j, e) in chunk.iter().enumerate().skip(start) {
        let token = e.as_token()?;
        if ["=", "=>", ";", ":"].iter().any(|p| token.is_punct(p)) {
            return None;
        }
        let kind = match (token.kind, token.text.as_str()) {
            (TokenKind::Keyword, "class") => TypeKind::Class,
            (TokenKind::Keyword, "struct") => TypeKind::Struct,
            (TokenKind::Keyword, "interface") => TypeKind::Interface,
            (TokenKind::Keyword, "enum") => TypeKind::Enum,
            (TokenKind::Identifier, "record") => TypeKind::Record,
            _ => continue,
        };
        let mut name_at = j + 1;
        if kind == TypeKind::Record
            && chunk
                .get(name_at)
                .is_some_and(|n| n.is_keyword("class") || n.is_keyword("struct"))
        {
            name_at += 1;
        }
        return chunk
            .get(name_at)
            .and_then(Element::identifier_name)
            .map(|name| (kind, name.to_string()));
    }
    None
}

fn is_parameters(e: &Element) -> bool {
    e.is_group(Delim::Paren) || e.as_node().is_some_and(|n| n.kind() == NodeKind::ParameterList)
}

/// Locate `name(params)` in a declaration: returns the name, its index and
/// the index of the parameter list.
pub fn method_shape(chunk: &[Element], start: usize) -> Option<(String, usize, usize)> {
    for (j, e) in chunk.iter().enumerate().skip(start) {
        if e.is_punct("=") || e.is_punct("=>") || e.is_group(Delim::Brace) {
            return None;
        }
        if !is_parameters(e) || j == start {
            continue;
        }
        let prev = j - 1;
        let name_at = if chunk[prev].is_punct(">") {
            match angle_open(chunk, prev) {
                Some(open) => open - 1,
                None => continue,
            }
        } else {
            prev
        };
        if let Some(name) = chunk[name_at].identifier_name() {
            return Some((name.to_string(), name_at, j));
        }
        if prev > 0 && chunk[prev - 1].is_keyword("operator") {
            let op = chunk[prev].as_token().map(|t| t.text.clone()).unwrap_or_default();
            return Some((format!("operator{op}"), prev, j));
        }
    }
    None
}

/// Property when a `{` accessor list or `=>` comes before any `=`, field
/// otherwise; `Other` when no name is found.
pub fn property_or_field_shape(chunk: &[Element], start: usize) -> (MemberKind, Option<String>) {
    let assign = chunk.iter().position(|e| e.is_punct("="));
    let before_assign = chunk.get(start..assign.unwrap_or(chunk.len())).unwrap_or_default();
    let body = before_assign
        .iter()
        .position(|e| e.is_group(Delim::Brace) || e.is_punct("=>"))
        .map(|i| i + start);

    let (kind, name_end) = match body {
        Some(i) => (MemberKind::Property, Some(i)),
        None => {
            let end = chunk
                .get(start..)
                .unwrap_or_default()
                .iter()
                .position(|e| e.is_punct("=") || e.is_punct(";") || e.is_punct(","))
                .map(|i| i + start);
            (MemberKind::Field, end)
        }
    };
    let name = name_end.filter(|&i| i > start).and_then(|i| {
        let prev = &chunk[i - 1];
        if prev.is_group(Delim::Bracket) && i >= 2 && chunk[i - 2].is_keyword("this") {
            Some("this".to_string())
        } else {
            prev.identifier_name().map(str::to_string)
        }
    });
    match name {
        Some(_) => (kind, name),
        None => (MemberKind::Other, None),
    }
}

/// Last identifier before any `= default`.
pub fn parameter_name(elements: &[Element]) -> Option<String> {
    let end = find_punct(elements, "=").unwrap_or(elements.len());
    elements[..end]
        .iter()
        .rev()
        .find_map(Element::identifier_name)
        .map(str::to_string)
}
