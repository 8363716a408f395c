//! Editing comma-separated lists in place: argument lists, parameter lists
//! and brace initializers.
//!
//! New items copy the trivia of their neighbours so that a multi-line list
//! stays multi-line and a trailing-comma list keeps its trailing comma.

use crate::cst::syntax::split_separated;
use crate::cst::{Element, Node, Token, Trivia};

/// Items of a bracketed list, as index ranges into the node's children.
struct Separated {
    items: Vec<std::ops::Range<usize>>,
    separators: Vec<usize>,
    close: usize,
}

impl Separated {
    fn of(node: &Node) -> Option<Self> {
        let children = node.children();
        if children.len() < 2 {
            return None;
        }
        let close = children.len() - 1;
        let (items, separators) = split_separated(&children[1..close]);
        Some(Self {
            items: items.into_iter().map(|r| r.start + 1..r.end + 1).collect(),
            separators: separators.into_iter().map(|s| s + 1).collect(),
            close,
        })
    }

    fn has_trailing_separator(&self) -> bool {
        match (self.items.last(), self.separators.last()) {
            (Some(item), Some(&sep)) => sep >= item.end,
            _ => false,
        }
    }
}

/// Item element runs of a bracketed list.
pub fn items(node: &Node) -> Vec<&[Element]> {
    let Some(list) = Separated::of(node) else {
        return Vec::new();
    };
    list.items
        .iter()
        .map(|r| &node.children()[r.clone()])
        .filter(|item| !item.is_empty())
        .collect()
}

fn set_leading(item: &mut [Element], leading: Vec<Trivia>) {
    if let Some(first) = item.first_mut() {
        *first = first.map_first_token(|t| t.leading = leading);
    }
}

fn set_trailing(item: &mut [Element], trailing: Vec<Trivia>) {
    if let Some(last) = item.last_mut() {
        *last = last.map_last_token(|t| t.trailing = trailing);
    }
}

fn leading_of(elements: &[Element]) -> Vec<Trivia> {
    elements
        .first()
        .and_then(Element::first_token)
        .map(|t| t.leading.clone())
        .unwrap_or_default()
}

fn trailing_of(element: &Element) -> Vec<Trivia> {
    element
        .last_token()
        .map(|t| t.trailing.clone())
        .unwrap_or_default()
}

/// Append `item` at the end of a bracketed list.
///
/// The item takes the last item's leading trivia and the new comma takes the
/// last comma's trailing trivia (`separator_default` when the list has no
/// comma yet). A list ending in a comma gets `item,`; otherwise `, item` is
/// inserted and the old last item's trailing trivia moves after the new one.
pub fn append_item(node: &Node, mut item: Vec<Element>, separator_default: Vec<Trivia>) -> Node {
    let Some(list) = Separated::of(node) else {
        return node.clone();
    };
    let mut children = node.children().to_vec();
    let Some(last) = list.items.last().filter(|r| !r.is_empty()).cloned() else {
        set_leading(&mut item, Vec::new());
        set_trailing(&mut item, Vec::new());
        children.splice(list.close..list.close, item);
        return node.with_children(children);
    };

    set_leading(&mut item, leading_of(&children[last.clone()]));
    let separator_trailing = list
        .separators
        .last()
        .map(|&s| trailing_of(&children[s]))
        .unwrap_or(separator_default);
    let separator = Element::token(Token::punct(",").with_trailing(separator_trailing));

    if list.has_trailing_separator() {
        set_trailing(&mut item, Vec::new());
        let mut inserted = item;
        inserted.push(separator);
        children.splice(list.close..list.close, inserted);
    } else {
        let last_at = last.end - 1;
        let moved = trailing_of(&children[last_at]);
        children[last_at] = children[last_at].map_last_token(|t| t.trailing.clear());
        set_trailing(&mut item, moved);
        let mut inserted = vec![separator];
        inserted.extend(item);
        children.splice(last.end..last.end, inserted);
    }
    node.with_children(children)
}

/// Insert `item` before the first entry of a bracketed list. The item copies
/// the first entry's leading trivia; its comma is followed by
/// `separator_trailing`.
pub fn prepend_item(node: &Node, mut item: Vec<Element>, separator_trailing: Vec<Trivia>) -> Node {
    let Some(list) = Separated::of(node) else {
        return node.clone();
    };
    let mut children = node.children().to_vec();
    let Some(first) = list.items.first().filter(|r| !r.is_empty()).cloned() else {
        set_leading(&mut item, Vec::new());
        set_trailing(&mut item, Vec::new());
        children.splice(list.close..list.close, item);
        return node.with_children(children);
    };

    set_leading(&mut item, leading_of(&children[first.clone()]));
    set_trailing(&mut item, Vec::new());
    item.push(Element::token(Token::punct(",").with_trailing(separator_trailing)));
    children.splice(first.start..first.start, item);
    node.with_children(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::parse_expression;

    fn group(text: &str) -> Node {
        let elems = parse_expression(text).unwrap();
        elems[0].as_node().unwrap().clone()
    }

    fn entry(text: &str) -> Vec<Element> {
        parse_expression(text).unwrap()
    }

    #[test]
    fn append_single_line() {
        let node = append_item(&group("(expression, arg)"), entry("flag: flag"), vec![Trivia::space()]);
        assert_eq!(node.text(), "(expression, arg, flag: flag)");
        let node = append_item(&group("(x)"), entry("flag: flag"), vec![Trivia::space()]);
        assert_eq!(node.text(), "(x, flag: flag)");
        let node = append_item(&group("()"), entry(" flag: flag "), vec![Trivia::space()]);
        assert_eq!(node.text(), "(flag: flag)");
    }

    #[test]
    fn append_multiline_with_trailing_comma() {
        let src = "{\r\n    [\"a\"] = a,\r\n    [\"b\"] = b,\r\n}";
        let node = append_item(&group(src), entry("[\"c\"] = c"), vec![Trivia::space()]);
        assert_eq!(
            node.text(),
            "{\r\n    [\"a\"] = a,\r\n    [\"b\"] = b,\r\n    [\"c\"] = c,\r\n}"
        );
    }

    #[test]
    fn append_multiline_without_trailing_comma() {
        let src = "{\n    [\"a\"] = a,\n    [\"b\"] = b\n}";
        let node = append_item(&group(src), entry("[\"c\"] = c"), vec![Trivia::space()]);
        assert_eq!(node.text(), "{\n    [\"a\"] = a,\n    [\"b\"] = b,\n    [\"c\"] = c\n}");
    }

    #[test]
    fn prepend_multiline() {
        let src = "{\n    [\"a\"] = a,\n}";
        let node = prepend_item(&group(src), entry("[\"k\"] = v"), vec![Trivia::end_of_line("\n")]);
        assert_eq!(node.text(), "{\n    [\"k\"] = v,\n    [\"a\"] = a,\n}");
    }

    #[test]
    fn prepend_single_line() {
        let node = prepend_item(&group("{ A = 1 }"), entry("K = v"), vec![Trivia::space()]);
        assert_eq!(node.text(), "{ K = v, A = 1 }");
    }
}
