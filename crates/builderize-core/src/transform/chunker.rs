//! Splits string literals into bounded chunks.
//!
//! Chunk boundaries fall between *units*: a single character, or a whole
//! escape sequence in an interpreted literal. A chunk therefore never ends
//! in the middle of `\n` or `é`, and every chunk is itself a valid
//! literal whose value is the matching slice of the original value.

use crate::ast::{BinaryOp, LitKind, Node, NodeId, Tree};

/// Splits literal content (delimiters removed) into units.
pub fn split_units(content: &str, raw: bool) -> Vec<&str> {
    let mut units = Vec::new();
    let mut rest = content;
    while let Some(ch) = rest.chars().next() {
        let mut len = if ch == '\\' && !raw {
            match rest[1..].chars().next() {
                Some('x') => 4,
                Some('u') => 6,
                Some('U') => 10,
                Some('0'..='7') => 4,
                Some(other) => 1 + other.len_utf8(),
                None => 1,
            }
        } else {
            ch.len_utf8()
        };
        len = len.min(rest.len());
        while !rest.is_char_boundary(len) {
            len += 1;
        }
        units.push(&rest[..len]);
        rest = &rest[len..];
    }
    units
}

pub fn unit_count(content: &str, raw: bool) -> usize {
    split_units(content, raw).len()
}

/// Windows of at most `bound` units, in order. Empty content yields one
/// empty chunk.
pub fn chunk_text(content: &str, bound: usize, raw: bool) -> Vec<String> {
    let units = split_units(content, raw);
    if units.is_empty() {
        return vec![String::new()];
    }
    units
        .chunks(bound.max(1))
        .map(|window| window.concat())
        .collect()
}

/// Delimiter and content of a string literal node.
fn literal_parts(node: &Node) -> Option<(LitKind, &str)> {
    let Node::BasicLit { kind, value } = node else {
        return None;
    };
    if !kind.is_string() || value.len() < 2 {
        return None;
    }
    Some((*kind, &value[1..value.len() - 1]))
}

/// Whether chunking `lit` at `bound` would produce more than one literal.
pub fn would_split(tree: &Tree, lit: NodeId, bound: usize) -> bool {
    literal_parts(tree.get(lit))
        .is_some_and(|(kind, content)| unit_count(content, kind == LitKind::RawString) > bound)
}

/// Replaces a string literal by a left-nested `+` chain of its chunks.
/// Returns `lit` itself when it fits in one chunk or is not a string.
pub fn chunk_literal(tree: &mut Tree, lit: NodeId, bound: usize) -> NodeId {
    let Some((kind, content)) = literal_parts(tree.get(lit)) else {
        return lit;
    };
    let raw = kind == LitKind::RawString;
    let chunks = chunk_text(content, bound, raw);
    if chunks.len() <= 1 {
        return lit;
    }

    let quote = if raw { '`' } else { '"' };
    let mut pieces = chunks.into_iter().map(|chunk| {
        tree.alloc(Node::BasicLit {
            kind,
            value: format!("{quote}{chunk}{quote}"),
        })
    });
    let Some(first) = pieces.next() else {
        return lit;
    };
    let rest: Vec<NodeId> = pieces.collect();
    rest.into_iter()
        .fold(first, |acc, piece| tree.binary(BinaryOp::Add, acc, piece))
}
