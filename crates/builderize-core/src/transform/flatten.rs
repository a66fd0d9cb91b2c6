use super::chunker::chunk_literal;
use crate::ast::{BinaryOp, Node, NodeId, Tree};

/// Operands of a `+` chain, left to right. Any node that is not an
/// addition is a single operand; grouping nodes are not looked through.
pub fn flatten(tree: &Tree, expr: NodeId) -> Vec<NodeId> {
    let mut operands = Vec::new();
    let mut stack = vec![expr];
    while let Some(id) = stack.pop() {
        match tree.get(id) {
            Node::Binary {
                op: BinaryOp::Add,
                x,
                y,
            } => {
                stack.push(*y);
                stack.push(*x);
            }
            _ => operands.push(id),
        }
    }
    operands
}

/// Left fold of `operands` into `+` nodes.
pub fn rebuild(tree: &mut Tree, operands: &[NodeId]) -> Option<NodeId> {
    let (&first, rest) = operands.split_first()?;
    Some(
        rest.iter()
            .fold(first, |acc, &next| tree.binary(BinaryOp::Add, acc, next)),
    )
}

/// Flattens `expr`, replaces every string literal operand by its chunks and
/// rebuilds the chain.
pub fn process_concat(tree: &mut Tree, expr: NodeId, chunk_size: usize) -> NodeId {
    let mut operands = Vec::new();
    for operand in flatten(tree, expr) {
        let chunked = chunk_literal(tree, operand, chunk_size);
        if chunked == operand {
            operands.push(operand);
        } else {
            operands.extend(flatten(tree, chunked));
        }
    }
    rebuild(tree, &operands).unwrap_or(expr)
}
