use super::chunker::would_split;
use super::flatten::{flatten, process_concat};
use super::Pass;
use crate::ast::{BinaryOp, Node, Tree};
use crate::walk::{apply, Flow};
use tracing::debug;

/// Re-chunks `+` chains made only of string literals, wherever they occur.
/// Chains whose literals already fit the bound are left untouched.
pub struct PureLiteralPass {
    chunk_size: usize,
}

impl PureLiteralPass {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Pass for PureLiteralPass {
    fn name(&self) -> &'static str {
        "pure-literal-concat"
    }

    fn run(&mut self, tree: &mut Tree) -> usize {
        let chunk_size = self.chunk_size;
        let mut rewrites = 0;
        apply(tree, |cursor| {
            let node = cursor.node();
            if !matches!(
                cursor.tree().get(node),
                Node::Binary {
                    op: BinaryOp::Add,
                    ..
                }
            ) {
                return Flow::Descend;
            }

            let operands = flatten(cursor.tree(), node);
            if !operands
                .iter()
                .all(|&operand| cursor.tree().get(operand).is_string_lit())
            {
                return Flow::Descend;
            }
            if !operands
                .iter()
                .any(|&operand| would_split(cursor.tree(), operand, chunk_size))
            {
                return Flow::Skip;
            }

            let replacement = process_concat(cursor.tree_mut(), node, chunk_size);
            debug!(operands = operands.len(), "re-chunked literal concatenation");
            rewrites += 1;
            cursor.replace(replacement);
            Flow::Skip
        });
        rewrites
    }
}
