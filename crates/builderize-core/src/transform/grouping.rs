use super::Pass;
use crate::ast::{Node, Tree};
use crate::walk::{apply, Flow};

/// Replaces every grouping node by the expression it wraps. The printer
/// puts back the parentheses that precedence or position still needs.
pub struct GroupingPass;

impl Pass for GroupingPass {
    fn name(&self) -> &'static str {
        "grouping"
    }

    /// Returns the number of parenthesis pairs removed.
    fn run(&mut self, tree: &mut Tree) -> usize {
        let mut removed = 0;
        apply(tree, |cursor| {
            let mut inner = cursor.node();
            let mut layers = 0;
            while let Node::Paren(wrapped) = cursor.tree().get(inner) {
                inner = *wrapped;
                layers += 1;
            }
            if layers > 0 {
                removed += layers;
                cursor.replace(inner);
            }
            Flow::Descend
        });
        removed
    }
}
