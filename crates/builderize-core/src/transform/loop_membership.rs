use crate::ast::{Node, NodeId, Tree};
use rustc_hash::FxHashSet;

/// Nodes lexically inside the body of some loop, computed once from the
/// tree before any rewrite. Loop headers are outside; the body block and
/// everything under it, nested function literals included, are inside.
#[derive(Debug, Default)]
pub struct LoopMembership {
    inside: FxHashSet<NodeId>,
}

impl LoopMembership {
    pub fn build(tree: &Tree) -> Self {
        let mut inside = FxHashSet::default();
        let mut stack = vec![(tree.root(), false)];
        while let Some((id, in_loop)) = stack.pop() {
            if in_loop {
                inside.insert(id);
            }
            let node = tree.get(id);
            let body = match node {
                Node::For { body, .. } => Some(*body),
                _ => None,
            };
            for child in node.children() {
                stack.push((child, in_loop || Some(child) == body));
            }
        }
        Self { inside }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.inside.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.inside.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inside.is_empty()
    }
}
