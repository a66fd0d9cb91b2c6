//! Pre-order traversal with in-place replacement.
//!
//! [`apply`] drives a callback over every node with an explicit work list, so
//! deeply nested input cannot overflow the stack. The callback receives a
//! [`Cursor`] for the current node and decides whether the walk enters the
//! node's children. A node replaced through the cursor is swapped into its
//! parent's slot before the walk continues; returning [`Flow::Skip`] after a
//! replacement keeps the walk out of the freshly built subtree.

use crate::ast::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Visit the children of the current node (or of its replacement).
    Descend,
    Skip,
}

pub struct Cursor<'t> {
    tree: &'t mut Tree,
    parent: Option<NodeId>,
    node: NodeId,
    replacement: Option<NodeId>,
}

impl Cursor<'_> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn tree(&self) -> &Tree {
        self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        self.tree
    }

    /// Replaces the current node once the callback returns.
    pub fn replace(&mut self, new: NodeId) {
        self.replacement = Some(new);
    }
}

/// Walks the whole tree from the root.
pub fn apply<F>(tree: &mut Tree, f: F)
where
    F: FnMut(&mut Cursor<'_>) -> Flow,
{
    let root = tree.root();
    apply_from(tree, None, root, f);
}

/// Walks the subtree at `start`, whose parent is `parent`.
pub fn apply_from<F>(tree: &mut Tree, parent: Option<NodeId>, start: NodeId, mut f: F)
where
    F: FnMut(&mut Cursor<'_>) -> Flow,
{
    let mut stack = vec![(parent, start)];
    while let Some((parent, node)) = stack.pop() {
        let mut cursor = Cursor {
            tree: &mut *tree,
            parent,
            node,
            replacement: None,
        };
        let flow = f(&mut cursor);
        let replacement = cursor.replacement;

        let current = match replacement {
            Some(new) if new != node && tree.replace_child(parent, node, new) => new,
            _ => node,
        };
        if flow == Flow::Descend {
            let children = tree.children(current);
            stack.extend(children.into_iter().rev().map(|child| (Some(current), child)));
        }
    }
}

/// Read-only pre-order walk. The callback gets each node with its parent;
/// `start` itself is reported with `parent`.
pub fn visit<F>(tree: &Tree, parent: Option<NodeId>, start: NodeId, mut f: F)
where
    F: FnMut(Option<NodeId>, NodeId) -> Flow,
{
    let mut stack = vec![(parent, start)];
    while let Some((parent, node)) = stack.pop() {
        if f(parent, node) == Flow::Descend {
            let children = tree.children(node);
            stack.extend(children.into_iter().rev().map(|child| (Some(node), child)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::parser::parse;
    use crate::printer::print;

    #[test]
    fn test_visit_order_matches_source() {
        let tree = parse("package p\nfunc f() {\n\ta(b, c)\n}\n").unwrap();
        let mut idents = Vec::new();
        visit(&tree, None, tree.root(), |_, id| {
            if let Node::Ident(name) = tree.get(id) {
                idents.push(name.clone());
            }
            Flow::Descend
        });
        assert_eq!(idents, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_skip_prunes_children() {
        let tree = parse("package p\nfunc f() {\n\ta(b)\n}\n").unwrap();
        let mut seen = 0;
        visit(&tree, None, tree.root(), |_, id| {
            seen += 1;
            if matches!(tree.get(id), Node::Call { .. }) {
                Flow::Skip
            } else {
                Flow::Descend
            }
        });
        // file, func, block, expr stmt, call
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_replace_swaps_parent_slot() {
        let mut tree = parse("package p\nfunc f() {\n\ta(b)\n}\n").unwrap();
        apply(&mut tree, |cursor| {
            if matches!(cursor.tree().get(cursor.node()), Node::Ident(name) if name == "b") {
                let c = cursor.tree_mut().ident("c");
                cursor.replace(c);
                return Flow::Skip;
            }
            Flow::Descend
        });
        assert_eq!(print(&tree).unwrap(), "package p\n\nfunc f() {\n\ta(c)\n}\n");
    }

    #[test]
    fn test_descend_enters_replacement() {
        let mut tree = parse("package p\nvar v = (x)\n").unwrap();
        let mut visited_x = false;
        apply(&mut tree, |cursor| {
            match cursor.tree().get(cursor.node()) {
                Node::Paren(inner) => {
                    let inner = *inner;
                    cursor.replace(inner);
                }
                Node::Ident(name) if name == "x" => visited_x = true,
                _ => {}
            }
            Flow::Descend
        });
        // The replacement itself is not revisited, only its children.
        assert!(!visited_x);
        assert_eq!(print(&tree).unwrap(), "package p\n\nvar v = x\n");
    }
}
