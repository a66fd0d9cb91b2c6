//! Hoists concatenation out of loops.
//!
//! For each plain name `x` that a loop body extends with `x += E`, the loop is
//! wrapped in a block that declares one accumulator before it and folds the
//! accumulated text back into `x` after it:
//!
//! ```go
//! {
//!     var xBuilder strings.Builder
//!     for ... {
//!         xBuilder.WriteString(E)
//!     }
//!     x = x + xBuilder.String()
//! }
//! ```
//!
//! Several names nest one block per name, first name innermost. Names
//! declared inside the loop are left alone: their accumulator and final
//! assignment would sit outside the name's scope. Function literal bodies
//! run at unknown times and are not scanned.

use super::flatten::process_concat;
use super::{assign_to, Accumulator, ConcatSite, Pass, STRINGS_BUILDER};
use crate::ast::{AssignOp, BinaryOp, ForHeader, Node, NodeId, Tree};
use crate::walk::{apply, visit, Flow};
use rustc_hash::FxHashSet;
use tracing::debug;

pub struct LoopConcatPass {
    chunk_size: usize,
    accumulator: Accumulator,
}

impl LoopConcatPass {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            accumulator: STRINGS_BUILDER,
        }
    }

    /// Rewrites the loop `for_node`, reached through `wrapped` (the loop
    /// itself or the label naming it). Returns the replacement for
    /// `wrapped`, or `None` when the body has no eligible target.
    fn rewrite_loop(&self, tree: &mut Tree, wrapped: NodeId, for_node: NodeId) -> Option<NodeId> {
        let Node::For { body, .. } = tree.get(for_node) else {
            return None;
        };
        let body = *body;

        let declared = declared_names(tree, for_node);
        let mut targets: Vec<String> = Vec::new();
        let mut sites: Vec<(NodeId, NodeId, String, NodeId)> = Vec::new();
        visit(tree, Some(for_node), body, |parent, id| {
            if matches!(tree.get(id), Node::FuncLit { .. }) {
                return Flow::Skip;
            }
            let Some(site) = ConcatSite::at(tree, parent, id) else {
                return Flow::Descend;
            };
            if declared.contains(&site.target) {
                return Flow::Skip;
            }
            if let Some(parent) = parent {
                if !targets.contains(&site.target) {
                    targets.push(site.target.clone());
                }
                sites.push((parent, id, site.target, site.value));
            }
            Flow::Skip
        });
        if targets.is_empty() {
            return None;
        }

        let acc = self.accumulator;
        for (parent, id, target, value) in sites {
            let binding = acc.binding_name(&target);
            let value = process_concat(tree, value, self.chunk_size);
            let append = acc.append(tree, &binding, value);
            tree.replace_child(Some(parent), id, append);
        }

        let mut wrapped = wrapped;
        for target in &targets {
            let binding = acc.binding_name(target);
            let declare = acc.declare(tree, &binding);
            let current = tree.ident(target.as_str());
            let done = acc.finalize(tree, &binding);
            let joined = tree.binary(BinaryOp::Add, current, done);
            let finish = assign_to(tree, target, joined);
            wrapped = tree.block(vec![declare, wrapped, finish]);
            debug!(variable = %target, "hoisted loop concatenation");
        }
        Some(wrapped)
    }
}

impl Pass for LoopConcatPass {
    fn name(&self) -> &'static str {
        "loop-concat"
    }

    fn run(&mut self, tree: &mut Tree) -> usize {
        let mut loops = 0;
        apply(tree, |cursor| {
            let node = cursor.node();
            let for_node = match cursor.tree().get(node) {
                // A labeled loop is handled at its label.
                Node::For { .. }
                    if cursor
                        .parent()
                        .is_some_and(|p| matches!(cursor.tree().get(p), Node::Labeled { .. })) =>
                {
                    return Flow::Descend;
                }
                Node::For { .. } => node,
                Node::Labeled { stmt, .. } if cursor.tree().get(*stmt).is_loop() => *stmt,
                _ => return Flow::Descend,
            };
            match self.rewrite_loop(cursor.tree_mut(), node, for_node) {
                Some(replacement) => {
                    loops += 1;
                    cursor.replace(replacement);
                    Flow::Skip
                }
                None => Flow::Descend,
            }
        });
        loops
    }
}

/// Names whose scope is the loop or something inside it: range and
/// three-clause variables, `:=` targets and `var` names, at any depth
/// outside function literals.
fn declared_names(tree: &Tree, for_node: NodeId) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    visit(tree, None, for_node, |_, id| {
        match tree.get(id) {
            Node::FuncLit { .. } => return Flow::Skip,
            Node::For {
                header:
                    ForHeader::Range {
                        key,
                        value,
                        define: true,
                        ..
                    },
                ..
            } => insert_idents(tree, &mut names, key.iter().chain(value)),
            Node::Assign {
                lhs,
                op: AssignOp::Define,
                ..
            } => insert_idents(tree, &mut names, lhs),
            Node::ValueSpec { names: declared, .. } => {
                names.extend(declared.iter().cloned());
            }
            _ => {}
        }
        Flow::Descend
    });
    names
}

fn insert_idents<'a>(
    tree: &Tree,
    names: &mut FxHashSet<String>,
    ids: impl IntoIterator<Item = &'a NodeId>,
) {
    for id in ids {
        if let Node::Ident(name) = tree.get(*id) {
            names.insert(name.clone());
        }
    }
}
