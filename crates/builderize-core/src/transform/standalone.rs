use super::flatten::process_concat;
use super::{assign_to, Accumulator, ConcatSite, LoopMembership, Pass, STRINGS_BUILDER};
use crate::ast::Tree;
use crate::walk::{apply, Flow};
use tracing::debug;

/// Rewrites `x += E` outside any loop into a scoped accumulator block:
///
/// ```go
/// {
///     var xBuilder strings.Builder
///     xBuilder.WriteString(x)
///     xBuilder.WriteString(E)
///     x = xBuilder.String()
/// }
/// ```
///
/// Statements inside a loop body are left to [`super::LoopConcatPass`].
pub struct StandaloneRewritePass<'m> {
    membership: &'m LoopMembership,
    chunk_size: usize,
    accumulator: Accumulator,
}

impl<'m> StandaloneRewritePass<'m> {
    pub fn new(membership: &'m LoopMembership, chunk_size: usize) -> Self {
        Self {
            membership,
            chunk_size,
            accumulator: STRINGS_BUILDER,
        }
    }
}

impl Pass for StandaloneRewritePass<'_> {
    fn name(&self) -> &'static str {
        "standalone-concat"
    }

    fn run(&mut self, tree: &mut Tree) -> usize {
        let mut rewrites = 0;
        apply(tree, |cursor| {
            let node = cursor.node();
            if self.membership.contains(node) {
                return Flow::Descend;
            }
            let Some(site) = ConcatSite::at(cursor.tree(), cursor.parent(), node) else {
                return Flow::Descend;
            };

            let acc = self.accumulator;
            let binding = acc.binding_name(&site.target);
            let tree = cursor.tree_mut();
            let declare = acc.declare(tree, &binding);
            let seed = tree.ident(site.target.as_str());
            let keep = acc.append(tree, &binding, seed);
            let value = process_concat(tree, site.value, self.chunk_size);
            let add = acc.append(tree, &binding, value);
            let done = acc.finalize(tree, &binding);
            let finish = assign_to(tree, &site.target, done);
            let block = tree.block(vec![declare, keep, add, finish]);

            debug!(variable = %site.target, "rewrote standalone concatenation");
            rewrites += 1;
            cursor.replace(block);
            Flow::Skip
        });
        rewrites
    }
}
