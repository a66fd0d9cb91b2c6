//! The rewrite pipeline.
//!
//! [`transform`] runs a fixed sequence of passes over one file's tree. Each
//! pass walks the tree top-down, replaces nodes through [`crate::walk`] and
//! reports how many rewrites it made. The order matters: loop membership is
//! computed before anything moves, statement rewrites happen before the
//! pure-literal pass so their chunks are not chunked twice, and grouping
//! nodes are stripped last so the import resolver and printer see the final
//! shape.

pub mod chunker;
pub mod flatten;
pub mod grouping;
pub mod imports;
pub mod loop_concat;
pub mod loop_membership;
pub mod pure_literal;
pub mod standalone;

pub use grouping::GroupingPass;
pub use imports::ImportPass;
pub use loop_concat::LoopConcatPass;
pub use loop_membership::LoopMembership;
pub use pure_literal::PureLiteralPass;
pub use standalone::StandaloneRewritePass;

use self::flatten::flatten;
use crate::ast::{AssignOp, Node, NodeId, Tree};
use crate::config::TransformConfig;
use tracing::{debug, trace};

/// A single rewrite over a whole tree.
pub trait Pass {
    fn name(&self) -> &'static str;

    /// Runs the pass and returns the number of rewrites made.
    fn run(&mut self, tree: &mut Tree) -> usize;
}

/// What [`transform`] did to a file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformReport {
    pub standalone_rewrites: usize,
    pub loop_rewrites: usize,
    pub literal_rewrites: usize,
    pub parens_removed: usize,
    pub import_added: bool,
}

impl TransformReport {
    /// Whether the file needs writing back. Dropping redundant parentheses
    /// alone does not count.
    pub fn changed(&self) -> bool {
        self.standalone_rewrites > 0
            || self.loop_rewrites > 0
            || self.literal_rewrites > 0
            || self.import_added
    }
}

/// Rewrites every eligible concatenation in `tree`.
pub fn transform(tree: &mut Tree, config: &TransformConfig) -> TransformReport {
    let chunk_size = config.chunk_size.max(1);
    let mut report = TransformReport::default();

    if has_add_assign(tree) {
        let membership = LoopMembership::build(tree);
        trace!(in_loop = membership.len(), "built loop membership");
        report.standalone_rewrites = run_pass(
            &mut StandaloneRewritePass::new(&membership, chunk_size),
            tree,
        );
        report.loop_rewrites = run_pass(&mut LoopConcatPass::new(chunk_size), tree);
    }
    report.literal_rewrites = run_pass(&mut PureLiteralPass::new(chunk_size), tree);
    report.parens_removed = run_pass(&mut GroupingPass, tree);
    report.import_added = run_pass(&mut ImportPass::new(STRINGS_BUILDER), tree) > 0;

    debug!(?report, "transform finished");
    report
}

fn run_pass(pass: &mut dyn Pass, tree: &mut Tree) -> usize {
    let count = pass.run(tree);
    trace!(pass = pass.name(), count, "pass finished");
    count
}

fn has_add_assign(tree: &Tree) -> bool {
    tree.preorder(tree.root())
        .any(|id| matches!(tree.get(id), Node::Assign { op, .. } if op.is_add_assign()))
}

/// The append-then-finalize type that replaces repeated concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulator {
    /// Package qualifier in source, e.g. `strings`.
    pub package: &'static str,
    /// Import path that provides `package`.
    pub import_path: &'static str,
    pub type_name: &'static str,
    pub append: &'static str,
    pub finalize: &'static str,
    /// Appended to the target name to form the binding name.
    pub suffix: &'static str,
}

pub const STRINGS_BUILDER: Accumulator = Accumulator {
    package: "strings",
    import_path: "strings",
    type_name: "Builder",
    append: "WriteString",
    finalize: "String",
    suffix: "Builder",
};

impl Accumulator {
    /// `s` becomes `sBuilder`. Collisions with existing names are not
    /// checked.
    pub fn binding_name(&self, target: &str) -> String {
        format!("{target}{}", self.suffix)
    }

    /// `var <binding> strings.Builder`
    pub fn declare(&self, tree: &mut Tree, binding: &str) -> NodeId {
        let package = tree.ident(self.package);
        let ty = tree.selector(package, self.type_name);
        tree.var_decl(binding, ty)
    }

    /// `<binding>.WriteString(value)`
    pub fn append(&self, tree: &mut Tree, binding: &str, value: NodeId) -> NodeId {
        let call = tree.method_call(binding, self.append, vec![value]);
        tree.expr_stmt(call)
    }

    /// `<binding>.String()`
    pub fn finalize(&self, tree: &mut Tree, binding: &str) -> NodeId {
        tree.method_call(binding, self.finalize, Vec::new())
    }
}

/// An `x += E` statement the rewriters may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatSite {
    pub target: String,
    pub value: NodeId,
}

impl ConcatSite {
    /// Recognizes `node` as a rewritable site under `parent`.
    ///
    /// The statement must be a single-target `+=` onto a plain name, stand
    /// where a block is a legal replacement (a statement list or directly
    /// under a label), and must not add a numeric or rune literal.
    pub fn at(tree: &Tree, parent: Option<NodeId>, node: NodeId) -> Option<Self> {
        let Node::Assign { lhs, op, rhs } = tree.get(node) else {
            return None;
        };
        if !op.is_add_assign() || lhs.len() != 1 || rhs.len() != 1 {
            return None;
        }
        let Node::Ident(target) = tree.get(lhs[0]) else {
            return None;
        };
        if target == "_" {
            return None;
        }

        let in_statement_list = match tree.get(parent?) {
            Node::Block(_) | Node::Labeled { .. } => true,
            Node::CaseClause { body, .. } => body.contains(&node),
            _ => false,
        };
        if !in_statement_list {
            return None;
        }

        let numeric = flatten(tree, rhs[0])
            .into_iter()
            .any(|operand| matches!(tree.get(operand), Node::BasicLit { kind, .. } if kind.is_numeric()));
        if numeric {
            return None;
        }

        Some(Self {
            target: target.clone(),
            value: rhs[0],
        })
    }
}

/// `x = value`
fn assign_to(tree: &mut Tree, target: &str, value: NodeId) -> NodeId {
    let lhs = tree.ident(target);
    tree.assign(vec![lhs], AssignOp::Assign, vec![value])
}
