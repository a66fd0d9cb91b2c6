use super::{mismatch, Printer};
use crate::ast::{BinaryOp, Node, NodeId, UnaryOp};
use crate::error::PrintError;

/// Binding strength of a unary operator.
const UNARY_PREC: u8 = 6;
/// Operand position of a selector, index, slice, call or type assertion.
const PRIMARY_PREC: u8 = 7;

impl Printer<'_> {
    pub(super) fn print_expr(&mut self, id: NodeId) -> Result<(), PrintError> {
        self.print_expr_prec(id, 0, 1)
    }

    pub(super) fn print_expr_list(&mut self, list: &[NodeId]) -> Result<(), PrintError> {
        self.print_expr_list_at(list, 1)
    }

    pub(super) fn print_expr_list_at(
        &mut self,
        list: &[NodeId],
        depth: usize,
    ) -> Result<(), PrintError> {
        for (i, &item) in list.iter().enumerate() {
            if i > 0 {
                self.emitter.write(", ");
            }
            self.print_expr_prec(item, 0, depth)?;
        }
        Ok(())
    }

    /// Prints `id` in a context that binds at `prec`. `depth` grows with
    /// nesting and decides, as gofmt does, where binary operators lose their
    /// surrounding blanks (`f(a+b, c)`, `x + y*z`).
    fn print_expr_prec(&mut self, id: NodeId, prec: u8, depth: usize) -> Result<(), PrintError> {
        let tree = self.tree;
        let wrap = match tree.get(id) {
            Node::Binary { op, .. } => op.precedence() < prec,
            Node::Unary { .. } => prec > UNARY_PREC,
            Node::CompositeLit { ty, .. } => {
                self.in_header
                    && ty.is_some_and(|ty| {
                        matches!(tree.get(ty), Node::Ident(_) | Node::Selector { .. })
                    })
            }
            _ => false,
        };
        if wrap {
            return self.parenthesized(id, depth);
        }
        if self.print_verbatim(id) {
            return Ok(());
        }

        match tree.get(id) {
            Node::Binary { op, .. } => self.print_binary(id, op.precedence(), depth),
            Node::Unary { op, x } => {
                self.emitter.write(op.as_str());
                if let Node::Unary { op: inner, .. } = tree.get(*x) {
                    // `- -x` must not print as the `--` token.
                    if *inner == *op && matches!(op, UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Addr)
                    {
                        self.emitter.write(" ");
                    }
                }
                self.print_expr_prec(*x, UNARY_PREC, depth)
            }
            Node::Ident(name) => {
                self.emitter.write(name);
                Ok(())
            }
            Node::BasicLit { value, .. } => {
                self.emitter.write(value);
                Ok(())
            }
            Node::Raw(text) => {
                self.emitter.write(text);
                Ok(())
            }
            Node::Paren(inner) => {
                let saved = std::mem::replace(&mut self.in_header, false);
                self.emitter.write("(");
                self.print_expr_prec(*inner, 0, depth.saturating_sub(1).max(1))?;
                self.emitter.write(")");
                self.in_header = saved;
                Ok(())
            }
            Node::Selector { x, sel } => {
                self.print_expr_prec(*x, PRIMARY_PREC, depth)?;
                self.emitter.write(".");
                self.emitter.write(sel);
                Ok(())
            }
            Node::Index { x, indices } => {
                self.print_expr_prec(*x, PRIMARY_PREC, depth)?;
                let saved = std::mem::replace(&mut self.in_header, false);
                self.emitter.write("[");
                self.print_expr_list_at(indices, depth + 1)?;
                self.emitter.write("]");
                self.in_header = saved;
                Ok(())
            }
            Node::Slice { x, low, high, max } => {
                self.print_expr_prec(*x, PRIMARY_PREC, depth)?;
                let saved = std::mem::replace(&mut self.in_header, false);
                let spaced = [low, high, max]
                    .into_iter()
                    .flatten()
                    .any(|part| matches!(tree.get(*part), Node::Binary { .. }));
                let colon = if spaced { " : " } else { ":" };
                self.emitter.write("[");
                if let Some(low) = low {
                    self.print_expr_prec(*low, 0, depth + 1)?;
                }
                self.emitter.write(colon);
                if let Some(high) = high {
                    self.print_expr_prec(*high, 0, depth + 1)?;
                }
                if let Some(max) = max {
                    self.emitter.write(colon);
                    self.print_expr_prec(*max, 0, depth + 1)?;
                }
                self.emitter.write("]");
                self.in_header = saved;
                Ok(())
            }
            Node::TypeAssert { x, ty } => {
                self.print_expr_prec(*x, PRIMARY_PREC, depth)?;
                self.emitter.write(".(");
                match ty {
                    Some(ty) => self.print_expr(*ty)?,
                    None => self.emitter.write("type"),
                }
                self.emitter.write(")");
                Ok(())
            }
            Node::Call {
                fun,
                args,
                ellipsis,
                multiline,
            } => {
                let depth = if args.len() > 1 { depth + 1 } else { depth };
                match tree.get(*fun) {
                    Node::Raw(text) if text.starts_with("func") || text.starts_with("<-") => {
                        self.emitter.write("(");
                        self.emitter.write(text);
                        self.emitter.write(")");
                    }
                    _ => self.print_expr_prec(*fun, PRIMARY_PREC, depth)?,
                }
                let saved = std::mem::replace(&mut self.in_header, false);
                self.emitter.write("(");
                let last = args.len().saturating_sub(1);
                if *multiline {
                    self.emitter.writeln("");
                    self.emitter.indent();
                    for (i, &arg) in args.iter().enumerate() {
                        self.emitter.write_indent();
                        self.print_expr_prec(arg, 0, depth)?;
                        if *ellipsis && i == last {
                            self.emitter.write("...");
                        }
                        self.emitter.writeln(",");
                    }
                    self.emitter.dedent();
                    self.emitter.write_indent();
                } else {
                    for (i, &arg) in args.iter().enumerate() {
                        if i > 0 {
                            self.emitter.write(", ");
                        }
                        self.print_expr_prec(arg, 0, depth)?;
                        if *ellipsis && i == last {
                            self.emitter.write("...");
                        }
                    }
                }
                self.emitter.write(")");
                self.in_header = saved;
                Ok(())
            }
            Node::CompositeLit {
                ty,
                elts,
                multiline,
            } => {
                let saved = std::mem::replace(&mut self.in_header, false);
                if let Some(ty) = ty {
                    self.print_expr_prec(*ty, PRIMARY_PREC, depth)?;
                }
                self.emitter.write("{");
                if *multiline && !elts.is_empty() {
                    self.emitter.writeln("");
                    self.emitter.indent();
                    for &elt in elts {
                        self.emitter.write_indent();
                        self.print_expr(elt)?;
                        self.emitter.writeln(",");
                    }
                    self.emitter.dedent();
                    self.emitter.write_indent();
                } else {
                    self.print_expr_list(elts)?;
                }
                self.emitter.write("}");
                self.in_header = saved;
                Ok(())
            }
            Node::KeyValue { key, value } => {
                self.print_expr(*key)?;
                self.emitter.write(": ");
                self.print_expr(*value)
            }
            Node::FuncLit { signature, body } => {
                self.emitter.write("func");
                self.emitter.write(signature);
                self.emitter.write(" ");
                self.print_block(*body)
            }
            other => Err(mismatch("expression", other)),
        }
    }

    /// Parentheses undo one level of depth.
    fn parenthesized(&mut self, id: NodeId, depth: usize) -> Result<(), PrintError> {
        let saved = std::mem::replace(&mut self.in_header, false);
        self.emitter.write("(");
        self.print_expr_prec(id, 0, depth.saturating_sub(1).max(1))?;
        self.emitter.write(")");
        self.in_header = saved;
        Ok(())
    }

    /// Prints a binary expression whose operator binds at `own`. The left
    /// spine of operators at the same level is walked in a loop, so a long
    /// `a + b + c + ...` chain prints in constant stack.
    fn print_binary(&mut self, id: NodeId, own: u8, depth: usize) -> Result<(), PrintError> {
        let tree = self.tree;
        let mut links = Vec::new();
        let mut leftmost = id;
        while let Node::Binary { op, x, y } = tree.get(leftmost) {
            if op.precedence() != own || (leftmost != id && self.untouched.contains(&leftmost)) {
                break;
            }
            links.push((*op, *y));
            leftmost = *x;
        }

        let (left_depth, mut found) = match tree.get(leftmost) {
            Node::Binary { op, .. } if op.precedence() == own => (depth, self.walk_binary(leftmost)),
            Node::Binary { op, .. } if op.precedence() > own => {
                (depth + 1, self.walk_binary(leftmost))
            }
            _ => (depth + 1, Operators::default()),
        };
        self.print_expr_prec(leftmost, own, left_depth)?;

        for &(op, y) in links.iter().rev() {
            found.visit(op, tree.get(y));
            if let Node::Binary { op: right, .. } = tree.get(y) {
                if right.precedence() > own {
                    found.merge(self.walk_binary(y));
                }
            }
            if own < found.cutoff(depth) {
                self.emitter.write(" ");
                self.emitter.write(op.as_str());
                self.emitter.write(" ");
            } else {
                self.emitter.write(op.as_str());
            }
            self.print_expr_prec(y, own + 1, depth + 1)?;
        }
        Ok(())
    }

    /// Which precedence levels appear in the operator chain rooted at `id`,
    /// plus the level at which dropping blanks would fuse two operators into
    /// a different token (`a/*b` opens a comment, `a&&b` is a logical and).
    fn walk_binary(&self, id: NodeId) -> Operators {
        let tree = self.tree;
        let mut found = Operators::default();
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Node::Binary { op, x, y } = tree.get(id) else {
                continue;
            };
            let own = op.precedence();
            found.visit(*op, tree.get(*y));
            if let Node::Binary { op: left, .. } = tree.get(*x) {
                if left.precedence() >= own {
                    pending.push(*x);
                }
            }
            if let Node::Binary { op: right, .. } = tree.get(*y) {
                if right.precedence() > own {
                    pending.push(*y);
                }
            }
        }
        found
    }
}

/// Summary of an operator chain used to pick gofmt's blank cutoff.
#[derive(Debug, Default, Clone, Copy)]
struct Operators {
    has4: bool,
    has5: bool,
    max_problem: u8,
}

impl Operators {
    fn visit(&mut self, op: BinaryOp, y: &Node) {
        let own = op.precedence();
        self.has4 |= own == 4;
        self.has5 |= own == 5;
        if let Node::Unary { op: unary, .. } = y {
            let problem = match (op, unary) {
                (BinaryOp::Quo, UnaryOp::Deref)
                | (BinaryOp::And, UnaryOp::Addr)
                | (BinaryOp::And, UnaryOp::Xor) => 5,
                (BinaryOp::Add, UnaryOp::Plus) | (BinaryOp::Sub, UnaryOp::Neg) => 4,
                _ => 0,
            };
            self.max_problem = self.max_problem.max(problem);
        }
    }

    fn merge(&mut self, other: Operators) {
        self.has4 |= other.has4;
        self.has5 |= other.has5;
        self.max_problem = self.max_problem.max(other.max_problem);
    }

    /// Precedence at or above which a binary operator prints without blanks.
    fn cutoff(&self, depth: usize) -> u8 {
        if self.max_problem > 0 {
            return self.max_problem + 1;
        }
        match (self.has4 && self.has5, depth == 1) {
            (true, true) => 5,
            (true, false) => 4,
            (false, true) => 6,
            (false, false) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Node;
    use crate::parser::parse;
    use crate::printer::print;

    fn strip_var(printed: &str) -> String {
        printed
            .strip_prefix("package p\n\nvar v = ")
            .and_then(|rest| rest.strip_suffix('\n'))
            .unwrap()
            .to_string()
    }

    /// Reprints from structure alone, ignoring the source text.
    fn reprint_expr(expr: &str) -> String {
        let source = format!("package p\n\nvar v = {expr}\n");
        let mut tree = parse(&source).unwrap();
        tree.forget_source();
        strip_var(&print(&tree).unwrap())
    }

    // ========================================================================
    // Structural layout
    // ========================================================================

    #[test]
    fn test_gofmt_spacing() {
        assert_eq!(reprint_expr("a + b"), "a + b");
        assert_eq!(reprint_expr("a*b + c"), "a*b + c");
        assert_eq!(reprint_expr("a + b * c"), "a + b*c");
        assert_eq!(reprint_expr("f(a+b, c)"), "f(a+b, c)");
        assert_eq!(reprint_expr("f(a + b)"), "f(a + b)");
        assert_eq!(reprint_expr("xs[i+1]"), "xs[i+1]");
        assert_eq!(reprint_expr(r#""a" + "b" + "c""#), r#""a" + "b" + "c""#);
        assert_eq!(reprint_expr("a*b + c*d + e"), "a*b + c*d + e");
    }

    #[test]
    fn test_no_token_fusion() {
        assert_eq!(reprint_expr("x + a / *p"), "x + a / *p");
        assert_eq!(reprint_expr("- -x"), "- -x");
        assert_eq!(reprint_expr("a - -b + c"), "a - -b + c");
    }

    #[test]
    fn test_primary_operands() {
        assert_eq!(reprint_expr("(*p).x"), "(*p).x");
        assert_eq!(reprint_expr("s[1:n]"), "s[1:n]");
        assert_eq!(reprint_expr("s[i+1 : j]"), "s[i+1 : j]");
        assert_eq!(reprint_expr("v.(fmt.Stringer)"), "v.(fmt.Stringer)");
        assert_eq!(reprint_expr("append(xs, ys...)"), "append(xs, ys...)");
        assert_eq!(reprint_expr("[]byte(s)"), "[]byte(s)");
        assert_eq!(
            reprint_expr("Point{X: 1, Y: 2}"),
            "Point{X: 1, Y: 2}"
        );
        assert_eq!(
            reprint_expr("func(n int) int { return n }"),
            "func(n int) int {\n\treturn n\n}"
        );
    }

    #[test]
    fn test_long_chain_prints_flat() {
        let terms = vec!["x"; 5000].join(" + ");
        assert_eq!(reprint_expr(&terms), terms);
    }

    #[test]
    fn test_nesting_past_u8_range() {
        // Nested index expressions deeper than any parsed file may be;
        // each level adds one to the spacing depth.
        let mut tree = parse("package p\n\nvar v = x\n").unwrap();
        let x = tree
            .preorder(tree.root())
            .find(|id| matches!(tree.get(*id), Node::Ident(name) if name == "x"))
            .unwrap();
        let spec = tree
            .preorder(tree.root())
            .find(|id| matches!(tree.get(*id), Node::ValueSpec { .. }))
            .unwrap();
        let mut expr = tree.ident("i");
        for _ in 0..300 {
            let base = tree.ident("x");
            expr = tree.alloc(Node::Index {
                x: base,
                indices: vec![expr],
            });
        }
        assert!(tree.replace_child(Some(spec), x, expr));

        let printed = std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(move || print(&tree).unwrap())
            .unwrap()
            .join()
            .unwrap();
        let expected = format!("{}i{}", "x[".repeat(300), "]".repeat(300));
        assert_eq!(strip_var(&printed), expected);
    }

    // ========================================================================
    // Source text of untouched expressions
    // ========================================================================

    fn reprint_source(expr: &str) -> String {
        let source = format!("package p\n\nvar v = {expr}\n");
        strip_var(&print(&parse(&source).unwrap()).unwrap())
    }

    #[test]
    fn test_untouched_expressions_keep_layout() {
        assert_eq!(
            reprint_source("func(n int) int { return n }"),
            "func(n int) int { return n }"
        );
        assert_eq!(reprint_source("a+b"), "a+b");
        assert_eq!(
            reprint_source("f(a, /* why */ b)"),
            "f(a, /* why */ b)"
        );
    }
}
