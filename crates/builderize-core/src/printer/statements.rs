use super::{mismatch, Printer};
use crate::ast::{AssignOp, ForHeader, Node, NodeId};
use crate::error::PrintError;

impl Printer<'_> {
    pub(super) fn print_block(&mut self, id: NodeId) -> Result<(), PrintError> {
        if self.print_verbatim(id) {
            return Ok(());
        }
        let tree = self.tree;
        let Node::Block(stmts) = tree.get(id) else {
            return Err(mismatch("block", tree.get(id)));
        };
        let has_closing = tree.trivia(id).is_some_and(|t| !t.closing.is_empty());
        if stmts.is_empty() && !has_closing {
            self.emitter.write("{}");
            return Ok(());
        }

        let saved = std::mem::replace(&mut self.in_header, false);
        self.emitter.writeln("{");
        self.emitter.indent();
        self.print_stmt_list(stmts)?;
        self.print_closing(id, stmts.is_empty());
        self.emitter.dedent();
        self.emitter.write_indent();
        self.emitter.write("}");
        self.in_header = saved;
        Ok(())
    }

    pub(super) fn print_stmt_list(&mut self, stmts: &[NodeId]) -> Result<(), PrintError> {
        for (i, &stmt) in stmts.iter().enumerate() {
            self.print_leading(stmt, i == 0, false);
            self.print_stmt_line(stmt)?;
            self.print_trailing(stmt);
            self.emitter.writeln("");
        }
        Ok(())
    }

    /// Indentation plus the statement, without the final newline. Labels sit
    /// on their own line, one level left of the statement they name.
    fn print_stmt_line(&mut self, id: NodeId) -> Result<(), PrintError> {
        let tree = self.tree;
        if let Node::Labeled { label, stmt } = tree.get(id) {
            self.emitter.dedent();
            self.emitter.write_indent();
            self.emitter.write(label);
            self.emitter.write(":");
            self.emitter.indent();
            if matches!(tree.get(*stmt), Node::Empty) {
                return Ok(());
            }
            self.emitter.writeln("");
            return self.print_stmt_line(*stmt);
        }
        self.emitter.write_indent();
        self.print_stmt(id)
    }

    pub(super) fn print_stmt(&mut self, id: NodeId) -> Result<(), PrintError> {
        if self.print_verbatim(id) {
            return Ok(());
        }
        let tree = self.tree;
        match tree.get(id) {
            Node::Assign { lhs, op, rhs } => {
                let depth = if lhs.len() > 1 && rhs.len() > 1 { 2 } else { 1 };
                self.print_expr_list(lhs)?;
                self.emitter.write(" ");
                match op {
                    AssignOp::Assign => self.emitter.write("="),
                    AssignOp::Define => self.emitter.write(":="),
                    AssignOp::Compound(op) => {
                        self.emitter.write(op.as_str());
                        self.emitter.write("=");
                    }
                }
                self.emitter.write(" ");
                self.print_expr_list_at(rhs, depth)
            }
            Node::IncDec { x, inc } => {
                self.print_expr(*x)?;
                self.emitter.write(if *inc { "++" } else { "--" });
                Ok(())
            }
            Node::ExprStmt(x) => self.print_expr(*x),
            Node::Send { chan, value } => {
                self.print_expr(*chan)?;
                self.emitter.write(" <- ");
                self.print_expr(*value)
            }
            Node::Block(_) => self.print_block(id),
            Node::If { .. } => self.print_if(id),
            Node::For { header, body } => {
                self.emitter.write("for ");
                let saved = std::mem::replace(&mut self.in_header, true);
                self.print_for_header(header)?;
                self.in_header = saved;
                self.print_block(*body)
            }
            Node::Switch { init, tag, clauses } => {
                self.emitter.write("switch ");
                let saved = std::mem::replace(&mut self.in_header, true);
                if let Some(init) = init {
                    self.print_stmt(*init)?;
                    self.emitter.write("; ");
                }
                if let Some(tag) = tag {
                    self.print_stmt(*tag)?;
                    self.emitter.write(" ");
                }
                self.in_header = saved;
                self.print_clauses(id, clauses)
            }
            Node::Select { clauses } => {
                self.emitter.write("select ");
                self.print_clauses(id, clauses)
            }
            Node::Return(results) => {
                self.emitter.write("return");
                if !results.is_empty() {
                    self.emitter.write(" ");
                    self.print_expr_list(results)?;
                }
                Ok(())
            }
            Node::Branch { kind, label } => {
                self.emitter.write(kind.as_str());
                if let Some(label) = label {
                    self.emitter.write(" ");
                    self.emitter.write(label);
                }
                Ok(())
            }
            Node::Go(call) => {
                self.emitter.write("go ");
                self.print_expr(*call)
            }
            Node::Defer(call) => {
                self.emitter.write("defer ");
                self.print_expr(*call)
            }
            Node::Labeled { label, stmt } => {
                self.emitter.write(label);
                self.emitter.write(": ");
                self.print_stmt(*stmt)
            }
            Node::DeclStmt(decl) => self.print_gen_decl(*decl),
            Node::Empty => Ok(()),
            other => Err(mismatch("statement", other)),
        }
    }

    /// Walks an `else if` chain in a loop; an untouched tail is copied
    /// whole.
    fn print_if(&mut self, id: NodeId) -> Result<(), PrintError> {
        let tree = self.tree;
        let mut current = id;
        loop {
            let Node::If {
                init,
                cond,
                then,
                els,
            } = tree.get(current)
            else {
                return Err(mismatch("if statement", tree.get(current)));
            };
            self.emitter.write("if ");
            let saved = std::mem::replace(&mut self.in_header, true);
            if let Some(init) = init {
                self.print_stmt(*init)?;
                self.emitter.write("; ");
            }
            self.print_expr(*cond)?;
            self.in_header = saved;
            self.emitter.write(" ");
            self.print_block(*then)?;
            let Some(els) = els else {
                return Ok(());
            };
            self.emitter.write(" else ");
            match tree.get(*els) {
                Node::If { .. } => {
                    if self.print_verbatim(*els) {
                        return Ok(());
                    }
                    current = *els;
                }
                Node::Block(_) => return self.print_block(*els),
                other => return Err(mismatch("else branch", other)),
            }
        }
    }

    fn print_for_header(&mut self, header: &ForHeader) -> Result<(), PrintError> {
        match header {
            ForHeader::Infinite => {}
            ForHeader::Cond(cond) => {
                self.print_expr(*cond)?;
                self.emitter.write(" ");
            }
            ForHeader::Clause { init, cond, post } => {
                if let Some(init) = init {
                    self.print_stmt(*init)?;
                }
                self.emitter.write("; ");
                if let Some(cond) = cond {
                    self.print_expr(*cond)?;
                }
                self.emitter.write(";");
                if let Some(post) = post {
                    self.emitter.write(" ");
                    self.print_stmt(*post)?;
                }
                self.emitter.write(" ");
            }
            ForHeader::Range {
                key,
                value,
                define,
                expr,
            } => {
                if let Some(key) = key {
                    self.print_expr(*key)?;
                    if let Some(value) = value {
                        self.emitter.write(", ");
                        self.print_expr(*value)?;
                    }
                    self.emitter.write(if *define { " := " } else { " = " });
                }
                self.emitter.write("range ");
                self.print_expr(*expr)?;
                self.emitter.write(" ");
            }
        }
        Ok(())
    }

    /// Body of a `switch` or `select`; `owner` carries the closing comments.
    fn print_clauses(&mut self, owner: NodeId, clauses: &[NodeId]) -> Result<(), PrintError> {
        let tree = self.tree;
        let has_closing = tree.trivia(owner).is_some_and(|t| !t.closing.is_empty());
        if clauses.is_empty() && !has_closing {
            self.emitter.write("{}");
            return Ok(());
        }
        self.emitter.writeln("{");
        for (i, &clause) in clauses.iter().enumerate() {
            let Node::CaseClause { list, body } = tree.get(clause) else {
                return Err(mismatch("case clause", tree.get(clause)));
            };
            self.print_leading(clause, i == 0, false);
            self.emitter.write_indent();
            match list {
                None => self.emitter.write("default:"),
                Some(list) => {
                    self.emitter.write("case ");
                    for (j, &item) in list.iter().enumerate() {
                        if j > 0 {
                            self.emitter.write(", ");
                        }
                        if Self::is_simple_stmt(tree.get(item)) {
                            self.print_stmt(item)?;
                        } else {
                            self.print_expr(item)?;
                        }
                    }
                    self.emitter.write(":");
                }
            }
            self.print_trailing(clause);
            self.emitter.writeln("");
            self.emitter.indent();
            self.print_stmt_list(body)?;
            self.emitter.dedent();
        }
        self.emitter.indent();
        self.print_closing(owner, clauses.is_empty());
        self.emitter.dedent();
        self.emitter.write_indent();
        self.emitter.write("}");
        Ok(())
    }

    fn is_simple_stmt(node: &Node) -> bool {
        matches!(
            node,
            Node::Assign { .. } | Node::IncDec { .. } | Node::ExprStmt(_) | Node::Send { .. }
        )
    }
}
