//! Serializes a [`Tree`] back to Go source text.
//!
//! Layout follows gofmt conventions for the constructs the tree models: tab
//! indentation, one statement per line, `case` aligned with its `switch`,
//! labels outdented one level. Parentheses are never taken from the tree
//! alone; the expression printer inserts them wherever precedence or
//! position requires, so a tree with every grouping node stripped still
//! prints with its original meaning.
//!
//! Subtrees the transforms never touched are copied from the source text
//! instead, shifted to the indentation of wherever they now sit, so their
//! inner comments and hand layout survive.

mod emitter;
mod expressions;
mod statements;

pub use emitter::Emitter;

use crate::ast::{DeclKind, Node, NodeId, Tree};
use crate::error::PrintError;
use rustc_hash::FxHashSet;

/// Prints the whole file.
pub fn print(tree: &Tree) -> Result<String, PrintError> {
    let mut printer = Printer::new(tree);
    printer.print_file(tree.root())?;
    Ok(printer.emitter.take_output())
}

pub(crate) struct Printer<'t> {
    tree: &'t Tree,
    emitter: Emitter,
    /// Printing an `if`, `for` or `switch` header, where a composite literal
    /// of a named type must be parenthesized.
    in_header: bool,
    untouched: FxHashSet<NodeId>,
}

fn leading_tabs(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b'\t').count()
}

fn mismatch(expected: &'static str, found: &Node) -> PrintError {
    PrintError::UnexpectedNode {
        expected,
        found: found.kind_name(),
    }
}

impl<'t> Printer<'t> {
    fn new(tree: &'t Tree) -> Self {
        Self {
            tree,
            emitter: Emitter::new(),
            in_header: false,
            untouched: tree.untouched(),
        }
    }

    /// Copies an untouched node's source text. Continuation lines are
    /// shifted by the difference between the current indentation and the
    /// indentation of the line the node started on; lines inside a raw
    /// string literal keep their tabs.
    fn print_verbatim(&mut self, id: NodeId) -> bool {
        if !self.untouched.contains(&id) {
            return false;
        }
        let tree = self.tree;
        let Some(span) = tree.span(id) else {
            return false;
        };
        let source = tree.source();
        let Some(text) = source.get(span.start..span.end) else {
            return false;
        };

        let line_start = source[..span.start].rfind('\n').map_or(0, |i| i + 1);
        let from = leading_tabs(&source[line_start..]);
        let to = self.emitter.indent_level();

        let mut offset = span.start;
        for (i, line) in text.split('\n').enumerate() {
            let next = offset + line.len() + 1;
            // Carriage returns carry no meaning, even inside raw strings.
            let line = line.strip_suffix('\r').unwrap_or(line);
            let mut rest = line;
            if i > 0 {
                self.emitter.write("\n");
                if !line.is_empty() && !tree.in_raw_string(offset) {
                    let tabs = leading_tabs(line);
                    for _ in 0..(tabs + to).saturating_sub(from) {
                        self.emitter.write("\t");
                    }
                    rest = &line[tabs..];
                }
            }
            self.emitter.write(rest);
            offset = next;
        }
        true
    }

    fn print_file(&mut self, id: NodeId) -> Result<(), PrintError> {
        let tree = self.tree;
        let Node::File { package, decls } = tree.get(id) else {
            return Err(mismatch("file", tree.get(id)));
        };

        self.print_leading(id, true, false);
        self.emitter.write("package ");
        self.emitter.write(package);
        self.print_trailing(id);
        self.emitter.writeln("");

        let mut prev: Option<NodeId> = None;
        for &decl in decls {
            let separate = match prev {
                None => true,
                Some(prev) => Self::is_section(tree.get(prev)) || Self::is_section(tree.get(decl)),
            };
            self.print_leading(decl, false, separate);
            self.print_decl(decl)?;
            self.print_trailing(decl);
            self.emitter.writeln("");
            prev = Some(decl);
        }

        self.print_closing(id, false);
        Ok(())
    }

    /// Functions and imports always get a blank line around them.
    fn is_section(node: &Node) -> bool {
        matches!(
            node,
            Node::FuncDecl { .. }
                | Node::GenDecl {
                    kind: DeclKind::Import,
                    ..
                }
        )
    }

    fn print_decl(&mut self, id: NodeId) -> Result<(), PrintError> {
        if self.print_verbatim(id) {
            return Ok(());
        }
        let tree = self.tree;
        match tree.get(id) {
            Node::GenDecl { .. } => self.print_gen_decl(id),
            Node::FuncDecl {
                recv,
                name,
                signature,
                body,
            } => {
                self.emitter.write("func ");
                if let Some(recv) = recv {
                    self.emitter.write(recv);
                    self.emitter.write(" ");
                }
                self.emitter.write(name);
                self.emitter.write(signature);
                if let Some(body) = body {
                    self.emitter.write(" ");
                    self.print_block(*body)?;
                }
                Ok(())
            }
            other => Err(mismatch("declaration", other)),
        }
    }

    fn print_gen_decl(&mut self, id: NodeId) -> Result<(), PrintError> {
        if self.print_verbatim(id) {
            return Ok(());
        }
        let tree = self.tree;
        let Node::GenDecl {
            kind,
            specs,
            grouped,
        } = tree.get(id)
        else {
            return Err(mismatch("declaration", tree.get(id)));
        };

        self.emitter.write(kind.as_str());
        if !*grouped && specs.len() == 1 {
            self.emitter.write(" ");
            return self.print_spec(specs[0]);
        }

        let has_closing = tree.trivia(id).is_some_and(|t| !t.closing.is_empty());
        if specs.is_empty() && !has_closing {
            self.emitter.write(" ()");
            return Ok(());
        }
        self.emitter.writeln(" (");
        self.emitter.indent();
        for (i, &spec) in specs.iter().enumerate() {
            self.print_leading(spec, i == 0, false);
            self.emitter.write_indent();
            self.print_spec(spec)?;
            self.print_trailing(spec);
            self.emitter.writeln("");
        }
        self.print_closing(id, specs.is_empty());
        self.emitter.dedent();
        self.emitter.write_indent();
        self.emitter.write(")");
        Ok(())
    }

    fn print_spec(&mut self, id: NodeId) -> Result<(), PrintError> {
        if self.print_verbatim(id) {
            return Ok(());
        }
        let tree = self.tree;
        match tree.get(id) {
            Node::ImportSpec { name, path } => {
                if let Some(name) = name {
                    self.emitter.write(name);
                    self.emitter.write(" ");
                }
                self.emitter.write(path);
            }
            Node::TypeSpec(text) => self.emitter.write(text),
            Node::ValueSpec { names, ty, values } => {
                self.emitter.write(&names.join(", "));
                if let Some(ty) = ty {
                    self.emitter.write(" ");
                    self.print_expr(*ty)?;
                }
                if !values.is_empty() {
                    self.emitter.write(" = ");
                    self.print_expr_list(values)?;
                }
            }
            other => return Err(mismatch("spec", other)),
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Trivia
    // ---------------------------------------------------------------------

    /// Comments above a node. `first` suppresses the blank line a node would
    /// otherwise carry at the top of its enclosing list; `force_blank` adds
    /// one regardless of the source.
    fn print_leading(&mut self, id: NodeId, first: bool, force_blank: bool) {
        let tree = self.tree;
        let (comments, blank_before) = match tree.trivia(id) {
            Some(trivia) => (trivia.leading.as_slice(), trivia.blank_before),
            None => (&[][..], false),
        };
        let mut pending_blank = force_blank && !first;
        let mut at_top = first;
        for comment in comments {
            if pending_blank || (comment.blank_before && !at_top) {
                self.emitter.blank_line();
            }
            pending_blank = false;
            at_top = false;
            self.emitter.write_indented(&comment.text);
        }
        if pending_blank || (blank_before && !at_top) {
            self.emitter.blank_line();
        }
    }

    fn print_trailing(&mut self, id: NodeId) {
        let tree = self.tree;
        if let Some(comment) = tree.trivia(id).and_then(|t| t.trailing.as_ref()) {
            self.emitter.write(" ");
            self.emitter.write(&comment.text);
        }
    }

    /// Comments between the last element of a block or group and its
    /// closing delimiter.
    fn print_closing(&mut self, id: NodeId, empty: bool) {
        let tree = self.tree;
        let Some(trivia) = tree.trivia(id) else {
            return;
        };
        for (i, comment) in trivia.closing.iter().enumerate() {
            if comment.blank_before && !(empty && i == 0) {
                self.emitter.blank_line();
            }
            self.emitter.write_indented(&comment.text);
        }
    }
}
