//! Arena-backed Go syntax tree.
//!
//! Every node lives in a single [`id_arena::Arena`] owned by [`Tree`]; children
//! are referenced by [`NodeId`]. The tree is never a DAG: a rewrite allocates
//! fresh nodes and re-points exactly one parent slot, leaving the replaced
//! subtree unreachable. Node identity is the arena index, so passes can key
//! side tables on `NodeId` without caring about structural equality.
//!
//! Constructs the engine never edits (type declarations, function
//! signatures, composite type expressions) are stored as verbatim source
//! text in [`Node::Raw`], [`Node::TypeSpec`] and the `signature` fields.
//!
//! Parsed nodes also remember their byte [`Span`] in the source. A node is
//! *edited* once one of its child slots is re-pointed; a subtree with no
//! edited or synthesized node is printed straight from the source.

use id_arena::{Arena, Id};
use rustc_hash::{FxHashMap, FxHashSet};

/// Stable identity of a node within its [`Tree`].
pub type NodeId = Id<Node>;

/// Literal kinds as they appear in Go source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    /// Interpreted string literal, `"..."`.
    String,
    /// Raw string literal, `` `...` ``.
    RawString,
}

impl LitKind {
    pub fn is_string(self) -> bool {
        matches!(self, LitKind::String | LitKind::RawString)
    }

    /// Numeric and rune literals. A `+` involving one of these is arithmetic,
    /// never string concatenation.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            LitKind::Int | LitKind::Float | LitKind::Imag | LitKind::Char
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    LogOr,
    LogAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Or,
    Xor,
    Mul,
    Quo,
    Rem,
    Shl,
    Shr,
    And,
    AndNot,
}

impl BinaryOp {
    pub fn from_token(text: &str) -> Option<Self> {
        let op = match text {
            "||" => BinaryOp::LogOr,
            "&&" => BinaryOp::LogAnd,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "|" => BinaryOp::Or,
            "^" => BinaryOp::Xor,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Quo,
            "%" => BinaryOp::Rem,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "&" => BinaryOp::And,
            "&^" => BinaryOp::AndNot,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::LogOr => "||",
            BinaryOp::LogAnd => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&",
            BinaryOp::AndNot => "&^",
        }
    }

    /// Go operator precedence, 1 (lowest) to 5 (highest).
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LogOr => 1,
            BinaryOp::LogAnd => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Quo
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    Xor,
    Deref,
    Addr,
    Recv,
    Tilde,
}

impl UnaryOp {
    pub fn from_token(text: &str) -> Option<Self> {
        let op = match text {
            "+" => UnaryOp::Plus,
            "-" => UnaryOp::Neg,
            "!" => UnaryOp::Not,
            "^" => UnaryOp::Xor,
            "*" => UnaryOp::Deref,
            "&" => UnaryOp::Addr,
            "<-" => UnaryOp::Recv,
            "~" => UnaryOp::Tilde,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Deref => "*",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
            UnaryOp::Tilde => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `op=`, e.g. `+=` is `Compound(BinaryOp::Add)`.
    Compound(BinaryOp),
}

impl AssignOp {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "=" => Some(AssignOp::Assign),
            ":=" => Some(AssignOp::Define),
            _ => {
                let op = text.strip_suffix('=')?;
                match BinaryOp::from_token(op)? {
                    BinaryOp::LogOr
                    | BinaryOp::LogAnd
                    | BinaryOp::Eq
                    | BinaryOp::Ne
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge => None,
                    op => Some(AssignOp::Compound(op)),
                }
            }
        }
    }

    pub fn is_add_assign(self) -> bool {
        self == AssignOp::Compound(BinaryOp::Add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Import,
    Const,
    Var,
    Type,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Import => "import",
            DeclKind::Const => "const",
            DeclKind::Var => "var",
            DeclKind::Type => "type",
        }
    }
}

/// The four header shapes of Go's single loop statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForHeader {
    /// `for {`
    Infinite,
    /// `for cond {`
    Cond(NodeId),
    /// `for init; cond; post {`
    Clause {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        post: Option<NodeId>,
    },
    /// `for key, value := range expr {`
    Range {
        key: Option<NodeId>,
        value: Option<NodeId>,
        define: bool,
        expr: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    // Expressions
    Ident(String),
    /// `value` is the literal exactly as written, delimiters included.
    BasicLit {
        kind: LitKind,
        value: String,
    },
    Binary {
        op: BinaryOp,
        x: NodeId,
        y: NodeId,
    },
    Unary {
        op: UnaryOp,
        x: NodeId,
    },
    Paren(NodeId),
    Selector {
        x: NodeId,
        sel: String,
    },
    Index {
        x: NodeId,
        indices: Vec<NodeId>,
    },
    Slice {
        x: NodeId,
        low: Option<NodeId>,
        high: Option<NodeId>,
        max: Option<NodeId>,
    },
    /// `x.(T)`; `ty` is `None` for `x.(type)`.
    TypeAssert {
        x: NodeId,
        ty: Option<NodeId>,
    },
    Call {
        fun: NodeId,
        args: Vec<NodeId>,
        ellipsis: bool,
        multiline: bool,
    },
    CompositeLit {
        ty: Option<NodeId>,
        elts: Vec<NodeId>,
        multiline: bool,
    },
    KeyValue {
        key: NodeId,
        value: NodeId,
    },
    FuncLit {
        signature: String,
        body: NodeId,
    },
    /// Verbatim source text of a type expression.
    Raw(String),

    // Statements
    Assign {
        lhs: Vec<NodeId>,
        op: AssignOp,
        rhs: Vec<NodeId>,
    },
    IncDec {
        x: NodeId,
        inc: bool,
    },
    ExprStmt(NodeId),
    Send {
        chan: NodeId,
        value: NodeId,
    },
    Block(Vec<NodeId>),
    If {
        init: Option<NodeId>,
        cond: NodeId,
        then: NodeId,
        els: Option<NodeId>,
    },
    For {
        header: ForHeader,
        body: NodeId,
    },
    /// `tag` is a simple statement: an expression statement, or the
    /// assignment of a type switch guard.
    Switch {
        init: Option<NodeId>,
        tag: Option<NodeId>,
        clauses: Vec<NodeId>,
    },
    Select {
        clauses: Vec<NodeId>,
    },
    /// `list` is `None` for `default:`.
    CaseClause {
        list: Option<Vec<NodeId>>,
        body: Vec<NodeId>,
    },
    Return(Vec<NodeId>),
    Branch {
        kind: BranchKind,
        label: Option<String>,
    },
    Go(NodeId),
    Defer(NodeId),
    Labeled {
        label: String,
        stmt: NodeId,
    },
    DeclStmt(NodeId),
    Empty,

    // Declarations
    GenDecl {
        kind: DeclKind,
        specs: Vec<NodeId>,
        grouped: bool,
    },
    ValueSpec {
        names: Vec<String>,
        ty: Option<NodeId>,
        values: Vec<NodeId>,
    },
    TypeSpec(String),
    /// `path` keeps its quotes.
    ImportSpec {
        name: Option<String>,
        path: String,
    },
    FuncDecl {
        recv: Option<String>,
        name: String,
        signature: String,
        body: Option<NodeId>,
    },
    File {
        package: String,
        decls: Vec<NodeId>,
    },
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Ident(_) => "identifier",
            Node::BasicLit { .. } => "literal",
            Node::Binary { .. } => "binary expression",
            Node::Unary { .. } => "unary expression",
            Node::Paren(_) => "parenthesized expression",
            Node::Selector { .. } => "selector",
            Node::Index { .. } => "index expression",
            Node::Slice { .. } => "slice expression",
            Node::TypeAssert { .. } => "type assertion",
            Node::Call { .. } => "call",
            Node::CompositeLit { .. } => "composite literal",
            Node::KeyValue { .. } => "key-value pair",
            Node::FuncLit { .. } => "function literal",
            Node::Raw(_) => "type",
            Node::Assign { .. } => "assignment",
            Node::IncDec { .. } => "inc/dec statement",
            Node::ExprStmt(_) => "expression statement",
            Node::Send { .. } => "send statement",
            Node::Block(_) => "block",
            Node::If { .. } => "if statement",
            Node::For { .. } => "for statement",
            Node::Switch { .. } => "switch statement",
            Node::Select { .. } => "select statement",
            Node::CaseClause { .. } => "case clause",
            Node::Return(_) => "return statement",
            Node::Branch { .. } => "branch statement",
            Node::Go(_) => "go statement",
            Node::Defer(_) => "defer statement",
            Node::Labeled { .. } => "labeled statement",
            Node::DeclStmt(_) => "declaration statement",
            Node::Empty => "empty statement",
            Node::GenDecl { .. } => "declaration",
            Node::ValueSpec { .. } => "value spec",
            Node::TypeSpec(_) => "type spec",
            Node::ImportSpec { .. } => "import spec",
            Node::FuncDecl { .. } => "function declaration",
            Node::File { .. } => "file",
        }
    }

    pub fn is_string_lit(&self) -> bool {
        matches!(self, Node::BasicLit { kind, .. } if kind.is_string())
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Node::For { .. })
    }

    /// Children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            Node::Ident(_)
            | Node::BasicLit { .. }
            | Node::Raw(_)
            | Node::Branch { .. }
            | Node::Empty
            | Node::TypeSpec(_)
            | Node::ImportSpec { .. } => {}
            Node::Binary { x, y, .. } => out.extend([*x, *y]),
            Node::Unary { x, .. }
            | Node::Paren(x)
            | Node::Selector { x, .. }
            | Node::IncDec { x, .. }
            | Node::ExprStmt(x)
            | Node::Go(x)
            | Node::Defer(x)
            | Node::DeclStmt(x) => out.push(*x),
            Node::Index { x, indices } => {
                out.push(*x);
                out.extend(indices.iter().copied());
            }
            Node::Slice { x, low, high, max } => {
                out.push(*x);
                out.extend(low.iter().chain(high).chain(max).copied());
            }
            Node::TypeAssert { x, ty } => {
                out.push(*x);
                out.extend(ty.iter().copied());
            }
            Node::Call { fun, args, .. } => {
                out.push(*fun);
                out.extend(args.iter().copied());
            }
            Node::CompositeLit { ty, elts, .. } => {
                out.extend(ty.iter().copied());
                out.extend(elts.iter().copied());
            }
            Node::KeyValue { key, value } => out.extend([*key, *value]),
            Node::FuncLit { body, .. } => out.push(*body),
            Node::Assign { lhs, rhs, .. } => {
                out.extend(lhs.iter().copied());
                out.extend(rhs.iter().copied());
            }
            Node::Send { chan, value } => out.extend([*chan, *value]),
            Node::Block(stmts) | Node::Return(stmts) => out.extend(stmts.iter().copied()),
            Node::If {
                init,
                cond,
                then,
                els,
            } => {
                out.extend(init.iter().copied());
                out.extend([*cond, *then]);
                out.extend(els.iter().copied());
            }
            Node::For { header, body } => {
                match header {
                    ForHeader::Infinite => {}
                    ForHeader::Cond(cond) => out.push(*cond),
                    ForHeader::Clause { init, cond, post } => {
                        out.extend(init.iter().chain(cond).chain(post).copied());
                    }
                    ForHeader::Range {
                        key, value, expr, ..
                    } => {
                        out.extend(key.iter().chain(value).copied());
                        out.push(*expr);
                    }
                }
                out.push(*body);
            }
            Node::Switch { init, tag, clauses } => {
                out.extend(init.iter().chain(tag).copied());
                out.extend(clauses.iter().copied());
            }
            Node::Select { clauses } => out.extend(clauses.iter().copied()),
            Node::CaseClause { list, body } => {
                if let Some(list) = list {
                    out.extend(list.iter().copied());
                }
                out.extend(body.iter().copied());
            }
            Node::Labeled { stmt, .. } => out.push(*stmt),
            Node::GenDecl { specs, .. } => out.extend(specs.iter().copied()),
            Node::ValueSpec { ty, values, .. } => {
                out.extend(ty.iter().copied());
                out.extend(values.iter().copied());
            }
            Node::FuncDecl { body, .. } => out.extend(body.iter().copied()),
            Node::File { decls, .. } => out.extend(decls.iter().copied()),
        }
        out
    }

    /// Mutable child slots, in the same order as [`Node::children`].
    fn child_slots_mut(&mut self) -> Vec<&mut NodeId> {
        let mut out: Vec<&mut NodeId> = Vec::new();
        match self {
            Node::Ident(_)
            | Node::BasicLit { .. }
            | Node::Raw(_)
            | Node::Branch { .. }
            | Node::Empty
            | Node::TypeSpec(_)
            | Node::ImportSpec { .. } => {}
            Node::Binary { x, y, .. } => {
                out.push(x);
                out.push(y);
            }
            Node::Unary { x, .. }
            | Node::Paren(x)
            | Node::Selector { x, .. }
            | Node::IncDec { x, .. }
            | Node::ExprStmt(x)
            | Node::Go(x)
            | Node::Defer(x)
            | Node::DeclStmt(x) => out.push(x),
            Node::Index { x, indices } => {
                out.push(x);
                out.extend(indices.iter_mut());
            }
            Node::Slice { x, low, high, max } => {
                out.push(x);
                out.extend(low.as_mut());
                out.extend(high.as_mut());
                out.extend(max.as_mut());
            }
            Node::TypeAssert { x, ty } => {
                out.push(x);
                out.extend(ty.as_mut());
            }
            Node::Call { fun, args, .. } => {
                out.push(fun);
                out.extend(args.iter_mut());
            }
            Node::CompositeLit { ty, elts, .. } => {
                out.extend(ty.as_mut());
                out.extend(elts.iter_mut());
            }
            Node::KeyValue { key, value } => {
                out.push(key);
                out.push(value);
            }
            Node::FuncLit { body, .. } => out.push(body),
            Node::Assign { lhs, rhs, .. } => {
                out.extend(lhs.iter_mut());
                out.extend(rhs.iter_mut());
            }
            Node::Send { chan, value } => {
                out.push(chan);
                out.push(value);
            }
            Node::Block(stmts) | Node::Return(stmts) => out.extend(stmts.iter_mut()),
            Node::If {
                init,
                cond,
                then,
                els,
            } => {
                out.extend(init.as_mut());
                out.push(cond);
                out.push(then);
                out.extend(els.as_mut());
            }
            Node::For { header, body } => {
                match header {
                    ForHeader::Infinite => {}
                    ForHeader::Cond(cond) => out.push(cond),
                    ForHeader::Clause { init, cond, post } => {
                        out.extend(init.as_mut());
                        out.extend(cond.as_mut());
                        out.extend(post.as_mut());
                    }
                    ForHeader::Range {
                        key, value, expr, ..
                    } => {
                        out.extend(key.as_mut());
                        out.extend(value.as_mut());
                        out.push(expr);
                    }
                }
                out.push(body);
            }
            Node::Switch { init, tag, clauses } => {
                out.extend(init.as_mut());
                out.extend(tag.as_mut());
                out.extend(clauses.iter_mut());
            }
            Node::Select { clauses } => out.extend(clauses.iter_mut()),
            Node::CaseClause { list, body } => {
                if let Some(list) = list {
                    out.extend(list.iter_mut());
                }
                out.extend(body.iter_mut());
            }
            Node::Labeled { stmt, .. } => out.push(stmt),
            Node::GenDecl { specs, .. } => out.extend(specs.iter_mut()),
            Node::ValueSpec { ty, values, .. } => {
                out.extend(ty.as_mut());
                out.extend(values.iter_mut());
            }
            Node::FuncDecl { body, .. } => out.extend(body.as_mut()),
            Node::File { decls, .. } => out.extend(decls.iter_mut()),
        }
        out
    }
}

/// Byte range of a parsed node, from the start of its first token to the
/// end of its last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Strictly inside: a line starting at `start` is not within the span.
    pub fn encloses(&self, offset: usize) -> bool {
        self.start < offset && offset < self.end
    }
}

/// A source comment, `//` or `/* */` markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    /// A blank line separates this comment from whatever precedes it.
    pub blank_before: bool,
}

/// Comments and spacing attached to a node for printing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trivia {
    /// Comments on the lines above the node.
    pub leading: Vec<Comment>,
    /// Comment on the node's last line.
    pub trailing: Option<Comment>,
    /// A blank line separates the node's first token from what precedes it.
    pub blank_before: bool,
    /// Comments just before the node's closing `}` or `)`.
    pub closing: Vec<Comment>,
}

impl Trivia {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty()
            && self.trailing.is_none()
            && !self.blank_before
            && self.closing.is_empty()
    }

    fn absorb(&mut self, other: Trivia) {
        let mut leading = other.leading;
        leading.append(&mut self.leading);
        self.leading = leading;
        self.trailing = self.trailing.take().or(other.trailing);
        self.blank_before |= other.blank_before;
        self.closing.extend(other.closing);
    }
}

/// A parsed Go source file.
#[derive(Debug)]
pub struct Tree {
    nodes: Arena<Node>,
    root: NodeId,
    trivia: FxHashMap<NodeId, Trivia>,
    source: String,
    spans: FxHashMap<NodeId, Span>,
    /// Raw string literals spanning lines. Their continuation lines are
    /// literal content and must never be re-indented.
    raw_strings: Vec<Span>,
    edited: FxHashSet<NodeId>,
}

impl Tree {
    pub(crate) fn from_parts(
        nodes: Arena<Node>,
        root: NodeId,
        trivia: FxHashMap<NodeId, Trivia>,
    ) -> Self {
        Self {
            nodes,
            root,
            trivia,
            source: String::new(),
            spans: FxHashMap::default(),
            raw_strings: Vec::new(),
            edited: FxHashSet::default(),
        }
    }

    pub(crate) fn with_source(
        mut self,
        source: &str,
        spans: FxHashMap<NodeId, Span>,
        raw_strings: Vec<Span>,
    ) -> Self {
        self.source = source.to_string();
        self.spans = spans;
        self.raw_strings = raw_strings;
        self
    }

    /// The `File` node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Mutable access marks `id` edited.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.edited.insert(id);
        &mut self.nodes[id]
    }

    /// Total nodes ever allocated, reachable or not.
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id].children()
    }

    pub fn trivia(&self, id: NodeId) -> Option<&Trivia> {
        self.trivia.get(&id)
    }

    pub fn trivia_mut(&mut self, id: NodeId) -> &mut Trivia {
        self.trivia.entry(id).or_default()
    }

    /// The text the tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source range of a parsed node. Synthesized nodes have none.
    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.spans.get(&id).copied()
    }

    pub fn is_edited(&self, id: NodeId) -> bool {
        self.edited.contains(&id)
    }

    /// Whether the line beginning at `offset` continues a raw string.
    pub fn in_raw_string(&self, offset: usize) -> bool {
        self.raw_strings.iter().any(|raw| raw.encloses(offset))
    }

    /// Nodes reachable from the root whose whole subtree came from the
    /// parser and was never edited.
    pub fn untouched(&self) -> FxHashSet<NodeId> {
        let order: Vec<NodeId> = self.preorder(self.root).collect();
        let mut untouched = FxHashSet::default();
        // Reverse pre-order sees every child before its parent.
        for &id in order.iter().rev() {
            if self.spans.contains_key(&id)
                && !self.is_edited(id)
                && self.nodes[id]
                    .children()
                    .iter()
                    .all(|child| untouched.contains(child))
            {
                untouched.insert(id);
            }
        }
        untouched
    }

    /// Drops every source span so the tree prints from structure alone.
    #[cfg(test)]
    pub(crate) fn forget_source(&mut self) {
        self.spans.clear();
    }

    /// Re-points the slot of `parent` that holds `old` to `new`. With no
    /// parent, `old` must be the root. Trivia attached to `old` moves to
    /// `new`. Returns `false` when `old` is not a child of `parent`.
    /// `parent` is marked edited.
    pub fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) -> bool {
        let replaced = match parent {
            None if self.root == old => {
                self.root = new;
                true
            }
            None => false,
            Some(parent) => match self.nodes[parent]
                .child_slots_mut()
                .into_iter()
                .find(|slot| **slot == old)
            {
                Some(slot) => {
                    *slot = new;
                    true
                }
                None => false,
            },
        };
        if replaced {
            if let Some(parent) = parent {
                self.edited.insert(parent);
            }
            if let Some(moved) = self.trivia.remove(&old) {
                self.trivia.entry(new).or_default().absorb(moved);
            }
        }
        replaced
    }

    /// Pre-order, left-to-right iterator over `start` and its descendants.
    pub fn preorder(&self, start: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![start],
        }
    }

    // Builders used by the rewriters.

    pub fn ident(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(Node::Ident(name.into()))
    }

    pub fn binary(&mut self, op: BinaryOp, x: NodeId, y: NodeId) -> NodeId {
        self.alloc(Node::Binary { op, x, y })
    }

    pub fn selector(&mut self, x: NodeId, sel: impl Into<String>) -> NodeId {
        self.alloc(Node::Selector {
            x,
            sel: sel.into(),
        })
    }

    /// `recv.method(args...)`
    pub fn method_call(&mut self, recv: &str, method: &str, args: Vec<NodeId>) -> NodeId {
        let recv = self.ident(recv);
        let fun = self.selector(recv, method);
        self.alloc(Node::Call {
            fun,
            args,
            ellipsis: false,
            multiline: false,
        })
    }

    pub fn expr_stmt(&mut self, x: NodeId) -> NodeId {
        self.alloc(Node::ExprStmt(x))
    }

    pub fn assign(&mut self, lhs: Vec<NodeId>, op: AssignOp, rhs: Vec<NodeId>) -> NodeId {
        self.alloc(Node::Assign { lhs, op, rhs })
    }

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.alloc(Node::Block(stmts))
    }

    /// `var name ty`
    pub fn var_decl(&mut self, name: impl Into<String>, ty: NodeId) -> NodeId {
        let spec = self.alloc(Node::ValueSpec {
            names: vec![name.into()],
            ty: Some(ty),
            values: Vec::new(),
        });
        let decl = self.alloc(Node::GenDecl {
            kind: DeclKind::Var,
            specs: vec![spec],
            grouped: false,
        });
        self.alloc(Node::DeclStmt(decl))
    }
}

pub struct Preorder<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.get(id).children().into_iter().rev());
        Some(id)
    }
}
