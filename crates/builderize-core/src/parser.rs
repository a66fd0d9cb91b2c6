//! Recursive-descent parser for Go source files.
//!
//! The parser builds expression and statement structure in full because the
//! rewriters need it. Type expressions, function signatures and type
//! declarations are skipped with bracket balancing and kept as source slices.
//!
//! Every node records the byte span it was parsed from. Recursion is capped at
//! [`MAX_NESTING`] levels so hostile input fails with an error instead of
//! exhausting the stack.

use crate::ast::{
    AssignOp, BinaryOp, BranchKind, Comment, DeclKind, ForHeader, LitKind, Node, NodeId, Span,
    Tree, Trivia, UnaryOp,
};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};
use id_arena::Arena;
use rustc_hash::FxHashMap;

/// Deepest nesting of statements, expressions and types the parser accepts.
/// Selector, index and call links in one operand chain count as a level each.
pub const MAX_NESTING: usize = 128;

/// Parses a complete Go source file.
pub fn parse(source: &str) -> Result<Tree, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens).parse_file()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    nodes: Arena<Node>,
    trivia: FxHashMap<NodeId, Trivia>,
    spans: FxHashMap<NodeId, Span>,
    nesting: usize,
    /// Below zero inside control clause headers, where `T{` opens the body
    /// rather than a composite literal.
    expr_level: i32,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            nodes: Arena::new(),
            trivia: FxHashMap::default(),
            spans: FxHashMap::default(),
            nesting: 0,
            expr_level: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Token access
    // ---------------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn bump(&mut self) {
        if self.peek().kind != TokenKind::Eof {
            self.pos += 1;
        }
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is(text)
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), ParseError> {
        if self.eat(text) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{text}`")))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        if self.at_kind(TokenKind::Ident) {
            let name = self.peek().text.clone();
            self.bump();
            Ok(name)
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        if self.at_kind(TokenKind::Semicolon) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected("`;`"))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::Unexpected {
            line: token.line,
            column: token.column,
            found: token.describe(),
            expected: expected.to_string(),
        }
    }

    /// End offset of the most recently consumed token.
    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map_or(0, |index| self.tokens[index].end)
    }

    fn slice_from(&self, start: usize) -> String {
        self.source[start..self.prev_end().max(start)].to_string()
    }

    fn skip_semicolons(&mut self) {
        while self.at_kind(TokenKind::Semicolon) {
            self.bump();
        }
    }

    // ---------------------------------------------------------------------
    // Trivia
    // ---------------------------------------------------------------------

    /// Allocates a node parsed from `start` up to the last consumed token.
    fn finish(&mut self, start: usize, node: Node) -> NodeId {
        let id = self.nodes.alloc(node);
        let end = self.prev_end().max(start);
        self.spans.insert(id, Span { start, end });
        id
    }

    fn start_of(&self, id: NodeId) -> usize {
        self.spans.get(&id).map_or(0, |span| span.start)
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.nesting >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn too_deep(&self) -> ParseError {
        let token = self.peek();
        ParseError::TooDeep {
            line: token.line,
            column: token.column,
            limit: MAX_NESTING,
        }
    }

    /// Comments before the current token, plus whether a blank line
    /// separates the token from what came before.
    fn take_leading(&mut self) -> (Vec<Comment>, bool) {
        let token = &mut self.tokens[self.pos];
        let comments = std::mem::take(&mut token.comments)
            .into_iter()
            .map(|c| c.comment)
            .collect();
        (comments, token.blank_before)
    }

    fn take_closing(&mut self) -> Vec<Comment> {
        self.take_leading().0
    }

    /// A comment sharing the line of the previous token.
    fn take_same_line_comment(&mut self) -> Option<Comment> {
        let comments = &mut self.tokens[self.pos].comments;
        match comments.first() {
            Some(first) if !first.own_line => Some(comments.remove(0).comment),
            _ => None,
        }
    }

    fn attach(
        &mut self,
        id: NodeId,
        leading: Vec<Comment>,
        blank_before: bool,
        trailing: Option<Comment>,
    ) {
        if leading.is_empty() && !blank_before && trailing.is_none() {
            return;
        }
        let trivia = self.trivia.entry(id).or_default();
        trivia.leading = leading;
        trivia.blank_before = blank_before;
        trivia.trailing = trailing;
    }

    fn attach_closing(&mut self, id: NodeId, closing: Vec<Comment>) {
        if !closing.is_empty() {
            self.trivia.entry(id).or_default().closing = closing;
        }
    }

    /// Consumes a statement terminator and returns the comment that shared
    /// its line. A terminator may be omitted before `)` or `}`.
    fn expect_stmt_end(&mut self) -> Result<Option<Comment>, ParseError> {
        if self.at_kind(TokenKind::Semicolon) {
            let mut comments = std::mem::take(&mut self.tokens[self.pos].comments);
            self.bump();
            let trailing = match comments.first() {
                Some(first) if !first.own_line => Some(comments.remove(0).comment),
                _ => None,
            };
            if !comments.is_empty() {
                let next = &mut self.tokens[self.pos].comments;
                comments.append(next);
                *next = comments;
            }
            return Ok(trailing);
        }
        if self.at(")") || self.at("}") || self.at_kind(TokenKind::Eof) {
            return Ok(None);
        }
        Err(self.unexpected("`;` or newline"))
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn parse_file(mut self) -> Result<Tree, ParseError> {
        self.skip_semicolons();
        let (leading, blank) = self.take_leading();
        self.expect("package")?;
        let package = self.expect_ident()?;
        let trailing = self.expect_stmt_end()?;

        let mut decls = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at_kind(TokenKind::Eof) {
                break;
            }
            let (decl_leading, decl_blank) = self.take_leading();
            let decl = self.parse_decl()?;
            let decl_trailing = self.expect_stmt_end()?;
            self.attach(decl, decl_leading, decl_blank, decl_trailing);
            decls.push(decl);
        }

        let closing = self.take_closing();
        let file = self.nodes.alloc(Node::File { package, decls });
        self.attach(file, leading, blank, trailing);
        self.attach_closing(file, closing);

        // Continuation lines of these literals are content, not layout.
        let raw_strings = self
            .tokens
            .iter()
            .filter(|token| token.kind == TokenKind::RawString && token.text.contains('\n'))
            .map(|token| Span {
                start: token.start,
                end: token.end,
            })
            .collect();
        Ok(Tree::from_parts(self.nodes, file, self.trivia).with_source(
            self.source,
            self.spans,
            raw_strings,
        ))
    }

    fn parse_decl(&mut self) -> Result<NodeId, ParseError> {
        let kind = match self.peek().text.as_str() {
            "import" => DeclKind::Import,
            "const" => DeclKind::Const,
            "var" => DeclKind::Var,
            "type" => DeclKind::Type,
            "func" => return self.parse_func_decl(),
            _ => return Err(self.unexpected("declaration")),
        };
        self.parse_gen_decl(kind)
    }

    fn parse_gen_decl(&mut self, kind: DeclKind) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        self.bump();
        if !self.eat("(") {
            let spec = self.parse_spec(kind)?;
            return Ok(self.finish(
                start,
                Node::GenDecl {
                    kind,
                    specs: vec![spec],
                    grouped: false,
                },
            ));
        }

        let mut specs = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at(")") || self.at_kind(TokenKind::Eof) {
                break;
            }
            let (leading, blank) = self.take_leading();
            let spec = self.parse_spec(kind)?;
            let trailing = self.expect_stmt_end()?;
            self.attach(spec, leading, blank, trailing);
            specs.push(spec);
        }
        let closing = self.take_closing();
        self.expect(")")?;
        let decl = self.finish(
            start,
            Node::GenDecl {
                kind,
                specs,
                grouped: true,
            },
        );
        self.attach_closing(decl, closing);
        Ok(decl)
    }

    fn parse_spec(&mut self, kind: DeclKind) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        match kind {
            DeclKind::Import => {
                let name = if self.at_kind(TokenKind::Ident) {
                    Some(self.expect_ident()?)
                } else if self.eat(".") {
                    Some(".".to_string())
                } else {
                    None
                };
                if !matches!(self.peek().kind, TokenKind::String | TokenKind::RawString) {
                    return Err(self.unexpected("import path"));
                }
                let path = self.peek().text.clone();
                self.bump();
                Ok(self.finish(start, Node::ImportSpec { name, path }))
            }
            DeclKind::Type => {
                let mut depth = 0usize;
                loop {
                    let token = self.peek();
                    match token.kind {
                        TokenKind::Eof => break,
                        TokenKind::Semicolon if depth == 0 => break,
                        TokenKind::Op if token.text == ")" && depth == 0 => break,
                        TokenKind::Op if matches!(token.text.as_str(), "(" | "[" | "{") => {
                            depth += 1
                        }
                        TokenKind::Op if matches!(token.text.as_str(), ")" | "]" | "}") => {
                            depth = depth.saturating_sub(1)
                        }
                        _ => {}
                    }
                    self.bump();
                }
                let text = self.slice_from(start);
                Ok(self.finish(start, Node::TypeSpec(text)))
            }
            DeclKind::Const | DeclKind::Var => {
                let mut names = vec![self.expect_ident()?];
                while self.eat(",") {
                    names.push(self.expect_ident()?);
                }
                let ty = if self.at("=")
                    || self.at(")")
                    || self.at_kind(TokenKind::Semicolon)
                    || self.at_kind(TokenKind::Eof)
                {
                    None
                } else {
                    Some(self.parse_type()?)
                };
                let values = if self.eat("=") {
                    self.parse_expr_list()?
                } else {
                    Vec::new()
                };
                Ok(self.finish(start, Node::ValueSpec { names, ty, values }))
            }
        }
    }

    fn parse_func_decl(&mut self) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        self.expect("func")?;
        let recv = if self.at("(") {
            let recv_start = self.peek().start;
            self.skip_balanced()?;
            Some(self.slice_from(recv_start))
        } else {
            None
        };
        let name = self.expect_ident()?;
        let sig_start = self.peek().start;
        self.skip_signature(true)?;
        let signature = self.slice_from(sig_start);
        let body = if self.at("{") {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(self.finish(
            start,
            Node::FuncDecl {
                recv,
                name,
                signature,
                body,
            },
        ))
    }

    // ---------------------------------------------------------------------
    // Types and signatures
    // ---------------------------------------------------------------------

    /// Skips a bracketed group starting at the current open bracket.
    fn skip_balanced(&mut self) -> Result<(), ParseError> {
        if !(self.at("(") || self.at("[") || self.at("{")) {
            return Err(self.unexpected("`(`, `[` or `{`"));
        }
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return Err(self.unexpected("closing bracket")),
                TokenKind::Op if matches!(token.text.as_str(), "(" | "[" | "{") => depth += 1,
                TokenKind::Op if matches!(token.text.as_str(), ")" | "]" | "}") => depth -= 1,
                _ => {}
            }
            self.bump();
            if depth == 0 {
                return Ok(());
            }
        }
    }

    fn starts_type(token: &Token) -> bool {
        match token.kind {
            TokenKind::Ident => true,
            TokenKind::Op => matches!(token.text.as_str(), "*" | "[" | "(" | "<-"),
            TokenKind::Keyword => matches!(
                token.text.as_str(),
                "map" | "chan" | "func" | "struct" | "interface"
            ),
            _ => false,
        }
    }

    fn skip_type(&mut self) -> Result<(), ParseError> {
        self.nested(Self::skip_type_inner)
    }

    fn skip_type_inner(&mut self) -> Result<(), ParseError> {
        let token = self.peek();
        match (token.kind, token.text.as_str()) {
            (TokenKind::Ident, _) => {
                self.bump();
                if self.at(".") && self.peek_at(1).kind == TokenKind::Ident {
                    self.bump();
                    self.bump();
                }
                if self.at("[") {
                    self.skip_balanced()?;
                }
                Ok(())
            }
            (TokenKind::Op, "*") => {
                self.bump();
                self.skip_type()
            }
            (TokenKind::Op, "(") => self.skip_balanced(),
            (TokenKind::Op, "[") => {
                self.skip_balanced()?;
                self.skip_type()
            }
            (TokenKind::Op, "<-") => {
                self.bump();
                self.expect("chan")?;
                self.skip_type()
            }
            (TokenKind::Keyword, "map") => {
                self.bump();
                self.skip_balanced()?;
                self.skip_type()
            }
            (TokenKind::Keyword, "chan") => {
                self.bump();
                self.eat("<-");
                self.skip_type()
            }
            (TokenKind::Keyword, "func") => {
                self.bump();
                self.skip_signature(false)
            }
            (TokenKind::Keyword, "struct" | "interface") => {
                self.bump();
                self.skip_balanced()
            }
            _ => Err(self.unexpected("type")),
        }
    }

    /// Skips optional type parameters, the parameter list and the result.
    fn skip_signature(&mut self, type_params: bool) -> Result<(), ParseError> {
        if type_params && self.at("[") {
            self.skip_balanced()?;
        }
        if !self.at("(") {
            return Err(self.unexpected("`(`"));
        }
        self.skip_balanced()?;
        if self.at("(") {
            self.skip_balanced()?;
        } else if Self::starts_type(self.peek()) {
            self.skip_type()?;
        }
        Ok(())
    }

    /// Simple type names become `Ident` or `Selector` nodes; anything else
    /// is kept verbatim.
    fn parse_type(&mut self) -> Result<NodeId, ParseError> {
        if self.at_kind(TokenKind::Ident) {
            let qualified =
                self.peek_at(1).is(".") && self.peek_at(2).kind == TokenKind::Ident;
            let follower = if qualified { 3 } else { 1 };
            let start = self.peek().start;
            if !self.peek_at(follower).is("[") {
                let name = self.expect_ident()?;
                let mut ty = self.finish(start, Node::Ident(name));
                if qualified {
                    self.bump();
                    let sel = self.expect_ident()?;
                    ty = self.finish(start, Node::Selector { x: ty, sel });
                }
                return Ok(ty);
            }
        }
        let start = self.peek().start;
        self.skip_type()?;
        let text = self.slice_from(start);
        Ok(self.finish(start, Node::Raw(text)))
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        self.expect("{")?;
        let saved = std::mem::replace(&mut self.expr_level, 0);
        let stmts = self.parse_stmt_list()?;
        self.expr_level = saved;
        let closing = self.take_closing();
        self.expect("}")?;
        let block = self.finish(start, Node::Block(stmts));
        self.attach_closing(block, closing);
        Ok(block)
    }

    fn parse_stmt_list(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at("}")
                || self.at("case")
                || self.at("default")
                || self.at_kind(TokenKind::Eof)
            {
                return Ok(stmts);
            }
            let (leading, blank) = self.take_leading();
            let stmt = self.parse_stmt()?;
            let trailing = self.expect_stmt_end()?;
            self.attach(stmt, leading, blank, trailing);
            stmts.push(stmt);
        }
    }

    fn parse_stmt(&mut self) -> Result<NodeId, ParseError> {
        self.nested(Self::parse_stmt_inner)
    }

    fn parse_stmt_inner(&mut self) -> Result<NodeId, ParseError> {
        let token = self.peek();
        let start = token.start;
        match (token.kind, token.text.as_str()) {
            (TokenKind::Keyword, "var") => self.parse_decl_stmt(DeclKind::Var),
            (TokenKind::Keyword, "const") => self.parse_decl_stmt(DeclKind::Const),
            (TokenKind::Keyword, "type") => self.parse_decl_stmt(DeclKind::Type),
            (TokenKind::Keyword, "return") => {
                self.bump();
                let results = if self.at_kind(TokenKind::Semicolon) || self.at("}") {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Ok(self.finish(start, Node::Return(results)))
            }
            (TokenKind::Keyword, "break") => self.parse_branch(BranchKind::Break),
            (TokenKind::Keyword, "continue") => self.parse_branch(BranchKind::Continue),
            (TokenKind::Keyword, "goto") => self.parse_branch(BranchKind::Goto),
            (TokenKind::Keyword, "fallthrough") => self.parse_branch(BranchKind::Fallthrough),
            (TokenKind::Keyword, "go") => {
                self.bump();
                let call = self.parse_expr()?;
                Ok(self.finish(start, Node::Go(call)))
            }
            (TokenKind::Keyword, "defer") => {
                self.bump();
                let call = self.parse_expr()?;
                Ok(self.finish(start, Node::Defer(call)))
            }
            (TokenKind::Keyword, "if") => self.parse_if(),
            (TokenKind::Keyword, "for") => self.parse_for(),
            (TokenKind::Keyword, "switch") => self.parse_switch(),
            (TokenKind::Keyword, "select") => self.parse_select(),
            (TokenKind::Op, "{") => self.parse_block(),
            (TokenKind::Ident, _) if self.peek_at(1).is(":") => {
                let label = self.expect_ident()?;
                self.bump();
                let stmt = if self.at("}") || self.at_kind(TokenKind::Eof) {
                    let end = self.prev_end();
                    self.finish(end, Node::Empty)
                } else {
                    self.parse_stmt()?
                };
                Ok(self.finish(start, Node::Labeled { label, stmt }))
            }
            _ => self.parse_simple_stmt(),
        }
    }

    fn parse_decl_stmt(&mut self, kind: DeclKind) -> Result<NodeId, ParseError> {
        let decl = self.parse_gen_decl(kind)?;
        let start = self.start_of(decl);
        Ok(self.finish(start, Node::DeclStmt(decl)))
    }

    fn parse_branch(&mut self, kind: BranchKind) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        self.bump();
        let label = if kind != BranchKind::Fallthrough && self.at_kind(TokenKind::Ident) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        Ok(self.finish(start, Node::Branch { kind, label }))
    }

    fn parse_simple_stmt(&mut self) -> Result<NodeId, ParseError> {
        let lhs = self.parse_expr_list()?;
        self.finish_simple_stmt(lhs)
    }

    fn finish_simple_stmt(&mut self, mut lhs: Vec<NodeId>) -> Result<NodeId, ParseError> {
        let start = lhs.first().map_or(0, |&first| self.start_of(first));
        let token = self.peek();
        if token.kind == TokenKind::Op {
            if let Some(op) = AssignOp::from_token(&token.text) {
                self.bump();
                let rhs = self.parse_expr_list()?;
                return Ok(self.finish(start, Node::Assign { lhs, op, rhs }));
            }
            if (token.text == "++" || token.text == "--") && lhs.len() == 1 {
                let inc = token.text == "++";
                self.bump();
                return Ok(self.finish(start, Node::IncDec { x: lhs[0], inc }));
            }
            if token.text == "<-" && lhs.len() == 1 {
                self.bump();
                let value = self.parse_expr()?;
                return Ok(self.finish(
                    start,
                    Node::Send {
                        chan: lhs[0],
                        value,
                    },
                ));
            }
        }
        if lhs.len() != 1 {
            return Err(self.unexpected("assignment operator"));
        }
        let x = lhs.remove(0);
        Ok(self.finish(start, Node::ExprStmt(x)))
    }

    fn stmt_expr(&self, stmt: NodeId) -> Result<NodeId, ParseError> {
        match self.nodes[stmt] {
            Node::ExprStmt(x) => Ok(x),
            _ => Err(self.unexpected("condition expression")),
        }
    }

    /// An `else if` chain is read in a loop and assembled innermost first,
    /// so its length does not count toward the nesting limit.
    fn parse_if(&mut self) -> Result<NodeId, ParseError> {
        let mut heads = Vec::new();
        let mut els = loop {
            let start = self.peek().start;
            self.expect("if")?;
            let saved = std::mem::replace(&mut self.expr_level, -1);
            let mut init = None;
            let stmt = self.parse_simple_stmt()?;
            let cond = if self.at_kind(TokenKind::Semicolon) {
                self.bump();
                init = Some(stmt);
                self.parse_expr()?
            } else {
                self.stmt_expr(stmt)?
            };
            self.expr_level = saved;
            let then = self.parse_block()?;
            heads.push((start, init, cond, then));

            if !self.eat("else") {
                break None;
            }
            if self.at("{") {
                break Some(self.parse_block()?);
            }
            if !self.at("if") {
                return Err(self.unexpected("`if` or `{`"));
            }
        };

        for (start, init, cond, then) in heads.into_iter().rev() {
            els = Some(self.finish(
                start,
                Node::If {
                    init,
                    cond,
                    then,
                    els,
                },
            ));
        }
        els.ok_or_else(|| self.unexpected("`if`"))
    }

    fn parse_for(&mut self) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        self.expect("for")?;
        let saved = std::mem::replace(&mut self.expr_level, -1);
        let header = self.parse_for_header()?;
        self.expr_level = saved;
        let body = self.parse_block()?;
        Ok(self.finish(start, Node::For { header, body }))
    }

    fn parse_for_header(&mut self) -> Result<ForHeader, ParseError> {
        if self.at("{") {
            return Ok(ForHeader::Infinite);
        }
        if self.eat("range") {
            let expr = self.parse_expr()?;
            return Ok(ForHeader::Range {
                key: None,
                value: None,
                define: false,
                expr,
            });
        }

        let mut init = None;
        if !self.at_kind(TokenKind::Semicolon) {
            let lhs = self.parse_expr_list()?;
            if (self.at(":=") || self.at("=")) && self.peek_at(1).is("range") {
                let define = self.at(":=");
                self.bump();
                self.bump();
                let expr = self.parse_expr()?;
                return Ok(ForHeader::Range {
                    key: lhs.first().copied(),
                    value: lhs.get(1).copied(),
                    define,
                    expr,
                });
            }
            let stmt = self.finish_simple_stmt(lhs)?;
            if self.at("{") {
                return Ok(ForHeader::Cond(self.stmt_expr(stmt)?));
            }
            init = Some(stmt);
        }

        self.expect_semicolon()?;
        let cond = if self.at_kind(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_semicolon()?;
        let post = if self.at("{") {
            None
        } else {
            Some(self.parse_simple_stmt()?)
        };
        Ok(ForHeader::Clause { init, cond, post })
    }

    fn parse_switch(&mut self) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        self.expect("switch")?;
        let saved = std::mem::replace(&mut self.expr_level, -1);
        let mut init = None;
        let mut tag = None;
        if !self.at("{") {
            let first = if self.at_kind(TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_simple_stmt()?)
            };
            if self.at_kind(TokenKind::Semicolon) {
                self.bump();
                init = first;
                if !self.at("{") {
                    tag = Some(self.parse_simple_stmt()?);
                }
            } else {
                tag = first;
            }
        }
        self.expr_level = saved;

        let (clauses, closing) = self.parse_clauses(false)?;
        let switch = self.finish(start, Node::Switch { init, tag, clauses });
        self.attach_closing(switch, closing);
        Ok(switch)
    }

    fn parse_select(&mut self) -> Result<NodeId, ParseError> {
        let start = self.peek().start;
        self.expect("select")?;
        let (clauses, closing) = self.parse_clauses(true)?;
        let select = self.finish(start, Node::Select { clauses });
        self.attach_closing(select, closing);
        Ok(select)
    }

    fn parse_clauses(&mut self, comm: bool) -> Result<(Vec<NodeId>, Vec<Comment>), ParseError> {
        self.expect("{")?;
        let saved = std::mem::replace(&mut self.expr_level, 0);
        let mut clauses = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at("}") || self.at_kind(TokenKind::Eof) {
                break;
            }
            let (leading, blank) = self.take_leading();
            let start = self.peek().start;
            let list = if self.eat("default") {
                None
            } else {
                self.expect("case")?;
                if comm {
                    Some(vec![self.parse_simple_stmt()?])
                } else {
                    Some(self.parse_expr_list()?)
                }
            };
            self.expect(":")?;
            let trailing = self.take_same_line_comment();
            let body = self.parse_stmt_list()?;
            let clause = self.finish(start, Node::CaseClause { list, body });
            self.attach(clause, leading, blank, trailing);
            clauses.push(clause);
        }
        self.expr_level = saved;
        let closing = self.take_closing();
        self.expect("}")?;
        Ok((clauses, closing))
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn parse_expr_list(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut list = vec![self.parse_expr()?];
        while self.eat(",") {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    pub(crate) fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<NodeId, ParseError> {
        let mut x = self.parse_unary()?;
        loop {
            let token = self.peek();
            if token.kind != TokenKind::Op {
                break;
            }
            let Some(op) = BinaryOp::from_token(&token.text) else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let y = self.parse_binary(prec + 1)?;
            let start = self.start_of(x);
            x = self.finish(start, Node::Binary { op, x, y });
        }
        Ok(x)
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        self.nested(Self::parse_unary_inner)
    }

    fn parse_unary_inner(&mut self) -> Result<NodeId, ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::Op {
            if let Some(op) = UnaryOp::from_token(&token.text) {
                let start = token.start;
                self.bump();
                if op == UnaryOp::Recv && self.at("chan") {
                    self.skip_type()?;
                    let text = self.slice_from(start);
                    return Ok(self.finish(start, Node::Raw(text)));
                }
                let x = self.parse_unary()?;
                return Ok(self.finish(start, Node::Unary { op, x }));
            }
        }
        self.parse_primary()
    }

    /// An operand and its selector, index, call and literal links. Each
    /// link holds one nesting level until the chain ends.
    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let mut x = self.parse_operand()?;
        let start = self.start_of(x);
        let base = self.nesting;
        loop {
            if self.eat(".") {
                if self.eat("(") {
                    let ty = if self.eat("type") {
                        None
                    } else {
                        Some(self.parse_type()?)
                    };
                    self.expect(")")?;
                    x = self.finish(start, Node::TypeAssert { x, ty });
                } else {
                    let sel = self.expect_ident()?;
                    x = self.finish(start, Node::Selector { x, sel });
                }
            } else if self.at("[") {
                x = self.parse_index_or_slice(start, x)?;
            } else if self.at("(") {
                x = self.parse_call(start, x)?;
            } else if self.at("{") && self.composite_allowed(x) {
                x = self.parse_composite(start, Some(x))?;
            } else {
                self.nesting = base;
                return Ok(x);
            }
            if self.nesting >= MAX_NESTING {
                return Err(self.too_deep());
            }
            self.nesting += 1;
        }
    }

    fn is_type_name(&self, x: NodeId) -> bool {
        match &self.nodes[x] {
            Node::Ident(_) => true,
            Node::Selector { x, .. } => matches!(self.nodes[*x], Node::Ident(_)),
            _ => false,
        }
    }

    fn composite_allowed(&self, x: NodeId) -> bool {
        match &self.nodes[x] {
            Node::Raw(_) => true,
            _ => self.is_type_name(x) && self.expr_level >= 0,
        }
    }

    fn parse_operand(&mut self) -> Result<NodeId, ParseError> {
        let token = self.peek();
        let start = token.start;
        let lit_kind = match token.kind {
            TokenKind::Int => Some(LitKind::Int),
            TokenKind::Float => Some(LitKind::Float),
            TokenKind::Imag => Some(LitKind::Imag),
            TokenKind::Char => Some(LitKind::Char),
            TokenKind::String => Some(LitKind::String),
            TokenKind::RawString => Some(LitKind::RawString),
            _ => None,
        };
        if let Some(kind) = lit_kind {
            let value = token.text.clone();
            self.bump();
            return Ok(self.finish(start, Node::BasicLit { kind, value }));
        }

        match (token.kind, token.text.as_str()) {
            (TokenKind::Ident, _) => {
                let name = self.expect_ident()?;
                Ok(self.finish(start, Node::Ident(name)))
            }
            (TokenKind::Op, "(") => {
                self.bump();
                self.expr_level += 1;
                let x = self.parse_expr()?;
                self.expr_level -= 1;
                self.expect(")")?;
                Ok(self.finish(start, Node::Paren(x)))
            }
            (TokenKind::Keyword, "func") => {
                self.bump();
                let sig_start = self.peek().start;
                self.skip_signature(false)?;
                if self.at("{") {
                    let signature = self.slice_from(sig_start);
                    let body = self.parse_block()?;
                    Ok(self.finish(start, Node::FuncLit { signature, body }))
                } else {
                    let text = self.slice_from(start);
                    Ok(self.finish(start, Node::Raw(text)))
                }
            }
            (TokenKind::Op, "[")
            | (TokenKind::Keyword, "map" | "chan" | "struct" | "interface") => {
                self.skip_type()?;
                let text = self.slice_from(start);
                Ok(self.finish(start, Node::Raw(text)))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_index_or_slice(&mut self, start: usize, x: NodeId) -> Result<NodeId, ParseError> {
        self.expect("[")?;
        self.expr_level += 1;
        let first = if self.at(":") {
            None
        } else {
            Some(self.parse_expr()?)
        };

        let node = if self.eat(":") {
            let high = if self.at(":") || self.at("]") {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let max = if self.eat(":") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            Node::Slice {
                x,
                low: first,
                high,
                max,
            }
        } else {
            let Some(first) = first else {
                return Err(self.unexpected("index"));
            };
            let mut indices = vec![first];
            while self.eat(",") {
                if self.at("]") {
                    break;
                }
                indices.push(self.parse_expr()?);
            }
            Node::Index { x, indices }
        };
        self.expr_level -= 1;
        self.expect("]")?;
        Ok(self.finish(start, node))
    }

    fn parse_call(&mut self, start: usize, fun: NodeId) -> Result<NodeId, ParseError> {
        let open_line = self.peek().line;
        self.expect("(")?;
        self.expr_level += 1;
        let mut args = Vec::new();
        let mut ellipsis = false;
        let mut multiline = false;
        while !self.at(")") {
            if args.is_empty() {
                multiline = self.peek().line > open_line;
            }
            args.push(self.parse_expr()?);
            if self.eat("...") {
                ellipsis = true;
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expr_level -= 1;
        self.expect(")")?;
        Ok(self.finish(
            start,
            Node::Call {
                fun,
                args,
                ellipsis,
                multiline,
            },
        ))
    }

    fn parse_composite(
        &mut self,
        start: usize,
        ty: Option<NodeId>,
    ) -> Result<NodeId, ParseError> {
        let open_line = self.peek().line;
        self.expect("{")?;
        self.expr_level += 1;
        let mut elts = Vec::new();
        let mut multiline = false;
        while !self.at("}") {
            if elts.is_empty() {
                multiline = self.peek().line > open_line;
            }
            let mut elt = self.parse_element()?;
            if self.eat(":") {
                let value = self.parse_element()?;
                let key_start = self.start_of(elt);
                elt = self.finish(key_start, Node::KeyValue { key: elt, value });
            }
            elts.push(elt);
            if !self.eat(",") {
                break;
            }
        }
        self.expr_level -= 1;
        self.expect("}")?;
        Ok(self.finish(
            start,
            Node::CompositeLit {
                ty,
                elts,
                multiline,
            },
        ))
    }

    /// Elements with an elided type nest without passing through
    /// [`Self::parse_unary`], so they take their own nesting level.
    fn parse_element(&mut self) -> Result<NodeId, ParseError> {
        if self.at("{") {
            let start = self.peek().start;
            self.nested(|parser| parser.parse_composite(start, None))
        } else {
            self.parse_expr()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(tree: &Tree) -> Vec<&'static str> {
        tree.preorder(tree.root())
            .map(|id| tree.get(id).kind_name())
            .collect()
    }

    fn func_body(tree: &Tree) -> Vec<NodeId> {
        let Node::File { decls, .. } = tree.get(tree.root()) else {
            panic!("root is not a file");
        };
        let func = decls
            .iter()
            .copied()
            .find(|d| matches!(tree.get(*d), Node::FuncDecl { .. }))
            .unwrap();
        let Node::FuncDecl {
            body: Some(body), ..
        } = tree.get(func)
        else {
            panic!("function has no body");
        };
        let Node::Block(stmts) = tree.get(*body) else {
            panic!("body is not a block");
        };
        stmts.clone()
    }

    #[test]
    fn test_parse_package_and_imports() {
        let tree = parse(indoc! {r#"
            package main

            import (
                "fmt"
                str "strings"
            )
        "#})
        .unwrap();
        let Node::File { package, decls } = tree.get(tree.root()) else {
            panic!("root is not a file");
        };
        assert_eq!(package, "main");
        let Node::GenDecl {
            kind,
            specs,
            grouped,
        } = tree.get(decls[0])
        else {
            panic!("expected import decl");
        };
        assert_eq!(*kind, DeclKind::Import);
        assert!(*grouped);
        assert_eq!(
            tree.get(specs[1]),
            &Node::ImportSpec {
                name: Some("str".into()),
                path: "\"strings\"".into()
            }
        );
    }

    #[test]
    fn test_parse_add_assign() {
        let tree = parse("package p\nfunc f() {\n\ts += \"a\" + b\n}\n").unwrap();
        let stmts = func_body(&tree);
        let Node::Assign { lhs, op, rhs } = tree.get(stmts[0]) else {
            panic!("expected assignment");
        };
        assert!(op.is_add_assign());
        assert_eq!(tree.get(lhs[0]), &Node::Ident("s".into()));
        assert!(matches!(
            tree.get(rhs[0]),
            Node::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_binary_precedence() {
        let tree = parse("package p\nfunc f() {\n\tx = a + b*c - d\n}\n").unwrap();
        let stmts = func_body(&tree);
        let Node::Assign { rhs, .. } = tree.get(stmts[0]) else {
            panic!("expected assignment");
        };
        // ((a + (b*c)) - d)
        let Node::Binary { op, x, .. } = tree.get(rhs[0]) else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Sub);
        let Node::Binary { op, y, .. } = tree.get(*x) else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            tree.get(*y),
            Node::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_for_headers() {
        let tree = parse(indoc! {r#"
            package p

            func f() {
                for {
                }
                for ok {
                }
                for i := 0; i < n; i++ {
                }
                for k, v := range m {
                }
                for range ch {
                }
            }
        "#})
        .unwrap();
        let headers: Vec<_> = func_body(&tree)
            .into_iter()
            .map(|s| match tree.get(s) {
                Node::For { header, .. } => header.clone(),
                other => panic!("expected for, got {}", other.kind_name()),
            })
            .collect();
        assert_eq!(headers[0], ForHeader::Infinite);
        assert!(matches!(headers[1], ForHeader::Cond(_)));
        assert!(matches!(
            headers[2],
            ForHeader::Clause {
                init: Some(_),
                cond: Some(_),
                post: Some(_)
            }
        ));
        assert!(matches!(
            headers[3],
            ForHeader::Range {
                key: Some(_),
                value: Some(_),
                define: true,
                ..
            }
        ));
        assert!(matches!(
            headers[4],
            ForHeader::Range {
                key: None,
                value: None,
                ..
            }
        ));
    }

    #[test]
    fn test_composite_literal_in_header_needs_parens() {
        // `T{` in an if header opens the body.
        let tree = parse("package p\nfunc f() {\n\tif x == y {\n\t}\n}\n").unwrap();
        let stmts = func_body(&tree);
        assert!(matches!(tree.get(stmts[0]), Node::If { .. }));

        let tree = parse("package p\nfunc f() {\n\tif x == (T{}) {\n\t}\n}\n").unwrap();
        assert!(kinds(&tree).contains(&"composite literal"));
    }

    #[test]
    fn test_types_are_raw() {
        let tree = parse(indoc! {r#"
            package p

            type Point struct {
                X, Y int
            }

            func f(xs []int) (int, error) {
                m := map[string][]int{"a": {1, 2}}
                var b strings.Builder
                return len(m), nil
            }
        "#})
        .unwrap();
        let Node::File { decls, .. } = tree.get(tree.root()) else {
            panic!("root is not a file");
        };
        let Node::GenDecl { specs, .. } = tree.get(decls[0]) else {
            panic!("expected type decl");
        };
        assert_eq!(
            tree.get(specs[0]),
            &Node::TypeSpec("Point struct {\n    X, Y int\n}".into())
        );
        let Node::FuncDecl { signature, .. } = tree.get(decls[1]) else {
            panic!("expected func");
        };
        assert_eq!(signature, "(xs []int) (int, error)");
        assert!(tree
            .preorder(tree.root())
            .any(|id| tree.get(id) == &Node::Raw("map[string][]int".into())));
        assert!(tree.preorder(tree.root()).any(|id| matches!(
            tree.get(id),
            Node::Selector { sel, .. } if sel == "Builder"
        )));
    }

    #[test]
    fn test_labeled_loop_and_branch() {
        let tree = parse(indoc! {r#"
            package p

            func f() {
            outer:
                for {
                    break outer
                }
            }
        "#})
        .unwrap();
        let stmts = func_body(&tree);
        let Node::Labeled { label, stmt } = tree.get(stmts[0]) else {
            panic!("expected labeled statement");
        };
        assert_eq!(label, "outer");
        assert!(tree.get(*stmt).is_loop());
        assert!(tree.preorder(tree.root()).any(|id| tree.get(id)
            == &Node::Branch {
                kind: BranchKind::Break,
                label: Some("outer".into())
            }));
    }

    #[test]
    fn test_switch_and_select() {
        let tree = parse(indoc! {r#"
            package p

            func f(v interface{}) {
                switch x := v.(type) {
                case int, string:
                    return
                default:
                }
                select {
                case msg := <-ch:
                    use(msg)
                case out <- 1:
                }
            }
        "#})
        .unwrap();
        let stmts = func_body(&tree);
        let Node::Switch { tag: Some(tag), clauses, .. } = tree.get(stmts[0]) else {
            panic!("expected switch");
        };
        assert!(matches!(tree.get(*tag), Node::Assign { .. }));
        assert_eq!(clauses.len(), 2);
        let Node::Select { clauses } = tree.get(stmts[1]) else {
            panic!("expected select");
        };
        let Node::CaseClause { list: Some(list), .. } = tree.get(clauses[1]) else {
            panic!("expected case");
        };
        assert!(matches!(tree.get(list[0]), Node::Send { .. }));
    }

    #[test]
    fn test_comments_become_trivia() {
        let tree = parse(indoc! {r#"
            package p

            func f() {
                // leading
                x := 1 // trailing

                y := 2
            }
        "#})
        .unwrap();
        let stmts = func_body(&tree);
        let first = tree.trivia(stmts[0]).unwrap();
        assert_eq!(first.leading[0].text, "// leading");
        assert_eq!(first.trailing.as_ref().unwrap().text, "// trailing");
        assert!(tree.trivia(stmts[1]).unwrap().blank_before);
    }

    #[test]
    fn test_func_literal_and_call() {
        let tree = parse(indoc! {r#"
            package p

            func f() {
                go func(n int) {
                    s += "x"
                }(3)
            }
        "#})
        .unwrap();
        assert!(kinds(&tree).contains(&"function literal"));
        assert!(kinds(&tree).contains(&"go statement"));
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse("package p\nfunc f() {\n\tx := \n}\n").unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { line: 4, .. }));
    }

    #[test]
    fn test_missing_package_clause() {
        let err = parse("func f() {}\n").unwrap_err();
        assert!(err.to_string().contains("expected `package`"));
    }
    // ========================================================================
    // Source spans
    // ========================================================================

    fn span_text(tree: &Tree, id: NodeId) -> &str {
        let span = tree.span(id).unwrap();
        &tree.source()[span.start..span.end]
    }

    #[test]
    fn test_spans_cover_node_text() {
        let tree = parse(indoc! {r#"
            package p

            func f() {
            	m := map[string]int{
            		"a":   1, // one
            		"bcd": 2,
            	}
            	if x := g(m); x > 0 { // positive
            		return
            	}
            }
        "#})
        .unwrap();
        let stmts = func_body(&tree);
        assert_eq!(
            span_text(&tree, stmts[0]),
            "m := map[string]int{\n\t\t\"a\":   1, // one\n\t\t\"bcd\": 2,\n\t}"
        );
        assert!(span_text(&tree, stmts[1]).starts_with("if x := g(m); x > 0 {"));
        assert!(span_text(&tree, stmts[1]).ends_with("return\n\t}"));

        let pair = tree
            .preorder(tree.root())
            .find(|id| matches!(tree.get(*id), Node::KeyValue { .. }))
            .unwrap();
        assert_eq!(span_text(&tree, pair), "\"a\":   1");
    }

    #[test]
    fn test_else_if_chain_shares_end() {
        let tree = parse(indoc! {r#"
            package p

            func f(n int) {
            	if n == 1 {
            	} else if n == 2 {
            	} else {
            	}
            }
        "#})
        .unwrap();
        let stmts = func_body(&tree);
        let Node::If { els: Some(inner), .. } = tree.get(stmts[0]) else {
            panic!("expected if");
        };
        assert!(span_text(&tree, *inner).starts_with("if n == 2"));
        assert_eq!(
            tree.span(*inner).unwrap().end,
            tree.span(stmts[0]).unwrap().end
        );
    }

    #[test]
    fn test_raw_string_lines_are_recorded() {
        let tree = parse("package p\n\nvar v = `a\nb`\n").unwrap();
        let newline = tree.source().find("a\n").unwrap() + 2;
        assert!(tree.in_raw_string(newline));
        assert!(!tree.in_raw_string(0));
    }

    // ========================================================================
    // Nesting limit
    // ========================================================================

    #[test]
    fn test_deep_parens_are_rejected() {
        let depth = 3000;
        let source = format!(
            "package p\n\nvar v = {}x{}\n",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let err = parse(&source).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TooDeep {
                line: 3,
                limit: MAX_NESTING,
                ..
            }
        ));
        assert!(err.to_string().contains("nesting deeper than 128 levels"));
    }

    #[test]
    fn test_deep_blocks_and_unary_are_rejected() {
        let blocks = format!(
            "package p\n\nfunc f() {{\n{}{}\n}}\n",
            "{".repeat(500),
            "}".repeat(500)
        );
        assert!(matches!(parse(&blocks), Err(ParseError::TooDeep { .. })));

        let unary = format!("package p\n\nvar v = {}x\n", "!".repeat(500));
        assert!(matches!(parse(&unary), Err(ParseError::TooDeep { .. })));

        let elided = format!(
            "package p\n\nvar v = [][]int{}{}\n",
            "{".repeat(500),
            "}".repeat(500)
        );
        assert!(matches!(parse(&elided), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn test_long_selector_chain_is_rejected() {
        let short = format!("package p\n\nvar v = x{}\n", ".f()".repeat(40));
        assert!(parse(&short).is_ok());
        let long = format!("package p\n\nvar v = x{}\n", ".f()".repeat(2000));
        assert!(matches!(parse(&long), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn test_long_flat_constructs_are_accepted() {
        let terms = vec!["x"; 5000].join(" + ");
        let chain = parse(&format!("package p\n\nvar v = {terms}\n")).unwrap();
        let adds = chain
            .preorder(chain.root())
            .filter(|id| matches!(chain.get(*id), Node::Binary { .. }))
            .count();
        assert_eq!(adds, 4999);

        let arms: String = (0..2000)
            .map(|i| format!(" else if n == {i} {{\n\t}}"))
            .collect();
        let source = format!("package p\n\nfunc f(n int) {{\n\tif n < 0 {{\n\t}}{arms}\n}}\n");
        let tree = parse(&source).unwrap();
        let ifs = tree
            .preorder(tree.root())
            .filter(|id| matches!(tree.get(*id), Node::If { .. }))
            .count();
        assert_eq!(ifs, 2001);
    }
}
