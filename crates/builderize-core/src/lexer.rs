//! Go tokenizer with automatic semicolon insertion.
//!
//! Comments never become tokens. Each comment is attached to the token that
//! follows it, together with blank-line information, so the parser can hand
//! them to the statement or declaration they belong to.

use crate::ast::Comment;
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword,
    Int,
    Float,
    Imag,
    Char,
    String,
    RawString,
    /// Operators and delimiters.
    Op,
    /// Explicit `;` or one inserted at a line break (text `"\n"`).
    Semicolon,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexComment {
    pub comment: Comment,
    /// No token precedes this comment on its line.
    pub own_line: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    /// Byte range in the source.
    pub start: usize,
    pub end: usize,
    /// Comments between the previous token and this one.
    pub comments: Vec<LexComment>,
    /// A blank line directly precedes this token.
    pub blank_before: bool,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Op | TokenKind::Keyword) && self.text == text
    }

    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Semicolon if self.text == "\n" => "newline".to_string(),
            _ => format!("`{}`", self.text),
        }
    }
}

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Longest operators first so a greedy scan picks `<<=` over `<<` over `<`.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", "...", "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&^", "+", "-", "*", "/", "%", "&",
    "|", "^", "<", ">", "=", "!", "~", "(", ")", "[", "]", "{", "}", ",", ";", ".", ":",
];

const BOM: char = '\u{feff}';

pub struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    line: usize,
    line_start: usize,
    tokens: Vec<Token>,
    pending: Vec<LexComment>,
    /// Newlines since the last token or comment.
    newlines: usize,
    /// Newlines since the last real token.
    newlines_since_token: usize,
}

impl<'src> Lexer<'src> {
    /// A leading byte order mark is skipped, as the Go toolchain does.
    pub fn new(source: &'src str) -> Self {
        let start = if source.starts_with(BOM) { BOM.len_utf8() } else { 0 };
        Self {
            source,
            pos: start,
            line: 1,
            line_start: start,
            tokens: Vec::new(),
            pending: Vec::new(),
            newlines: 0,
            newlines_since_token: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            self.skip_blanks();
            let Some(ch) = self.peek_char() else {
                self.insert_semicolon();
                let (line, column) = (self.line, self.column(self.pos));
                let eof = self.make_token(TokenKind::Eof, self.pos, self.pos, line, column);
                self.tokens.push(eof);
                return Ok(self.tokens);
            };

            if ch == '\n' {
                self.insert_semicolon();
                self.pos += 1;
                self.newline();
                continue;
            }

            if self.rest().starts_with("//") {
                self.line_comment();
                continue;
            }
            if self.rest().starts_with("/*") {
                self.block_comment()?;
                continue;
            }

            let start = self.pos;
            let (line, column) = (self.line, self.column(start));
            let kind = if ch.is_alphabetic() || ch == '_' {
                self.ident()
            } else if ch.is_ascii_digit()
                || (ch == '.' && self.rest()[1..].starts_with(|c: char| c.is_ascii_digit()))
            {
                self.number()
            } else if ch == '"' {
                self.interpreted_string()?;
                TokenKind::String
            } else if ch == '`' {
                self.raw_string()?;
                TokenKind::RawString
            } else if ch == '\'' {
                self.char_lit()?;
                TokenKind::Char
            } else if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
                self.pos += op.len();
                if *op == ";" {
                    TokenKind::Semicolon
                } else {
                    TokenKind::Op
                }
            } else {
                return Err(ParseError::InvalidCharacter { line, column, ch });
            };

            let token = self.make_token(kind, start, self.pos, line, column);
            self.tokens.push(token);
            self.newlines_since_token = 0;
        }
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn column(&self, offset: usize) -> usize {
        self.source[self.line_start..offset].chars().count() + 1
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.pos;
        self.newlines += 1;
        self.newlines_since_token += 1;
    }

    fn skip_blanks(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn make_token(
        &mut self,
        kind: TokenKind,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Token {
        let token = Token {
            kind,
            text: self.source[start..end].to_string(),
            line,
            column,
            start,
            end,
            comments: std::mem::take(&mut self.pending),
            blank_before: self.newlines > 1,
        };
        self.newlines = 0;
        token
    }

    /// A line break ends the statement after an identifier, a literal, one of
    /// `break continue fallthrough return`, or one of `++ -- ) ] }`.
    fn needs_semicolon(&self) -> bool {
        let Some(last) = self.tokens.last() else {
            return false;
        };
        match last.kind {
            TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Char
            | TokenKind::String
            | TokenKind::RawString => true,
            TokenKind::Keyword => matches!(
                last.text.as_str(),
                "break" | "continue" | "fallthrough" | "return"
            ),
            TokenKind::Op => matches!(last.text.as_str(), "++" | "--" | ")" | "]" | "}"),
            TokenKind::Semicolon | TokenKind::Eof => false,
        }
    }

    fn insert_semicolon(&mut self) {
        if !self.needs_semicolon() {
            return;
        }
        let token = Token {
            kind: TokenKind::Semicolon,
            text: "\n".to_string(),
            line: self.line,
            column: self.column(self.pos),
            start: self.pos,
            end: self.pos,
            comments: std::mem::take(&mut self.pending),
            blank_before: false,
        };
        self.tokens.push(token);
    }

    fn push_comment(&mut self, start: usize) {
        let comment = LexComment {
            comment: Comment {
                text: self.source[start..self.pos].to_string(),
                blank_before: self.newlines > 1,
            },
            own_line: self.newlines_since_token > 0,
        };
        self.pending.push(comment);
        self.newlines = 0;
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        let len = self.rest().find('\n').unwrap_or(self.rest().len());
        self.pos += len;
        self.push_comment(start);
    }

    fn block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let (line, column) = (self.line, self.column(start));
        let Some(len) = self.rest()[2..].find("*/") else {
            return Err(ParseError::Unterminated {
                line,
                column,
                what: "comment",
            });
        };
        let body_end = self.pos + 2 + len;
        let had_newline = self.source[start..body_end].contains('\n');
        for (offset, ch) in self.source[start..body_end].char_indices() {
            if ch == '\n' {
                self.line += 1;
                self.line_start = start + offset + 1;
            }
        }
        self.pos = body_end + 2;
        self.push_comment(start);
        // A general comment spanning lines acts like a newline.
        if had_newline {
            self.insert_semicolon();
        }
        Ok(())
    }

    fn ident(&mut self) -> TokenKind {
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        let word = &self.rest()[..len];
        self.pos += len;
        if KEYWORDS.contains(&word) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        }
    }

    fn number(&mut self) -> TokenKind {
        let start = self.pos;
        let hex = self.rest().starts_with("0x") || self.rest().starts_with("0X");
        let mut prev = '\0';
        let mut float = false;
        while let Some(ch) = self.peek_char() {
            let exponent_sign = (ch == '+' || ch == '-')
                && (if hex {
                    matches!(prev, 'p' | 'P')
                } else {
                    matches!(prev, 'e' | 'E')
                });
            if ch.is_ascii_alphanumeric() || ch == '_' || exponent_sign {
                if !hex && matches!(ch, 'e' | 'E') || hex && matches!(ch, 'p' | 'P') {
                    float = true;
                }
            } else if ch == '.' && !float {
                float = true;
            } else {
                break;
            }
            prev = ch;
            self.pos += ch.len_utf8();
        }
        if self.source[start..self.pos].ends_with('i') {
            TokenKind::Imag
        } else if float {
            TokenKind::Float
        } else {
            TokenKind::Int
        }
    }

    fn quoted(&mut self, quote: char, what: &'static str) -> Result<(), ParseError> {
        let (line, column) = (self.line, self.column(self.pos));
        let unterminated = ParseError::Unterminated { line, column, what };
        self.pos += 1;
        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(unterminated),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek_char() {
                        None | Some('\n') => return Err(unterminated),
                        Some(ch) => self.pos += ch.len_utf8(),
                    }
                }
                Some(ch) => {
                    self.pos += ch.len_utf8();
                    if ch == quote {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn interpreted_string(&mut self) -> Result<(), ParseError> {
        self.quoted('"', "string literal")
    }

    fn char_lit(&mut self) -> Result<(), ParseError> {
        self.quoted('\'', "rune literal")
    }

    fn raw_string(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let (line, column) = (self.line, self.column(start));
        let Some(len) = self.rest()[1..].find('`') else {
            return Err(ParseError::Unterminated {
                line,
                column,
                what: "raw string literal",
            });
        };
        let end = start + 1 + len + 1;
        for (offset, ch) in self.source[start..end].char_indices() {
            if ch == '\n' {
                self.line += 1;
                self.line_start = start + offset + 1;
            }
        }
        self.pos = end;
        Ok(())
    }
}

/// Tokenizes `source`, ending with an [`TokenKind::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).tokenize()
}
