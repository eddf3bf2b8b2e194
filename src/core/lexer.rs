//! MS-002: Go tokenizer.
//!
//! Produces the token stream the declaration parser needs: identifiers,
//! keywords, literals and operators, with automatic semicolon insertion as
//! the Go language defines it. Comments are kept out of the token stream and
//! collected into groups so the parser can attach doc comments.

use std::fmt;

/// Token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword,
    Int,
    Float,
    Imag,
    Rune,
    Str,
    Punct,
    /// Explicit `;` or one inserted at a line end
    Semi,
    Eof,
}

/// A lexed token. `text` holds the source spelling (or `"\n"` for an
/// inserted semicolon).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    /// Last line the token touches (raw strings may span lines)
    pub end_line: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.is(TokenKind::Punct, text)
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Semi if self.text == "\n" => write!(f, "newline"),
            _ => write!(f, "{}", self.text),
        }
    }
}

/// One `//` or `/* */` comment, text verbatim including delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub line: usize,
    pub end_line: usize,
}

/// Adjacent comments with no token and at most one line break between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    pub comments: Vec<Comment>,
    /// Number of tokens emitted before the group
    pub tokens_before: usize,
    /// Group starts on the same line as the preceding token
    pub trailing: bool,
}

impl CommentGroup {
    pub fn first_line(&self) -> usize {
        self.comments.first().map_or(0, |c| c.line)
    }

    pub fn last_line(&self) -> usize {
        self.comments.last().map_or(0, |c| c.end_line)
    }

    /// Comment texts, verbatim, in source order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.comments.iter().map(|c| c.text.as_str())
    }
}

/// Tokenizer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for LexError {}

/// Tokens plus comment groups of one file.
#[derive(Debug, Clone)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<CommentGroup>,
}

impl Lexed {
    /// Doc comment for the token at `index`: the last non-trailing group
    /// emitted right before it that ends on the line immediately above.
    pub fn lead_comment(&self, index: usize) -> Option<&CommentGroup> {
        let token = self.tokens.get(index)?;
        self.comments
            .iter()
            .rev()
            .find(|g| g.tokens_before == index)
            .filter(|g| !g.trailing && g.last_line() + 1 == token.line)
    }
}

pub const KEYWORDS: &[&str] = &[
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

// Longest first so maximal munch falls out of a linear scan.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", "...", "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&^", "~", "+", "-", "*", "/", "%", "&",
    "|", "^", "<", ">", "=", "!", "(", ")", "[", "]", "{", "}", ",", ".", ":",
];

/// Tokenize a Go source file.
pub fn tokenize(src: &str) -> Result<Lexed, LexError> {
    Lexer::new(src).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    groups: Vec<CommentGroup>,
    /// End line of the last non-inserted token
    last_line: Option<usize>,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            groups: Vec::new(),
            last_line: None,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> LexError {
        LexError {
            line,
            column,
            message: message.into(),
        }
    }

    fn run(mut self) -> Result<Lexed, LexError> {
        while let Some(c) = self.peek() {
            match c {
                '\n' => {
                    self.insert_semi();
                    self.bump();
                }
                ' ' | '\t' | '\r' | '\u{feff}' => {
                    self.bump();
                }
                '/' if self.peek_at(1) == Some('/') => self.line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.block_comment()?,
                '"' => self.interpreted_string()?,
                '`' => self.raw_string()?,
                '\'' => self.rune()?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number(),
                c if c == '_' || c.is_alphabetic() => self.word(),
                _ => self.operator()?,
            }
        }
        self.insert_semi();
        let (line, column) = (self.line, self.column);
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            line,
            column,
            end_line: line,
        });
        Ok(Lexed {
            tokens: self.tokens,
            comments: self.groups,
        })
    }

    fn push(&mut self, kind: TokenKind, text: String, line: usize, column: usize) {
        let end_line = self.line;
        self.last_line = Some(end_line);
        self.tokens.push(Token {
            kind,
            text,
            line,
            column,
            end_line,
        });
    }

    /// Line-end semicolon insertion.
    fn insert_semi(&mut self) {
        let needed = self.tokens.last().is_some_and(|t| match t.kind {
            TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Rune
            | TokenKind::Str => true,
            TokenKind::Keyword => {
                matches!(
                    t.text.as_str(),
                    "break" | "continue" | "fallthrough" | "return"
                )
            }
            TokenKind::Punct => matches!(t.text.as_str(), "++" | "--" | ")" | "]" | "}"),
            TokenKind::Semi | TokenKind::Eof => false,
        });
        if needed {
            let (line, column) = (self.line, self.column);
            self.tokens.push(Token {
                kind: TokenKind::Semi,
                text: "\n".to_string(),
                line,
                column,
                end_line: line,
            });
        }
    }

    fn add_comment(&mut self, comment: Comment) {
        let trailing = self.last_line == Some(comment.line);
        let tokens_before = self.tokens.len();
        if let Some(group) = self.groups.last_mut() {
            let joins = group.tokens_before == tokens_before
                && if trailing {
                    group.trailing && group.last_line() == comment.line
                } else {
                    !group.trailing && comment.line <= group.last_line() + 1
                };
            if joins {
                group.comments.push(comment);
                return;
            }
        }
        self.groups.push(CommentGroup {
            comments: vec![comment],
            tokens_before,
            trailing,
        });
    }

    fn line_comment(&mut self) {
        let line = self.line;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        let text = text.trim_end_matches('\r').to_string();
        self.add_comment(Comment {
            text,
            line,
            end_line: line,
        });
    }

    fn block_comment(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::from("/*");
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    text.push_str("*/");
                    break;
                }
                Some(c) => text.push(c),
                None => return Err(self.error(line, column, "comment not terminated")),
            }
        }
        let end_line = self.line;
        if end_line > line {
            // A multi-line block comment ends the statement like a newline.
            self.insert_semi();
        }
        self.add_comment(Comment {
            text,
            line,
            end_line,
        });
        Ok(())
    }

    fn escape(&mut self, quote: char) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        match self.bump() {
            Some(c) if c == quote => Ok(()),
            Some('a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\') => Ok(()),
            Some('x') => self.hex_digits(2, line, column),
            Some('u') => self.hex_digits(4, line, column),
            Some('U') => self.hex_digits(8, line, column),
            Some(c) if ('0'..='7').contains(&c) => {
                for _ in 0..2 {
                    match self.bump() {
                        Some(d) if ('0'..='7').contains(&d) => {}
                        _ => return Err(self.error(line, column, "invalid octal escape")),
                    }
                }
                Ok(())
            }
            _ => Err(self.error(line, column, "unknown escape sequence")),
        }
    }

    fn hex_digits(&mut self, n: usize, line: usize, column: usize) -> Result<(), LexError> {
        for _ in 0..n {
            match self.bump() {
                Some(d) if d.is_ascii_hexdigit() => {}
                _ => return Err(self.error(line, column, "invalid hex escape")),
            }
        }
        Ok(())
    }

    fn interpreted_string(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        self.bump();
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.escape('"')?;
                }
                Some('\n') | None => {
                    return Err(self.error(line, column, "string literal not terminated"))
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Str, text, line, column);
        Ok(())
    }

    fn raw_string(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                Some('`') => break,
                Some(_) => {}
                None => return Err(self.error(line, column, "raw string literal not terminated")),
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Str, text, line, column);
        Ok(())
    }

    fn rune(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        self.bump();
        let mut count = 0;
        loop {
            match self.peek() {
                Some('\'') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.escape('\'')?;
                }
                Some('\n') | None => {
                    return Err(self.error(line, column, "rune literal not terminated"))
                }
                Some(_) => {
                    self.bump();
                }
            }
            count += 1;
        }
        if count != 1 {
            return Err(self.error(line, column, "illegal rune literal"));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Rune, text, line, column);
        Ok(())
    }

    fn number(&mut self) {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        let hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X'));
        let mut float = false;
        while let Some(c) = self.peek() {
            let exponent = if hex {
                matches!(c, 'p' | 'P')
            } else {
                matches!(c, 'e' | 'E')
            };
            if exponent {
                float = true;
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
            } else if c == '.' {
                float = true;
                self.bump();
            } else if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let kind = if text.ends_with('i') {
            TokenKind::Imag
        } else if float {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        self.push(kind, text, line, column);
    }

    fn word(&mut self) {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let kind = if KEYWORDS.contains(&text.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        self.push(kind, text, line, column);
    }

    fn operator(&mut self) -> Result<(), LexError> {
        let (line, column) = (self.line, self.column);
        if self.peek() == Some(';') {
            self.bump();
            self.push(TokenKind::Semi, ";".to_string(), line, column);
            return Ok(());
        }
        for op in OPERATORS {
            let matches = op
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_at(i) == Some(c));
            if matches {
                for _ in 0..op.chars().count() {
                    self.bump();
                }
                self.push(TokenKind::Punct, (*op).to_string(), line, column);
                return Ok(());
            }
        }
        let c = self.peek().unwrap_or('\0');
        Err(self.error(line, column, format!("invalid character {:?}", c)))
    }
}
