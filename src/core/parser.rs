//! MS-003: Go declaration parser.
//!
//! Parses the package clause, imports and every top-level declaration of a
//! Go file into a declaration-level syntax tree:
//! - type specs with their full type expressions
//! - func decls with receiver, type parameters and signature
//! - var/const names
//!
//! Function bodies and initializer expressions are skipped as balanced
//! token runs; nothing below declaration level is modelled.

use super::lexer::{tokenize, LexError, Lexed, Token, TokenKind};
use std::fmt;

/// Syntax error with its position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self {
            line: e.line,
            column: e.column,
            message: e.message,
        }
    }
}

// ============================================================================
// Syntax tree
// ============================================================================

/// One parsed `.go` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub package: Ident,
    /// Comments above the package clause (build constraints live here)
    pub header: Vec<String>,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

impl SourceFile {
    /// `//go:build` and `// +build` lines from the file header.
    pub fn build_constraints(&self) -> impl Iterator<Item = &str> {
        self.header
            .iter()
            .flat_map(|c| c.lines())
            .map(str::trim)
            .filter(|l| l.starts_with("//go:build") || l.starts_with("// +build"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Explicit local name (`.`, `_` or an alias)
    pub name: Option<String>,
    pub path: String,
    pub line: usize,
}

impl Import {
    /// Names the import may be referenced by in this file.
    ///
    /// Without an alias the package name is not knowable from the path
    /// alone, so the conventional spellings are all offered.
    pub fn local_names(&self) -> Vec<String> {
        if let Some(name) = &self.name {
            return vec![name.clone()];
        }
        let mut segments: Vec<&str> = self.path.split('/').collect();
        if segments.len() > 1 {
            let last = segments[segments.len() - 1];
            let is_major = last.len() > 1
                && last.starts_with('v')
                && last[1..].chars().all(|c| c.is_ascii_digit());
            if is_major {
                segments.pop();
            }
        }
        let last = segments.last().copied().unwrap_or_default();
        let mut names = vec![last.to_string()];
        if let Some((head, _)) = last.split_once('.') {
            names.push(head.to_string());
        }
        for prefix in ["go-", "go."] {
            if let Some(rest) = last.strip_prefix(prefix) {
                names.push(rest.to_string());
            }
        }
        if let Some(rest) = last.strip_suffix("-go") {
            names.push(rest.to_string());
        }
        names.push(last.replace(['-', '.'], "_"));
        names.dedup();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Type(TypeDecl),
    Func(FuncDecl),
    Value(ValueDecl),
}

/// A `type` declaration, grouped or single.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// Doc comment above the `type` keyword
    pub doc: Vec<String>,
    pub specs: Vec<TypeSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    /// Doc comment above the spec inside a `type ( ... )` group
    pub doc: Vec<String>,
    pub name: Ident,
    pub type_params: Vec<Field>,
    pub alias: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub doc: Vec<String>,
    pub recv: Option<Field>,
    pub name: Ident,
    pub type_params: Vec<Field>,
    pub sig: Signature,
}

impl FuncDecl {
    /// Receiver type name with pointer and type arguments stripped.
    pub fn recv_base(&self) -> Option<&TypeExpr> {
        let mut ty = &self.recv.as_ref()?.ty;
        while let TypeExpr::Pointer(inner) = ty {
            ty = inner;
        }
        Some(ty)
    }

    pub fn recv_name(&self) -> Option<&str> {
        match self.recv_base()? {
            TypeExpr::Named { name, package: None, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Var,
    Const,
}

/// A `var` or `const` declaration; only the declared names are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDecl {
    pub kind: ValueKind,
    pub names: Vec<Ident>,
}

/// A parameter group, result group, struct field or type parameter group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

impl Signature {
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a TypeExpr)) {
        for field in self.params.iter().chain(&self.results) {
            field.ty.walk(f);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceElem {
    Method {
        name: Ident,
        sig: Signature,
    },
    /// Embedded interface or type-set term
    Embedded(TypeExpr),
}

/// A Go type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named {
        package: Option<String>,
        name: String,
        args: Vec<TypeExpr>,
        line: usize,
    },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array {
        len: String,
        elem: Box<TypeExpr>,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<TypeExpr>,
    },
    Func(Signature),
    Struct(Vec<Field>),
    Interface(Vec<InterfaceElem>),
    Variadic(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Tilde(Box<TypeExpr>),
}

impl TypeExpr {
    fn named(name: &Ident) -> Self {
        Self::Named {
            package: None,
            name: name.name.clone(),
            args: Vec::new(),
            line: name.line,
        }
    }

    /// Pre-order visit of this type and every type nested in it.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a TypeExpr)) {
        f(self);
        match self {
            Self::Named { args, .. } => args.iter().for_each(|a| a.walk(f)),
            Self::Pointer(t) | Self::Slice(t) | Self::Variadic(t) | Self::Tilde(t) => t.walk(f),
            Self::Array { elem, .. } | Self::Chan { elem, .. } => elem.walk(f),
            Self::Map { key, value } => {
                key.walk(f);
                value.walk(f);
            }
            Self::Func(sig) => sig.walk(f),
            Self::Struct(fields) => fields.iter().for_each(|fd| fd.ty.walk(f)),
            Self::Interface(elems) => {
                for elem in elems {
                    match elem {
                        InterfaceElem::Method { sig, .. } => sig.walk(f),
                        InterfaceElem::Embedded(t) => t.walk(f),
                    }
                }
            }
            Self::Union(terms) => terms.iter().for_each(|t| t.walk(f)),
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[Field], sep: &str) -> fmt::Result {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        if field.names.is_empty() {
            write!(f, "{}", field.ty)?;
        } else {
            write!(f, "{} {}", field.names.join(", "), field.ty)?;
        }
    }
    Ok(())
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        write_fields(f, &self.params, ", ")?;
        write!(f, ")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] if single.names.is_empty() => write!(f, " {}", single.ty),
            results => {
                write!(f, " (")?;
                write_fields(f, results, ", ")?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named {
                package,
                name,
                args,
                ..
            } => {
                if let Some(pkg) = package {
                    write!(f, "{}.", pkg)?;
                }
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "[{}]", args.join(", "))?;
                }
                Ok(())
            }
            Self::Pointer(t) => write!(f, "*{}", t),
            Self::Slice(t) => write!(f, "[]{}", t),
            Self::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            Self::Map { key, value } => write!(f, "map[{}]{}", key, value),
            Self::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Recv => write!(f, "<-chan {}", elem),
            },
            Self::Func(sig) => write!(f, "func{}", sig),
            Self::Struct(fields) if fields.is_empty() => write!(f, "struct{{}}"),
            Self::Struct(fields) => {
                write!(f, "struct{{ ")?;
                write_fields(f, fields, "; ")?;
                write!(f, " }}")
            }
            Self::Interface(elems) if elems.is_empty() => write!(f, "interface{{}}"),
            Self::Interface(elems) => {
                write!(f, "interface{{ ")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    match elem {
                        InterfaceElem::Method { name, sig } => write!(f, "{}{}", name.name, sig)?,
                        InterfaceElem::Embedded(t) => write!(f, "{}", t)?,
                    }
                }
                write!(f, " }}")
            }
            Self::Variadic(t) => write!(f, "...{}", t),
            Self::Union(terms) => {
                let terms: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", terms.join(" | "))
            }
            Self::Tilde(t) => write!(f, "~{}", t),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Parse one Go source file.
pub fn parse_file(src: &str) -> Result<SourceFile, ParseError> {
    let lexed = tokenize(src)?;
    Parser { lexed: &lexed, pos: 0 }.file()
}

type Entry = (Option<Ident>, Option<TypeExpr>);

struct Parser<'a> {
    lexed: &'a Lexed,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn tok(&self) -> &'a Token {
        self.peek(0)
    }

    fn peek(&self, n: usize) -> &'a Token {
        let lexed: &'a Lexed = self.lexed;
        let last = lexed.tokens.len() - 1;
        &lexed.tokens[(self.pos + n).min(last)]
    }

    fn next(&mut self) {
        if self.pos + 1 < self.lexed.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let tok = self.tok();
        ParseError {
            line: tok.line,
            column: tok.column,
            message: message.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        self.error(format!("expected {}, found {}", expected, self.tok()))
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.tok().is_punct(p) {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", p)))
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), ParseError> {
        if self.tok().is_keyword(kw) {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected(kw))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.tok();
        if tok.kind == TokenKind::Ident {
            self.next();
            Ok(Ident {
                name: tok.text.clone(),
                line: tok.line,
            })
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    /// A `;` may be omitted before a closing `)` or `}`.
    fn expect_semi(&mut self) -> Result<(), ParseError> {
        let tok = self.tok();
        match tok.kind {
            TokenKind::Semi => {
                self.next();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ if tok.is_punct(")") || tok.is_punct("}") => Ok(()),
            _ => Err(self.unexpected("';'")),
        }
    }

    fn skip_semis(&mut self) {
        while self.tok().kind == TokenKind::Semi {
            self.next();
        }
    }

    fn doc(&self) -> Vec<String> {
        self.lexed
            .lead_comment(self.pos)
            .map(|g| g.texts().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn file(mut self) -> Result<SourceFile, ParseError> {
        let header = self
            .lexed
            .comments
            .iter()
            .filter(|g| g.tokens_before == 0)
            .flat_map(|g| g.texts().map(str::to_string))
            .collect();

        self.skip_semis();
        self.expect_keyword("package")?;
        let package = self.expect_ident()?;
        if package.name == "_" {
            return Err(self.error("invalid package name _"));
        }
        self.expect_semi()?;

        let mut imports = Vec::new();
        loop {
            self.skip_semis();
            if !self.tok().is_keyword("import") {
                break;
            }
            self.import_decl(&mut imports)?;
        }

        let mut decls = Vec::new();
        loop {
            let tok = self.tok();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Semi => self.next(),
                TokenKind::Keyword => match tok.text.as_str() {
                    "type" => decls.push(Decl::Type(self.type_decl()?)),
                    "func" => decls.push(Decl::Func(self.func_decl()?)),
                    "var" => decls.push(Decl::Value(self.value_decl(ValueKind::Var)?)),
                    "const" => decls.push(Decl::Value(self.value_decl(ValueKind::Const)?)),
                    "import" => {
                        return Err(self.error("imports must appear before other declarations"))
                    }
                    _ => return Err(self.error("non-declaration statement outside function body")),
                },
                _ => return Err(self.error("non-declaration statement outside function body")),
            }
        }

        Ok(SourceFile {
            package,
            header,
            imports,
            decls,
        })
    }

    fn import_decl(&mut self, imports: &mut Vec<Import>) -> Result<(), ParseError> {
        self.expect_keyword("import")?;
        if self.tok().is_punct("(") {
            self.next();
            loop {
                self.skip_semis();
                if self.tok().is_punct(")") {
                    break;
                }
                imports.push(self.import_spec()?);
                self.expect_semi()?;
            }
            self.expect_punct(")")?;
        } else {
            imports.push(self.import_spec()?);
        }
        self.expect_semi()
    }

    fn import_spec(&mut self) -> Result<Import, ParseError> {
        let name = match self.tok() {
            t if t.kind == TokenKind::Ident => Some(self.expect_ident()?.name),
            t if t.is_punct(".") => {
                self.next();
                Some(".".to_string())
            }
            _ => None,
        };
        let tok = self.tok();
        if tok.kind != TokenKind::Str {
            return Err(self.unexpected("import path"));
        }
        self.next();
        let path = tok.text.trim_matches(|c| c == '"' || c == '`').to_string();
        if path.is_empty() {
            return Err(self.error("invalid import path: empty"));
        }
        Ok(Import {
            name,
            path,
            line: tok.line,
        })
    }

    fn type_decl(&mut self) -> Result<TypeDecl, ParseError> {
        let doc = self.doc();
        self.expect_keyword("type")?;
        let mut specs = Vec::new();
        if self.tok().is_punct("(") {
            self.next();
            loop {
                self.skip_semis();
                if self.tok().is_punct(")") {
                    break;
                }
                let spec_doc = self.doc();
                specs.push(self.type_spec(spec_doc)?);
                self.expect_semi()?;
            }
            self.expect_punct(")")?;
        } else {
            specs.push(self.type_spec(Vec::new())?);
        }
        self.expect_semi()?;
        Ok(TypeDecl { doc, specs })
    }

    fn type_spec(&mut self, doc: Vec<String>) -> Result<TypeSpec, ParseError> {
        let name = self.expect_ident()?;
        let type_params = if self.at_type_params() {
            self.params("[", "]", true)?
        } else {
            Vec::new()
        };
        let alias = self.tok().is_punct("=");
        if alias {
            self.next();
        }
        let ty = self.parse_type()?;
        Ok(TypeSpec {
            doc,
            name,
            type_params,
            alias,
            ty,
        })
    }

    /// `type T[P any]` versus `type T [N]E`.
    fn at_type_params(&self) -> bool {
        if !self.tok().is_punct("[") || self.peek(1).kind != TokenKind::Ident {
            return false;
        }
        let after = self.peek(2);
        matches!(after.kind, TokenKind::Ident | TokenKind::Keyword)
            || [",", "~", "["].iter().any(|p| after.is_punct(p))
    }

    fn func_decl(&mut self) -> Result<FuncDecl, ParseError> {
        let doc = self.doc();
        self.expect_keyword("func")?;
        let recv = if self.tok().is_punct("(") {
            let line = self.tok().line;
            let mut fields = self.params("(", ")", false)?;
            let count: usize = fields.iter().map(|f| f.names.len().max(1)).sum();
            if count != 1 {
                return Err(ParseError {
                    line,
                    column: 0,
                    message: if count == 0 {
                        "method has no receiver".to_string()
                    } else {
                        "method has multiple receivers".to_string()
                    },
                });
            }
            fields.pop()
        } else {
            None
        };
        let name = self.expect_ident()?;
        let type_params = if self.tok().is_punct("[") {
            self.params("[", "]", true)?
        } else {
            Vec::new()
        };
        let sig = self.signature()?;
        if self.tok().is_punct("{") {
            self.skip_balanced("{", "}")?;
        }
        self.expect_semi()?;
        Ok(FuncDecl {
            doc,
            recv,
            name,
            type_params,
            sig,
        })
    }

    fn value_decl(&mut self, kind: ValueKind) -> Result<ValueDecl, ParseError> {
        self.next();
        let mut names = Vec::new();
        if self.tok().is_punct("(") {
            self.next();
            loop {
                self.skip_semis();
                if self.tok().is_punct(")") {
                    break;
                }
                self.value_spec(&mut names)?;
                self.expect_semi()?;
            }
            self.expect_punct(")")?;
        } else {
            self.value_spec(&mut names)?;
        }
        self.expect_semi()?;
        Ok(ValueDecl { kind, names })
    }

    fn value_spec(&mut self, names: &mut Vec<Ident>) -> Result<(), ParseError> {
        names.push(self.expect_ident()?);
        while self.tok().is_punct(",") {
            self.next();
            names.push(self.expect_ident()?);
        }
        // Type and initializer are not modelled.
        let mut depth = 0usize;
        loop {
            let tok = self.tok();
            match tok.kind {
                TokenKind::Eof => return Err(self.unexpected("';'")),
                TokenKind::Semi if depth == 0 => return Ok(()),
                TokenKind::Punct => match tok.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" if depth == 0 => return Ok(()),
                    ")" | "]" | "}" => {
                        depth = depth
                            .checked_sub(1)
                            .ok_or_else(|| self.error(format!("unexpected {}", tok)))?
                    }
                    _ => {}
                },
                _ => {}
            }
            self.next();
        }
    }

    /// Skip a bracketed run, including the delimiters.
    fn skip_balanced(&mut self, open: &str, close: &str) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let tok = self.tok();
            if tok.kind == TokenKind::Eof {
                return Err(self.unexpected(&format!("'{}'", close)));
            }
            if tok.is_punct(open) {
                depth += 1;
            } else if tok.is_punct(close) {
                depth -= 1;
                if depth == 0 {
                    self.next();
                    return Ok(());
                }
            }
            self.next();
        }
    }

    fn signature(&mut self) -> Result<Signature, ParseError> {
        let params = self.params("(", ")", false)?;
        let results = if self.tok().is_punct("(") {
            self.params("(", ")", false)?
        } else if starts_type(self.tok()) {
            vec![Field {
                names: Vec::new(),
                ty: self.parse_type()?,
            }]
        } else {
            Vec::new()
        };
        Ok(Signature { params, results })
    }

    /// Parameter, result or type parameter list.
    fn params(&mut self, open: &str, close: &str, constraint: bool) -> Result<Vec<Field>, ParseError> {
        let start = self.tok();
        self.expect_punct(open)?;
        let mut entries: Vec<Entry> = Vec::new();
        loop {
            if self.tok().is_punct(close) {
                break;
            }
            entries.push(self.param_entry(close, constraint)?);
            if self.tok().is_punct(",") {
                self.next();
            } else if !self.tok().is_punct(close) {
                return Err(self.unexpected(&format!("',' or '{}'", close)));
            }
        }
        self.expect_punct(close)?;

        let mixed = || ParseError {
            line: start.line,
            column: start.column,
            message: "mixed named and unnamed parameters".to_string(),
        };
        let named = entries.iter().any(|(n, t)| n.is_some() && t.is_some());
        if !named {
            return Ok(entries
                .into_iter()
                .filter_map(|(n, t)| t.or_else(|| n.as_ref().map(TypeExpr::named)))
                .map(|ty| Field {
                    names: Vec::new(),
                    ty,
                })
                .collect());
        }
        let mut fields = Vec::new();
        let mut pending = Vec::new();
        for (name, ty) in entries {
            match (name, ty) {
                (Some(name), None) => pending.push(name.name),
                (Some(name), Some(ty)) => {
                    pending.push(name.name);
                    fields.push(Field {
                        names: std::mem::take(&mut pending),
                        ty,
                    });
                }
                _ => return Err(mixed()),
            }
        }
        if !pending.is_empty() {
            return Err(mixed());
        }
        Ok(fields)
    }

    fn param_entry(&mut self, close: &str, constraint: bool) -> Result<Entry, ParseError> {
        let tok = self.tok();
        if tok.kind != TokenKind::Ident {
            return Ok((None, Some(self.param_type(constraint)?)));
        }
        let next = self.peek(1);
        if next.is_punct(".") {
            return Ok((None, Some(self.param_type(constraint)?)));
        }
        if next.is_punct(",") || next.is_punct(close) {
            return Ok((Some(self.expect_ident()?), None));
        }
        if next.is_punct("[") && !self.array_follows(1) {
            // Generic instantiation used as a bare type: `List[int]`.
            return Ok((None, Some(self.param_type(constraint)?)));
        }
        let name = self.expect_ident()?;
        Ok((Some(name), Some(self.param_type(constraint)?)))
    }

    /// Whether the `[` at `offset` opens an array or slice type rather than
    /// type arguments: `[]` or `[N]` followed by an element type.
    fn array_follows(&self, offset: usize) -> bool {
        if self.peek(offset + 1).is_punct("]") {
            return true;
        }
        let mut depth = 0usize;
        let mut i = offset;
        loop {
            let tok = self.peek(i);
            if tok.kind == TokenKind::Eof {
                return false;
            }
            if tok.is_punct("[") {
                depth += 1;
            } else if tok.is_punct("]") {
                depth -= 1;
                if depth == 0 {
                    return starts_type(self.peek(i + 1));
                }
            }
            i += 1;
        }
    }

    fn param_type(&mut self, constraint: bool) -> Result<TypeExpr, ParseError> {
        if self.tok().is_punct("...") {
            self.next();
            return Ok(TypeExpr::Variadic(Box::new(self.parse_type()?)));
        }
        if constraint {
            self.constraint()
        } else {
            self.parse_type()
        }
    }

    /// Type-set expression: `~int | ~string | Stringer`.
    fn constraint(&mut self) -> Result<TypeExpr, ParseError> {
        let mut terms = vec![self.constraint_term()?];
        while self.tok().is_punct("|") {
            self.next();
            terms.push(self.constraint_term()?);
        }
        if terms.len() == 1 {
            Ok(terms.remove(0))
        } else {
            Ok(TypeExpr::Union(terms))
        }
    }

    fn constraint_term(&mut self) -> Result<TypeExpr, ParseError> {
        if self.tok().is_punct("~") {
            self.next();
            Ok(TypeExpr::Tilde(Box::new(self.parse_type()?)))
        } else {
            self.parse_type()
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let tok = self.tok();
        match tok.kind {
            TokenKind::Ident => self.type_name(),
            TokenKind::Punct => match tok.text.as_str() {
                "*" => {
                    self.next();
                    Ok(TypeExpr::Pointer(Box::new(self.parse_type()?)))
                }
                "[" => {
                    self.next();
                    if self.tok().is_punct("]") {
                        self.next();
                        return Ok(TypeExpr::Slice(Box::new(self.parse_type()?)));
                    }
                    let len = self.array_len()?;
                    Ok(TypeExpr::Array {
                        len,
                        elem: Box::new(self.parse_type()?),
                    })
                }
                "(" => {
                    self.next();
                    let inner = self.parse_type()?;
                    self.expect_punct(")")?;
                    Ok(inner)
                }
                "<-" => {
                    self.next();
                    self.expect_keyword("chan")?;
                    Ok(TypeExpr::Chan {
                        dir: ChanDir::Recv,
                        elem: Box::new(self.parse_type()?),
                    })
                }
                _ => Err(self.unexpected("type")),
            },
            TokenKind::Keyword => match tok.text.as_str() {
                "chan" => {
                    self.next();
                    let dir = if self.tok().is_punct("<-") {
                        self.next();
                        ChanDir::Send
                    } else {
                        ChanDir::Both
                    };
                    Ok(TypeExpr::Chan {
                        dir,
                        elem: Box::new(self.parse_type()?),
                    })
                }
                "map" => {
                    self.next();
                    self.expect_punct("[")?;
                    let key = self.parse_type()?;
                    self.expect_punct("]")?;
                    Ok(TypeExpr::Map {
                        key: Box::new(key),
                        value: Box::new(self.parse_type()?),
                    })
                }
                "func" => {
                    self.next();
                    Ok(TypeExpr::Func(self.signature()?))
                }
                "struct" => self.struct_type(),
                "interface" => self.interface_type(),
                _ => Err(self.unexpected("type")),
            },
            _ => Err(self.unexpected("type")),
        }
    }

    /// Array length expression up to the matching `]`, kept as source text.
    fn array_len(&mut self) -> Result<String, ParseError> {
        let mut depth = 0usize;
        let mut len = String::new();
        loop {
            let tok = self.tok();
            if tok.kind == TokenKind::Eof || tok.kind == TokenKind::Semi {
                return Err(self.unexpected("']'"));
            }
            if tok.is_punct("]") && depth == 0 {
                self.next();
                return Ok(len);
            }
            if tok.is_punct("[") || tok.is_punct("(") {
                depth += 1;
            } else if tok.is_punct("]") || tok.is_punct(")") {
                depth = depth.saturating_sub(1);
            }
            len.push_str(&tok.text);
            self.next();
        }
    }

    fn type_name(&mut self) -> Result<TypeExpr, ParseError> {
        let first = self.expect_ident()?;
        let (package, name) = if self.tok().is_punct(".") {
            self.next();
            let sel = self.expect_ident()?;
            (Some(first.name), sel.name)
        } else {
            (None, first.name)
        };
        let mut args = Vec::new();
        if self.tok().is_punct("[") {
            self.next();
            loop {
                if self.tok().is_punct("]") {
                    break;
                }
                args.push(self.parse_type()?);
                if self.tok().is_punct(",") {
                    self.next();
                } else if !self.tok().is_punct("]") {
                    return Err(self.unexpected("',' or ']'"));
                }
            }
            self.expect_punct("]")?;
            if args.is_empty() {
                return Err(self.error("expected type argument list"));
            }
        }
        Ok(TypeExpr::Named {
            package,
            name,
            args,
            line: first.line,
        })
    }

    fn struct_type(&mut self) -> Result<TypeExpr, ParseError> {
        self.expect_keyword("struct")?;
        self.expect_punct("{")?;
        let mut fields = Vec::new();
        loop {
            self.skip_semis();
            if self.tok().is_punct("}") {
                break;
            }
            fields.push(self.field_decl()?);
            if self.tok().kind == TokenKind::Str {
                self.next();
            }
            self.expect_semi()?;
        }
        self.expect_punct("}")?;
        Ok(TypeExpr::Struct(fields))
    }

    fn field_decl(&mut self) -> Result<Field, ParseError> {
        let tok = self.tok();
        if tok.is_punct("*") {
            self.next();
            return Ok(Field {
                names: Vec::new(),
                ty: TypeExpr::Pointer(Box::new(self.type_name()?)),
            });
        }
        if tok.kind != TokenKind::Ident {
            return Err(self.unexpected("field name or embedded type"));
        }
        let next = self.peek(1);
        let embedded = next.is_punct(".")
            || next.is_punct("}")
            || next.kind == TokenKind::Semi
            || next.kind == TokenKind::Str
            || (next.is_punct("[") && !self.array_follows(1));
        if embedded {
            return Ok(Field {
                names: Vec::new(),
                ty: self.type_name()?,
            });
        }
        let mut names = vec![self.expect_ident()?.name];
        while self.tok().is_punct(",") {
            self.next();
            names.push(self.expect_ident()?.name);
        }
        Ok(Field {
            names,
            ty: self.parse_type()?,
        })
    }

    fn interface_type(&mut self) -> Result<TypeExpr, ParseError> {
        self.expect_keyword("interface")?;
        self.expect_punct("{")?;
        let mut elems = Vec::new();
        loop {
            self.skip_semis();
            if self.tok().is_punct("}") {
                break;
            }
            if self.tok().kind == TokenKind::Ident && self.peek(1).is_punct("(") {
                let name = self.expect_ident()?;
                let sig = self.signature()?;
                elems.push(InterfaceElem::Method { name, sig });
            } else {
                elems.push(InterfaceElem::Embedded(self.constraint()?));
            }
            self.expect_semi()?;
        }
        self.expect_punct("}")?;
        Ok(TypeExpr::Interface(elems))
    }
}

fn starts_type(tok: &Token) -> bool {
    match tok.kind {
        TokenKind::Ident => true,
        TokenKind::Punct => ["*", "[", "(", "<-"].contains(&tok.text.as_str()),
        TokenKind::Keyword => {
            ["func", "map", "chan", "struct", "interface"].contains(&tok.text.as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_func(src: &str) -> FuncDecl {
        let file = parse_file(src).unwrap();
        file.decls
            .into_iter()
            .find_map(|d| match d {
                Decl::Func(f) => Some(f),
                _ => None,
            })
            .unwrap()
    }

    fn only_type(src: &str) -> TypeDecl {
        let file = parse_file(src).unwrap();
        file.decls
            .into_iter()
            .find_map(|d| match d {
                Decl::Type(t) => Some(t),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_ms003_package_and_imports() {
        let src = r#"package wordcount

import "fmt"
import (
	str "strings"
	. "math"
	_ "embed"
	"gopkg.in/yaml.v3"
)
"#;
        let file = parse_file(src).unwrap();
        assert_eq!(file.package.name, "wordcount");
        let paths: Vec<_> = file.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["fmt", "strings", "math", "embed", "gopkg.in/yaml.v3"]);
        assert_eq!(file.imports[1].name.as_deref(), Some("str"));
        assert_eq!(file.imports[2].name.as_deref(), Some("."));
        assert!(file.imports[4].local_names().contains(&"yaml".to_string()));
    }

    #[test]
    fn test_ms003_import_local_names() {
        let import = |path: &str| Import {
            name: None,
            path: path.to_string(),
            line: 1,
        };
        assert_eq!(import("fmt").local_names(), vec!["fmt"]);
        assert!(import("github.com/x/mux/v2").local_names().contains(&"mux".to_string()));
        assert!(import("github.com/x/go-redis").local_names().contains(&"redis".to_string()));
    }

    #[test]
    fn test_ms003_grouped_params_expand_names() {
        let f = only_func("package p\nfunc Write(k, v int, s string) error { return nil }\n");
        assert_eq!(f.name.name, "Write");
        assert_eq!(f.sig.params.len(), 2);
        assert_eq!(f.sig.params[0].names, vec!["k", "v"]);
        assert_eq!(f.sig.params[0].ty.to_string(), "int");
        assert_eq!(f.sig.results[0].ty.to_string(), "error");
    }

    #[test]
    fn test_ms003_unnamed_params() {
        let f = only_func("package p\nfunc f(int, []string, *pkg.T) (string, bool)\n");
        let types: Vec<_> = f.sig.params.iter().map(|p| p.ty.to_string()).collect();
        assert_eq!(types, vec!["int", "[]string", "*pkg.T"]);
        assert!(f.sig.params.iter().all(|p| p.names.is_empty()));
        assert_eq!(f.sig.results.len(), 2);
    }

    #[test]
    fn test_ms003_mixed_params_rejected() {
        let err = parse_file("package p\nfunc f(a int, string) {}\n").unwrap_err();
        assert!(err.message.contains("mixed named and unnamed"));
    }

    #[test]
    fn test_ms003_receivers() {
        let f = only_func("package p\nfunc (c *Counter) Map(k int, v string, ctx Context) {}\n");
        assert_eq!(f.recv_name(), Some("Counter"));
        let f = only_func("package p\nfunc (c Counter) Reset() {}\n");
        assert_eq!(f.recv_name(), Some("Counter"));
        let f = only_func("package p\nfunc (l *List[T]) Len() int { return 0 }\n");
        assert_eq!(f.recv_name(), Some("List"));
        let f = only_func("package p\nfunc (*Counter) Anon() {}\n");
        assert_eq!(f.recv_name(), Some("Counter"));
    }

    #[test]
    fn test_ms003_multiple_receivers_rejected() {
        let err = parse_file("package p\nfunc (a, b T) M() {}\n").unwrap_err();
        assert!(err.message.contains("multiple receivers"));
    }

    #[test]
    fn test_ms003_body_is_skipped() {
        let src = r#"package p

func NewCounter() *Counter {
	m := map[string]int{"a": 1}
	if len(m) > 0 {
		go func() { ch <- struct{}{} }()
	}
	return &Counter{}
}

type Counter struct{}
"#;
        let file = parse_file(src).unwrap();
        assert_eq!(file.decls.len(), 2);
        assert!(matches!(&file.decls[1], Decl::Type(t) if t.specs[0].name.name == "Counter"));
    }

    #[test]
    fn test_ms003_struct_fields() {
        let t = only_type(
            "package p\ntype S struct {\n\ta, b int `json:\"a\"`\n\tio.Reader\n\t*Base\n\tbuf [4]byte\n\tl List[int]\n\tGen[string]\n}\n",
        );
        let TypeExpr::Struct(fields) = &t.specs[0].ty else {
            panic!("expected struct");
        };
        let rendered: Vec<_> = fields.iter().map(|f| (f.names.clone(), f.ty.to_string())).collect();
        assert_eq!(
            rendered,
            vec![
                (vec!["a".to_string(), "b".to_string()], "int".to_string()),
                (vec![], "io.Reader".to_string()),
                (vec![], "*Base".to_string()),
                (vec!["buf".to_string()], "[4]byte".to_string()),
                (vec!["l".to_string()], "List[int]".to_string()),
                (vec![], "Gen[string]".to_string()),
            ]
        );
    }

    #[test]
    fn test_ms003_interface_methods() {
        let t = only_type(
            "package p\ntype Context interface {\n\tWrite(k int, v int)\n\tNext() (string, bool)\n\tfmt.Stringer\n}\n",
        );
        let TypeExpr::Interface(elems) = &t.specs[0].ty else {
            panic!("expected interface");
        };
        assert_eq!(elems.len(), 3);
        assert!(matches!(&elems[0], InterfaceElem::Method { name, sig } if name.name == "Write" && sig.params.len() == 2));
        assert!(matches!(&elems[2], InterfaceElem::Embedded(_)));
        assert_eq!(
            t.specs[0].ty.to_string(),
            "interface{ Write(k int, v int); Next() (string, bool); fmt.Stringer }"
        );
    }

    #[test]
    fn test_ms003_grouped_type_docs() {
        let src = r#"package p

// Shared doc.
type (
	// @mapper
	Counter struct{}

	Other int
)
"#;
        let t = only_type(src);
        assert_eq!(t.doc, vec!["// Shared doc."]);
        assert_eq!(t.specs[0].doc, vec!["// @mapper"]);
        assert!(t.specs[1].doc.is_empty());
    }

    #[test]
    fn test_ms003_single_spec_doc_on_decl() {
        let t = only_type("package p\n\n// @reducer\ntype Sum struct{ total int }\n");
        assert_eq!(t.doc, vec!["// @reducer"]);
        assert!(t.specs[0].doc.is_empty());
    }

    #[test]
    fn test_ms003_generic_and_array_specs() {
        let t = only_type("package p\ntype List[T any] struct{ items []T }\n");
        assert_eq!(t.specs[0].type_params[0].names, vec!["T"]);
        let t = only_type("package p\ntype Buf [16]byte\n");
        assert!(t.specs[0].type_params.is_empty());
        assert_eq!(t.specs[0].ty.to_string(), "[16]byte");
        let t = only_type("package p\ntype Num[T ~int | ~int64] []T\n");
        assert_eq!(t.specs[0].type_params[0].ty.to_string(), "~int | ~int64");
        let t = only_type("package p\ntype A = B\n");
        assert!(t.specs[0].alias);
    }

    #[test]
    fn test_ms003_complex_types_render() {
        let f = only_func(
            "package p\nfunc f(m map[string][]int, c <-chan int, s chan<- bool, cb func(int) error, xs ...string) {}\n",
        );
        let types: Vec<_> = f.sig.params.iter().map(|p| p.ty.to_string()).collect();
        assert_eq!(
            types,
            vec![
                "map[string][]int",
                "<-chan int",
                "chan<- bool",
                "func(int) error",
                "...string"
            ]
        );
    }

    #[test]
    fn test_ms003_value_decls() {
        let src = "package p\nvar a, b = 1, 2\nconst (\n\tX = iota\n\tY\n)\nvar f = func() int {\n\treturn 1\n}()\n";
        let file = parse_file(src).unwrap();
        let names: Vec<_> = file
            .decls
            .iter()
            .flat_map(|d| match d {
                Decl::Value(v) => v.names.iter().map(|n| n.name.clone()).collect(),
                _ => vec![],
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "X", "Y", "f"]);
    }

    #[test]
    fn test_ms003_build_constraints() {
        let file = parse_file("//go:build ignore\n\npackage p\n").unwrap();
        assert_eq!(file.build_constraints().collect::<Vec<_>>(), vec!["//go:build ignore"]);
    }

    #[test]
    fn test_ms003_statement_outside_function() {
        let err = parse_file("package p\nx := 1\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("non-declaration statement"));
    }

    #[test]
    fn test_ms003_missing_package_clause() {
        let err = parse_file("func f() {}\n").unwrap_err();
        assert!(err.message.contains("expected package"));
    }

    #[test]
    fn test_ms003_unbalanced_body() {
        let err = parse_file("package p\nfunc f() {\n").unwrap_err();
        assert!(err.message.contains("'}'"));
    }
}
