//! MS-004: Semantic validation of a parsed package.
//!
//! A unit must be self-consistent before any model is extracted from it.
//! Two validators exist:
//! - `BuiltinValidator`: declaration-level checks done in-process
//! - `GoToolchainValidator`: type-checks with `go build`
//! - `AutoValidator`: the toolchain when installed, else the builtin checks
//!
//! Both report the first problem as a `SourceValidation` error naming the
//! offending file.

use super::builder::ParsedFile;
use super::parser::{Decl, FuncDecl, InterfaceElem, TypeExpr};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Checks a parsed unit before extraction.
pub trait SourceValidator {
    fn validate(&self, dir: &Path, files: &[ParsedFile]) -> Result<()>;
}

/// Types every Go package can name without importing anything.
pub const PREDECLARED_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

// ============================================================================
// Builtin
// ============================================================================

/// In-process declaration-level checker.
///
/// Covers everything visible from declarations: package clause agreement,
/// redeclarations, receivers, and resolution of every type name used in a
/// type declaration or signature. Function bodies are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinValidator;

impl SourceValidator for BuiltinValidator {
    fn validate(&self, _dir: &Path, files: &[ParsedFile]) -> Result<()> {
        check_package_clause(files)?;
        let types = check_redeclarations(files)?;
        for file in files {
            check_file_types(file, &types)?;
        }
        Ok(())
    }
}

fn check_package_clause(files: &[ParsedFile]) -> Result<()> {
    let Some(first) = files.first() else {
        return Ok(());
    };
    for file in &files[1..] {
        if file.ast.package.name != first.ast.package.name {
            return Err(Error::validation(
                &file.path,
                Some(file.ast.package.line),
                format!(
                    "found packages {} ({}) and {} ({})",
                    first.ast.package.name,
                    file_name(&first.path),
                    file.ast.package.name,
                    file_name(&file.path)
                ),
            ));
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Returns the set of package-level type names.
fn check_redeclarations(files: &[ParsedFile]) -> Result<HashSet<String>> {
    let mut symbols: HashSet<String> = HashSet::new();
    let mut types: HashSet<String> = HashSet::new();
    let mut methods: HashSet<(String, String)> = HashSet::new();
    let mut declare = |name: &str, file: &ParsedFile, line: usize| -> Result<()> {
        if name != "_" && !symbols.insert(name.to_string()) {
            return Err(Error::validation(
                &file.path,
                Some(line),
                format!("{} redeclared in this block", name),
            ));
        }
        Ok(())
    };

    for file in files {
        for decl in &file.ast.decls {
            match decl {
                Decl::Type(td) => {
                    for spec in &td.specs {
                        declare(&spec.name.name, file, spec.name.line)?;
                        types.insert(spec.name.name.clone());
                    }
                }
                Decl::Value(vd) => {
                    for name in &vd.names {
                        declare(&name.name, file, name.line)?;
                    }
                }
                Decl::Func(fd) if fd.recv.is_none() => {
                    if fd.name.name != "init" {
                        declare(&fd.name.name, file, fd.name.line)?;
                    }
                }
                Decl::Func(_) => {}
            }
        }
    }

    for file in files {
        for decl in &file.ast.decls {
            let Decl::Func(fd) = decl else { continue };
            if fd.recv.is_none() {
                continue;
            }
            let recv = receiver_name(file, fd)?;
            if !types.contains(recv) {
                return Err(Error::validation(
                    &file.path,
                    Some(fd.name.line),
                    format!("undefined: {}", recv),
                ));
            }
            if fd.name.name != "_" && !methods.insert((recv.to_string(), fd.name.name.clone())) {
                return Err(Error::validation(
                    &file.path,
                    Some(fd.name.line),
                    format!("method {}.{} already declared", recv, fd.name.name),
                ));
            }
        }
    }
    Ok(types)
}

fn receiver_name<'a>(file: &ParsedFile, fd: &'a FuncDecl) -> Result<&'a str> {
    fd.recv_name().ok_or_else(|| {
        let shown = fd.recv_base().map(|t| t.to_string()).unwrap_or_default();
        Error::validation(
            &file.path,
            Some(fd.name.line),
            format!("invalid receiver type {}", shown),
        )
    })
}

struct Scope<'a> {
    file: &'a ParsedFile,
    package_types: &'a HashSet<String>,
    imports: HashSet<String>,
    dot_import: bool,
}

impl Scope<'_> {
    fn check(&self, ty: &TypeExpr, type_params: &HashSet<&str>) -> Result<()> {
        let mut problem: Option<(usize, String)> = None;
        ty.walk(&mut |node| {
            if problem.is_some() {
                return;
            }
            match node {
                TypeExpr::Named {
                    package: Some(qualifier),
                    name,
                    line,
                    ..
                } if !self.imports.contains(qualifier) => {
                    problem = Some((*line, format!("undefined: {}.{}", qualifier, name)));
                }
                TypeExpr::Named {
                    package: None,
                    name,
                    line,
                    ..
                } => {
                    let known = PREDECLARED_TYPES.contains(&name.as_str())
                        || self.package_types.contains(name)
                        || type_params.contains(name.as_str())
                        || self.dot_import;
                    if !known {
                        problem = Some((*line, format!("undefined: {}", name)));
                    }
                }
                TypeExpr::Interface(elems) => {
                    let mut seen = HashSet::new();
                    for elem in elems {
                        if let InterfaceElem::Method { name, .. } = elem {
                            if !seen.insert(name.name.as_str()) && problem.is_none() {
                                problem = Some((name.line, format!("duplicate method {}", name.name)));
                            }
                        }
                    }
                }
                _ => {}
            }
        });
        match problem {
            Some((line, message)) => Err(Error::validation(&self.file.path, Some(line), message)),
            None => Ok(()),
        }
    }
}

fn check_file_types(file: &ParsedFile, package_types: &HashSet<String>) -> Result<()> {
    let mut imports = HashSet::new();
    let mut dot_import = false;
    for import in &file.ast.imports {
        match import.name.as_deref() {
            Some(".") => dot_import = true,
            Some("_") => {}
            _ => imports.extend(import.local_names()),
        }
    }
    let scope = Scope {
        file,
        package_types,
        imports,
        dot_import,
    };

    for decl in &file.ast.decls {
        match decl {
            Decl::Type(td) => {
                for spec in &td.specs {
                    let params: HashSet<&str> = spec
                        .type_params
                        .iter()
                        .flat_map(|f| f.names.iter().map(String::as_str))
                        .collect();
                    for field in &spec.type_params {
                        scope.check(&field.ty, &params)?;
                    }
                    scope.check(&spec.ty, &params)?;
                }
            }
            Decl::Func(fd) => {
                let mut params: HashSet<&str> = fd
                    .type_params
                    .iter()
                    .flat_map(|f| f.names.iter().map(String::as_str))
                    .collect();
                if let Some(TypeExpr::Named { args, .. }) = fd.recv_base() {
                    for arg in args {
                        if let TypeExpr::Named { name, .. } = arg {
                            params.insert(name.as_str());
                        }
                    }
                }
                for field in &fd.type_params {
                    scope.check(&field.ty, &params)?;
                }
                let fields = fd.recv.iter().chain(&fd.sig.params).chain(&fd.sig.results);
                for field in fields {
                    scope.check(&field.ty, &params)?;
                }
            }
            Decl::Value(_) => {}
        }
    }
    Ok(())
}

// ============================================================================
// Go toolchain
// ============================================================================

/// Where `go build` discards its output.
const NULL_DEVICE: &str = if cfg!(windows) { "NUL" } else { "/dev/null" };

/// Type-checks the unit with `go build`, bodies and imports included.
///
/// Only the compiler runs; no vet analyzers are involved, so a unit that
/// compiles is accepted.
#[derive(Debug, Clone)]
pub struct GoToolchainValidator {
    go_bin: PathBuf,
}

impl GoToolchainValidator {
    pub fn new(go_bin: impl Into<PathBuf>) -> Self {
        Self {
            go_bin: go_bin.into(),
        }
    }

    fn spawn(&self, dir: &Path, files: &[ParsedFile]) -> std::io::Result<Output> {
        let names: Vec<String> = files.iter().map(|f| file_name(&f.path)).collect();
        tracing::debug!(go = %self.go_bin.display(), dir = %dir.display(), "running go build");
        Command::new(&self.go_bin)
            .args(["build", "-o", NULL_DEVICE])
            .args(&names)
            .current_dir(dir)
            .output()
    }

    fn spawn_failed(&self, dir: &Path, e: &std::io::Error) -> Error {
        Error::validation(
            dir,
            None,
            format!("failed to run {} build: {}", self.go_bin.display(), e),
        )
    }
}

impl SourceValidator for GoToolchainValidator {
    fn validate(&self, dir: &Path, files: &[ParsedFile]) -> Result<()> {
        let output = self
            .spawn(dir, files)
            .map_err(|e| self.spawn_failed(dir, &e))?;
        report(dir, &output)
    }
}

/// Map a finished `go build` to the first diagnostic it printed.
fn report(dir: &Path, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let first = stderr
        .lines()
        .find_map(parse_diagnostic)
        .map(|(file, line, message)| (dir.join(file), line, message));
    Err(match first {
        Some((file, line, message)) => Error::validation(file, line, message),
        None => {
            let summary = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty() && !l.starts_with('#'))
                .unwrap_or("go build failed")
                .to_string();
            Error::validation(dir, None, summary)
        }
    })
}

// ============================================================================
// Auto
// ============================================================================

/// Full type checking through the Go toolchain when one is installed,
/// declaration-level checks otherwise.
#[derive(Debug, Clone)]
pub struct AutoValidator {
    go: GoToolchainValidator,
}

impl AutoValidator {
    pub fn new(go_bin: impl Into<PathBuf>) -> Self {
        Self {
            go: GoToolchainValidator::new(go_bin),
        }
    }
}

impl SourceValidator for AutoValidator {
    fn validate(&self, dir: &Path, files: &[ParsedFile]) -> Result<()> {
        match self.go.spawn(dir, files) {
            Ok(output) => report(dir, &output),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    go = %self.go.go_bin.display(),
                    dir = %dir.display(),
                    "go toolchain not found, validating declarations only"
                );
                BuiltinValidator.validate(dir, files)
            }
            Err(e) => Err(self.go.spawn_failed(dir, &e)),
        }
    }
}

/// Write an executable stand-in for `go` that records its arguments in
/// `<dir>/args`, prints `stderr` and exits with `code`.
#[cfg(all(test, unix))]
pub(crate) fn fake_go(dir: &Path, stderr: &str, code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let bin = dir.join("go");
    let args = dir.join("args");
    let script = format!(
        "#!/bin/sh\necho \"$@\" > '{}'\ncat >&2 <<'EOF'\n{}\nEOF\nexit {}\n",
        args.display(),
        stderr,
        code
    );
    std::fs::write(&bin, script).unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    bin
}

/// Split a `path/file.go:LINE[:COL]: message` diagnostic.
fn parse_diagnostic(line: &str) -> Option<(PathBuf, Option<usize>, String)> {
    let idx = line.find(".go:")?;
    let head = &line[..idx + 3];
    let file = head.rsplit(char::is_whitespace).next().unwrap_or(head);
    let file = file.strip_prefix("./").unwrap_or(file);
    let mut rest = line[idx + 4..].splitn(3, ':');
    let lineno = rest.next().and_then(|n| n.trim().parse().ok());
    let tail: Vec<&str> = rest.collect();
    let message = match tail.as_slice() {
        [col, msg] if col.trim().parse::<usize>().is_ok() => msg.trim().to_string(),
        _ => tail.join(":").trim().to_string(),
    };
    Some((PathBuf::from(file), lineno, message))
}
