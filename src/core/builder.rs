//! MS-005: Build a `Package` model from a directory of Go source.
//!
//! Selects the buildable files, parses and validates them as one unit, then
//! extracts structs, interfaces and free functions. Methods are attached to
//! their receiver struct once every struct is known.

use super::constraint::BuildContext;
use super::parser::{parse_file, Decl, Field, FuncDecl, InterfaceElem, SourceFile, TypeExpr};
use super::types::{Func, Interface, Method, Package, Param, Struct};
use super::validator::SourceValidator;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// One parsed `.go` file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub ast: SourceFile,
}

/// Turns directories into validated `Package` models.
pub struct SourceModelBuilder<'v> {
    validator: &'v dyn SourceValidator,
    context: BuildContext,
}

impl<'v> SourceModelBuilder<'v> {
    /// Builder selecting files for the host platform.
    pub fn new(validator: &'v dyn SourceValidator) -> Self {
        Self {
            validator,
            context: BuildContext::host(),
        }
    }

    pub fn with_context(mut self, context: BuildContext) -> Self {
        self.context = context;
        self
    }

    /// Load, validate and extract the package in `dir`.
    pub fn build(&self, dir: &Path) -> Result<Package> {
        let files = load_unit(dir, &self.context)?;
        self.validator.validate(dir, &files)?;
        let package = extract(dir, &files);
        tracing::info!(
            package = %package.name,
            dir = %dir.display(),
            structs = package.structs.len(),
            interfaces = package.interfaces.len(),
            functions = package.functions.len(),
            "loaded package"
        );
        Ok(package)
    }
}

/// Candidate `.go` files in `dir`, sorted by name.
///
/// Test files, names starting with `_` or `.`, and names whose
/// `_GOOS`/`_GOARCH` suffix does not match `context` are skipped. Header
/// constraints are checked later, once the file has been parsed.
pub fn source_files(dir: &Path, context: &BuildContext) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::read(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::read(dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        let selected = name.ends_with(".go")
            && !name.ends_with("_test.go")
            && !name.starts_with('_')
            && !name.starts_with('.');
        if !selected {
            continue;
        }
        if !context.matches_file_name(&name) {
            tracing::debug!(file = %name, goos = %context.goos, goarch = %context.goarch, "skipping file for another platform");
            continue;
        }
        let is_file = entry
            .file_type()
            .map_err(|e| Error::read(entry.path(), e))?
            .is_file();
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Read and parse every buildable file of the unit.
pub fn load_unit(dir: &Path, context: &BuildContext) -> Result<Vec<ParsedFile>> {
    let mut unit = Vec::new();
    for path in source_files(dir, context)? {
        let src = std::fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
        let ast = parse_file(&src)
            .map_err(|e| Error::validation(&path, Some(e.line), e.message))?;
        let included = context
            .matches_constraints(ast.build_constraints())
            .map_err(|message| Error::validation(&path, None, message))?;
        if !included {
            tracing::debug!(file = %path.display(), "skipping file excluded by build constraint");
            continue;
        }
        unit.push(ParsedFile { path, ast });
    }
    if unit.is_empty() {
        return Err(Error::NoSourceFiles {
            path: dir.to_path_buf(),
        });
    }
    Ok(unit)
}

/// Extract the package model from a validated unit.
pub fn extract(dir: &Path, files: &[ParsedFile]) -> Package {
    let name = files
        .first()
        .map(|f| f.ast.package.name.clone())
        .unwrap_or_default();
    let mut structs = Vec::new();
    let mut interfaces = Vec::new();
    let mut functions = Vec::new();
    let mut methods: Vec<&FuncDecl> = Vec::new();

    for file in files {
        for decl in &file.ast.decls {
            match decl {
                Decl::Type(td) => {
                    for spec in &td.specs {
                        match &spec.ty {
                            TypeExpr::Struct(_) => {
                                let marker = td
                                    .doc
                                    .iter()
                                    .chain(&spec.doc)
                                    .map(String::as_str)
                                    .collect::<Vec<_>>()
                                    .join("\n");
                                tracing::debug!(file = %file.path.display(), "struct {}", spec.name.name);
                                structs.push(Struct {
                                    name: spec.name.name.clone(),
                                    marker,
                                    methods: Vec::new(),
                                });
                            }
                            TypeExpr::Interface(elems) => {
                                tracing::debug!(file = %file.path.display(), "interface {}", spec.name.name);
                                interfaces.push(interface(&spec.name.name, elems));
                            }
                            _ => {}
                        }
                    }
                }
                Decl::Func(fd) if fd.recv.is_some() => methods.push(fd),
                Decl::Func(fd) => {
                    tracing::debug!(file = %file.path.display(), "func {}", fd.name.name);
                    functions.push(func(fd));
                }
                Decl::Value(_) => {}
            }
        }
    }

    for fd in methods {
        let Some(recv) = fd.recv_name() else { continue };
        match structs.iter_mut().find(|s| s.name == recv) {
            Some(owner) => {
                tracing::debug!("method {}.{}", recv, fd.name.name);
                owner.methods.push(Method {
                    func: func(fd),
                    receiver: recv.to_string(),
                });
            }
            None => tracing::debug!("method {}.{} not on a struct", recv, fd.name.name),
        }
    }

    Package {
        name,
        dir: dir.to_path_buf(),
        structs,
        interfaces,
        functions,
    }
}

fn func(fd: &FuncDecl) -> Func {
    Func {
        name: fd.name.name.clone(),
        params: params(&fd.sig.params),
        returns: params(&fd.sig.results),
    }
}

fn interface(name: &str, elems: &[InterfaceElem]) -> Interface {
    let methods = elems
        .iter()
        .filter_map(|elem| match elem {
            InterfaceElem::Method { name: method, sig } => Some(Method {
                func: Func {
                    name: method.name.clone(),
                    params: params(&sig.params),
                    returns: params(&sig.results),
                },
                receiver: name.to_string(),
            }),
            InterfaceElem::Embedded(_) => None,
        })
        .collect();
    Interface {
        name: name.to_string(),
        methods,
    }
}

/// One `Param` per declared name; an unnamed field yields one unnamed param.
fn params(fields: &[Field]) -> Vec<Param> {
    let mut out = Vec::new();
    for field in fields {
        let ty = field.ty.to_string();
        if field.names.is_empty() {
            out.push(Param::new("", ty));
        } else {
            out.extend(field.names.iter().map(|n| Param::new(n.as_str(), ty.as_str())));
        }
    }
    out
}
