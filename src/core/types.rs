//! MS-001: Source model and resolved target types.
//!
//! Packages, structs, interfaces, functions, methods and parameters as they
//! are extracted from Go source, plus the fully resolved `Target`. All types
//! are built once and never mutated afterwards. All derive `Serialize` so
//! descriptors and `inspect` output render deterministically.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Source model
// ============================================================================

/// One directory's Go package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    /// Package clause name
    pub name: String,

    /// Directory the package was loaded from
    pub dir: PathBuf,

    /// Struct types in declaration order
    pub structs: Vec<Struct>,

    /// Interface types in declaration order
    pub interfaces: Vec<Interface>,

    /// Free functions in declaration order
    pub functions: Vec<Func>,
}

impl Package {
    /// Look up a struct by name.
    pub fn find_struct(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// First free function with the given name.
    pub fn find_function(&self, name: &str) -> Option<&Func> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// First interface with the given name.
    pub fn find_interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// A struct type and the methods declared on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Struct {
    pub name: String,

    /// Leading doc comments, verbatim and newline-joined
    pub marker: String,

    pub methods: Vec<Method>,
}

impl Struct {
    /// First method with the given name.
    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.func.name == name)
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.marker)
    }
}

/// An interface type; methods carry signatures only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub name: String,
    pub methods: Vec<Method>,
}

impl Interface {
    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.func.name == name)
    }
}

/// A function signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Func {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
}

/// A function bound to a receiver type (struct or interface).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Method {
    #[serde(flatten)]
    pub func: Func,

    /// Receiver base type name (pointer and type arguments erased)
    pub receiver: String,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.func.name
    }

    pub fn params(&self) -> &[Param] {
        &self.func.params
    }

    pub fn returns(&self) -> &[Param] {
        &self.func.returns
    }
}

/// A parameter or result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    /// Empty for unnamed parameters and results
    pub name: String,

    /// Declared type in Go syntax, e.g. `int`, `[]string`, `*pkg.T`
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Prefix marking a sequence (slice) type.
pub const SEQUENCE_MARKER: &str = "[]";

impl Param {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Whether the declared type is a sequence (`[]T`).
    pub fn is_sequence(&self) -> bool {
        self.type_name.starts_with(SEQUENCE_MARKER)
    }

    /// Element type of a sequence, `None` for scalars.
    pub fn element_type(&self) -> Option<&str> {
        self.type_name.strip_prefix(SEQUENCE_MARKER)
    }
}

// ============================================================================
// Targets
// ============================================================================

/// Generation role a struct opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Mapper,
    Reducer,
}

impl Role {
    /// Both roles, in scan order.
    pub const ALL: [Role; 2] = [Role::Mapper, Role::Reducer];

    /// Doc-comment token that opts a struct into this role.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Mapper => "@mapper",
            Self::Reducer => "@reducer",
        }
    }

    /// Name of the processing method the struct must declare.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Mapper => "Map",
            Self::Reducer => "Reduce",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapper => write!(f, "Mapper"),
            Self::Reducer => write!(f, "Reducer"),
        }
    }
}

/// Identity of the package a target was resolved in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRef {
    pub name: String,
    pub dir: PathBuf,
}

impl From<&Package> for PackageRef {
    fn from(pkg: &Package) -> Self {
        Self {
            name: pkg.name.clone(),
            dir: pkg.dir.clone(),
        }
    }
}

/// A fully resolved declaration ready for shim generation.
///
/// Only `TargetResolver` constructs these, and only when every lookup
/// succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub role: Role,
    pub package: PackageRef,
    pub decl: Struct,
    pub ctor: Func,
    pub method: Method,
    pub ctx: Interface,
    pub key_in: Param,
    pub value_in: Param,
    pub key_out: Param,
    pub value_out: Param,
}

impl Target {
    pub fn is_mapper(&self) -> bool {
        self.role == Role::Mapper
    }

    pub fn is_reducer(&self) -> bool {
        self.role == Role::Reducer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms001_role_conventions() {
        assert_eq!(Role::Mapper.marker(), "@mapper");
        assert_eq!(Role::Reducer.marker(), "@reducer");
        assert_eq!(Role::Mapper.method_name(), "Map");
        assert_eq!(Role::Reducer.method_name(), "Reduce");
        assert_eq!(Role::Reducer.to_string(), "Reducer");
    }

    #[test]
    fn test_ms001_param_sequence() {
        let p = Param::new("vals", "[]int");
        assert!(p.is_sequence());
        assert_eq!(p.element_type(), Some("int"));
        let s = Param::new("", "string");
        assert!(!s.is_sequence());
        assert_eq!(s.element_type(), None);
    }

    #[test]
    fn test_ms001_struct_display() {
        let s = Struct {
            name: "Counter".to_string(),
            marker: "// @mapper".to_string(),
            methods: vec![],
        };
        assert_eq!(s.to_string(), "Counter{// @mapper}");
    }

    #[test]
    fn test_ms001_method_serializes_flat() {
        let m = Method {
            func: Func {
                name: "Write".to_string(),
                params: vec![Param::new("k", "int")],
                returns: vec![],
            },
            receiver: "Context".to_string(),
        };
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Write","params":[{"name":"k","type":"int"}],"returns":[],"receiver":"Context"}"#
        );
    }
}
