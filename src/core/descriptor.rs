//! MS-009: Renderer-facing descriptor for a resolved target.
//!
//! Everything a shim renderer needs (Java names, gobind names, the four
//! key/value bindings, the output location) computed up front as plain data.

use super::typemap::{TypeBinding, TypeMappingTable};
use super::types::{Role, Target};
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Java package prefix of generated shims.
pub const JAVA_PACKAGE_PREFIX: &str = "go";

/// Output location relative to the package directory.
pub const OUTPUT_SUBDIR: &str = "build/java/go";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    pub role: Role,
    pub package: String,
    pub go_struct: String,
    pub go_ctx_interface: String,

    pub java_package: String,
    pub java_class_name: String,

    pub gobind_class_root: String,
    pub gobind_ctx_class: String,
    pub gobind_class: String,
    pub gobind_constructor: String,
    pub gobind_method_name: String,

    pub mapred_method_name: String,
    pub mapred_class_name: String,

    pub key_in: TypeBinding,
    pub value_in: TypeBinding,
    pub key_out: TypeBinding,
    pub value_out: TypeBinding,

    /// Directory a renderer writes `<java_class_name>.java` into
    pub output_dir: PathBuf,

    /// `blake3:<hex>` of the target's canonical JSON
    pub fingerprint: String,
}

impl TargetDescriptor {
    /// File a renderer would produce for this target.
    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}.java", self.java_class_name))
    }
}

/// Upper-case the first character, keep the rest.
pub fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Hash of the target's canonical JSON. Returns `"blake3:{hex}"`.
pub fn fingerprint(target: &Target) -> Result<String> {
    let canonical = serde_json::to_string(target).map_err(|e| Error::Render(e.to_string()))?;
    Ok(format!("blake3:{}", blake3::hash(canonical.as_bytes()).to_hex()))
}

pub fn describe(target: &Target, types: &TypeMappingTable) -> Result<TargetDescriptor> {
    let root = title(&target.package.name);
    let (mapred_method_name, mapred_class_name) = match target.role {
        Role::Mapper => ("map", "Mapper"),
        Role::Reducer => ("reduce", "Reducer"),
    };
    // Only the reducer's input is a sequence on the wire.
    let value_in = match target.role {
        Role::Reducer => types.value_in_binding(&target.value_in),
        Role::Mapper => types.binding(&target.value_in),
    };

    Ok(TargetDescriptor {
        role: target.role,
        package: target.package.name.clone(),
        go_struct: target.decl.name.clone(),
        go_ctx_interface: target.ctx.name.clone(),
        java_package: format!("{}.{}", JAVA_PACKAGE_PREFIX, target.package.name),
        java_class_name: format!("{}{}", root, target.decl.name),
        gobind_ctx_class: format!("{}.{}", root, target.ctx.name),
        gobind_class: format!("{}.{}", root, target.decl.name),
        gobind_constructor: format!("{}.{}", root, target.ctor.name),
        gobind_method_name: target.method.name().to_string(),
        gobind_class_root: root,
        mapred_method_name: mapred_method_name.to_string(),
        mapred_class_name: mapred_class_name.to_string(),
        key_in: types.binding(&target.key_in),
        value_in,
        key_out: types.binding(&target.key_out),
        value_out: types.binding(&target.value_out),
        output_dir: target.package.dir.join(OUTPUT_SUBDIR),
        fingerprint: fingerprint(target)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Func, Interface, Method, PackageRef, Param, Struct};

    fn target(role: Role, value_in: &str) -> Target {
        let method = Method {
            func: Func {
                name: role.method_name().to_string(),
                params: Vec::new(),
                returns: Vec::new(),
            },
            receiver: "Counter".to_string(),
        };
        Target {
            role,
            package: PackageRef {
                name: "wordcount".to_string(),
                dir: PathBuf::from("/src/wordcount"),
            },
            decl: Struct {
                name: "Counter".to_string(),
                marker: "// @mapper @reducer".to_string(),
                methods: vec![method.clone()],
            },
            ctor: Func {
                name: "NewCounter".to_string(),
                params: Vec::new(),
                returns: vec![Param::new("", "*Counter")],
            },
            method,
            ctx: Interface {
                name: "Context".to_string(),
                methods: Vec::new(),
            },
            key_in: Param::new("k", "int"),
            value_in: Param::new("v", value_in),
            key_out: Param::new("k", "string"),
            value_out: Param::new("v", "int"),
        }
    }

    #[test]
    fn test_ms009_mapper_names() {
        let d = describe(&target(Role::Mapper, "string"), &TypeMappingTable::standard()).unwrap();
        assert_eq!(d.java_package, "go.wordcount");
        assert_eq!(d.java_class_name, "WordcountCounter");
        assert_eq!(d.gobind_class_root, "Wordcount");
        assert_eq!(d.gobind_ctx_class, "Wordcount.Context");
        assert_eq!(d.gobind_class, "Wordcount.Counter");
        assert_eq!(d.gobind_constructor, "Wordcount.NewCounter");
        assert_eq!(d.gobind_method_name, "Map");
        assert_eq!(d.mapred_method_name, "map");
        assert_eq!(d.mapred_class_name, "Mapper");
        assert_eq!(d.key_in.wire.to_string(), "LongWritable");
        assert_eq!(d.value_in.wire.to_string(), "Text");
        assert_eq!(d.key_out.host, "String");
        assert_eq!(d.output_dir, PathBuf::from("/src/wordcount/build/java/go"));
        assert_eq!(
            d.output_file(),
            PathBuf::from("/src/wordcount/build/java/go/WordcountCounter.java")
        );
        assert!(d.fingerprint.starts_with("blake3:"));
        assert_eq!(d.fingerprint.len(), 7 + 64);
    }

    #[test]
    fn test_ms009_reducer_sequence_value_in() {
        let d = describe(&target(Role::Reducer, "[]int"), &TypeMappingTable::standard()).unwrap();
        assert_eq!(d.mapred_method_name, "reduce");
        assert_eq!(d.mapred_class_name, "Reducer");
        assert_eq!(d.value_in.wire.to_string(), "Iterable<LongWritable>");
    }

    #[test]
    fn test_ms009_mapper_sequence_is_not_wrapped() {
        let d = describe(&target(Role::Mapper, "[]int"), &TypeMappingTable::standard()).unwrap();
        assert_eq!(d.value_in.wire.to_string(), "");

        let d = describe(&target(Role::Reducer, "[]complex64"), &TypeMappingTable::standard()).unwrap();
        assert_eq!(d.value_in.wire.to_string(), "Iterable<>");
        assert_eq!(d.value_in.host, "[]complex64");
    }

    #[test]
    fn test_ms009_fingerprint_tracks_target() {
        let a = fingerprint(&target(Role::Mapper, "string")).unwrap();
        let b = fingerprint(&target(Role::Mapper, "string")).unwrap();
        let c = fingerprint(&target(Role::Reducer, "string")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ms009_title() {
        assert_eq!(title("wordcount"), "Wordcount");
        assert_eq!(title("Already"), "Already");
        assert_eq!(title(""), "");
    }
}
