//! MS-008: Go primitive to Hadoop Writable / Java type mapping.

use super::types::{Param, SEQUENCE_MARKER};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Wrapper used for a reducer's value-in sequence.
pub const SEQUENCE_WIRE_WRAPPER: &str = "Iterable";

/// (source, wire, host) rows of the standard table.
const STANDARD: &[(&str, &str, &str)] = &[
    ("int", "LongWritable", "long"),
    ("int32", "IntWritable", "int"),
    ("int64", "LongWritable", "long"),
    ("long", "LongWritable", "long"),
    ("float32", "FloatWritable", "float"),
    ("float64", "DoubleWritable", "double"),
    ("bool", "BooleanWritable", "boolean"),
    ("string", "Text", "String"),
];

/// Wire-level type for a source type.
///
/// `Unknown` is a sentinel, not an error. It renders as an empty string and
/// leaves the decision to whoever renders the descriptor. A sequence keeps
/// its `Iterable<..>` wrapper even when the element type is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Scalar(&'static str),
    Sequence(Option<&'static str>),
    Unknown,
}

impl WireType {
    pub fn is_known(self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Sequence(Some(_)))
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(name) => write!(f, "{}", name),
            Self::Sequence(elem) => {
                write!(f, "{}<{}>", SEQUENCE_WIRE_WRAPPER, elem.unwrap_or_default())
            }
            Self::Unknown => Ok(()),
        }
    }
}

impl Serialize for WireType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    wire: &'static str,
    host: &'static str,
}

/// Immutable lookup table, built once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMappingTable {
    entries: IndexMap<&'static str, Mapping>,
}

impl Default for TypeMappingTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TypeMappingTable {
    /// The enumerated primitive set.
    pub fn standard() -> Self {
        let entries = STANDARD
            .iter()
            .map(|&(source, wire, host)| (source, Mapping { wire, host }))
            .collect();
        Self { entries }
    }

    /// Source types the table knows, in table order.
    pub fn sources(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn wire_type(&self, source: &str) -> WireType {
        match self.entries.get(source) {
            Some(m) => WireType::Scalar(m.wire),
            None => WireType::Unknown,
        }
    }

    /// Host-language name; unknown types pass through unchanged.
    pub fn host_type<'s>(&self, source: &'s str) -> &'s str {
        match self.entries.get(source) {
            Some(m) => m.host,
            None => source,
        }
    }

    /// Wire type of a reducer's value-in. `[]T` becomes `Iterable<wire(T)>`,
    /// and `Iterable<>` when `T` is not in the table.
    pub fn value_in_wire_type(&self, source: &str) -> WireType {
        match source.strip_prefix(SEQUENCE_MARKER) {
            Some(elem) => match self.wire_type(elem) {
                WireType::Scalar(name) => WireType::Sequence(Some(name)),
                _ => WireType::Sequence(None),
            },
            None => self.wire_type(source),
        }
    }

    /// Binding for a key/value parameter.
    pub fn binding(&self, param: &Param) -> TypeBinding {
        self.bind(param, self.wire_type(&param.type_name))
    }

    /// Binding for a value-in parameter, honoring the sequence rule.
    pub fn value_in_binding(&self, param: &Param) -> TypeBinding {
        self.bind(param, self.value_in_wire_type(&param.type_name))
    }

    fn bind(&self, param: &Param, wire: WireType) -> TypeBinding {
        TypeBinding {
            source: param.type_name.clone(),
            wire,
            host: self.host_type(&param.type_name).to_string(),
        }
    }
}

/// A key or value slot with its type in all three type systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeBinding {
    pub source: String,
    pub wire: WireType,
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ms008_standard_rows() {
        let t = TypeMappingTable::standard();
        assert_eq!(t.wire_type("int"), WireType::Scalar("LongWritable"));
        assert_eq!(t.wire_type("int32"), WireType::Scalar("IntWritable"));
        assert_eq!(t.wire_type("float64").to_string(), "DoubleWritable");
        assert_eq!(t.wire_type("bool").to_string(), "BooleanWritable");
        assert_eq!(t.wire_type("string").to_string(), "Text");
        assert_eq!(t.host_type("int"), "long");
        assert_eq!(t.host_type("int32"), "int");
        assert_eq!(t.host_type("float32"), "float");
        assert_eq!(t.host_type("string"), "String");
    }

    #[test]
    fn test_ms008_every_source_is_total() {
        let t = TypeMappingTable::standard();
        assert_eq!(t.sources().count(), 8);
        for source in t.sources() {
            assert!(t.wire_type(source).is_known(), "{}", source);
            assert_ne!(t.host_type(source), source, "{}", source);
        }
    }

    #[test]
    fn test_ms008_unknown_type() {
        let t = TypeMappingTable::standard();
        assert_eq!(t.wire_type("complex128"), WireType::Unknown);
        assert_eq!(t.wire_type("complex128").to_string(), "");
        assert_eq!(t.host_type("complex128"), "complex128");
        assert_eq!(t.host_type("*pkg.Thing"), "*pkg.Thing");
    }

    #[test]
    fn test_ms008_value_in_sequence() {
        let t = TypeMappingTable::standard();
        assert_eq!(t.value_in_wire_type("[]int").to_string(), "Iterable<LongWritable>");
        assert_eq!(t.value_in_wire_type("[]string").to_string(), "Iterable<Text>");
        assert_eq!(t.value_in_wire_type("string").to_string(), "Text");
        assert_eq!(t.value_in_wire_type("[]complex64"), WireType::Sequence(None));
        assert_eq!(t.value_in_wire_type("[]complex64").to_string(), "Iterable<>");
        assert!(!t.value_in_wire_type("[]complex64").is_known());
        assert_eq!(t.value_in_wire_type("complex64"), WireType::Unknown);
    }

    #[test]
    fn test_ms008_binding() {
        let t = TypeMappingTable::standard();
        let b = t.value_in_binding(&Param::new("values", "[]int"));
        assert_eq!(b.source, "[]int");
        assert_eq!(b.wire.to_string(), "Iterable<LongWritable>");
        assert_eq!(b.host, "[]int");

        let b = t.binding(&Param::new("k", "string"));
        assert_eq!(b.wire, WireType::Scalar("Text"));
        assert_eq!(b.host, "String");
    }

    #[test]
    fn test_ms008_wire_serializes_as_string() {
        let t = TypeMappingTable::standard();
        let json = serde_json::to_string(&t.binding(&Param::new("", "chan int"))).unwrap();
        assert_eq!(json, r#"{"source":"chan int","wire":"","host":"chan int"}"#);
    }

    proptest! {
        #[test]
        fn test_ms008_unknown_passthrough(name in "[a-z][a-zA-Z0-9_]{0,12}") {
            let t = TypeMappingTable::standard();
            prop_assume!(t.sources().all(|s| s != name));
            prop_assert_eq!(t.wire_type(&name), WireType::Unknown);
            prop_assert_eq!(t.host_type(&name), name.as_str());
        }

        #[test]
        fn test_ms008_sequence_wraps_scalar(idx in 0usize..8) {
            let t = TypeMappingTable::standard();
            let source = t.sources().nth(idx).unwrap();
            let seq = format!("[]{}", source);
            prop_assert_eq!(
                t.value_in_wire_type(&seq).to_string(),
                format!("Iterable<{}>", t.wire_type(source))
            );
        }
    }
}
