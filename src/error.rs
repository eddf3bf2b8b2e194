//! MS-000: Error taxonomy for the extraction and resolution engine.
//!
//! Every failure is fatal for the run. The engine returns these as values;
//! only the binary decides to print and exit.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error kinds.
#[derive(Debug, Error)]
pub enum Error {
    /// A source root is missing or a file cannot be read.
    #[error("reading source {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source root exists but holds nothing to build a package from.
    #[error("reading source {}: no buildable Go source files", path.display())]
    NoSourceFiles { path: PathBuf },

    /// The unit failed syntax or semantic validation.
    #[error("checking package: {}{}: {message}", file.display(), line.map(|l| format!(":{l}")).unwrap_or_default())]
    SourceValidation {
        file: PathBuf,
        line: Option<usize>,
        message: String,
    },

    /// A marked struct does not follow the naming convention.
    #[error(transparent)]
    ConventionResolution(#[from] ResolutionError),

    /// No struct in any input carried a role marker.
    #[error("no targets found")]
    NoTargets,

    /// Configuration file could not be loaded (CLI layer only).
    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// A model or descriptor could not be rendered.
    #[error("rendering output: {0}")]
    Render(String),

    /// The output file could not be written (CLI layer only).
    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceRead {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(
        file: impl Into<PathBuf>,
        line: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::SourceValidation {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

/// A convention violation found while resolving one candidate.
///
/// Each variant names the package, the owning struct or interface, and the
/// member that could not be found or has the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("unable to locate constructor function {package}.{constructor} for struct {decl}")]
    MissingConstructor {
        package: String,
        decl: String,
        constructor: String,
    },

    #[error("unable to locate \"{method}\" method on struct {package}.{decl}")]
    MissingMethod {
        package: String,
        decl: String,
        method: String,
    },

    #[error("\"{method}\" method on struct {package}.{decl} takes {found} parameter(s), need at least {expected}")]
    MethodArity {
        package: String,
        decl: String,
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("unable to locate interface {package}.{interface} (context of {decl}.{method})")]
    MissingInterface {
        package: String,
        decl: String,
        method: String,
        interface: String,
    },

    #[error("unable to locate \"{method}\" method on interface {package}.{interface}")]
    MissingCapability {
        package: String,
        interface: String,
        method: String,
    },

    #[error("\"{method}\" method on interface {package}.{interface} {problem}")]
    CapabilityShape {
        package: String,
        interface: String,
        method: String,
        problem: String,
    },
}

impl ResolutionError {
    /// The struct or interface the missing member belongs to.
    pub fn owner(&self) -> &str {
        match self {
            Self::MissingConstructor { decl, .. }
            | Self::MissingMethod { decl, .. }
            | Self::MethodArity { decl, .. } => decl,
            Self::MissingInterface { interface, .. }
            | Self::MissingCapability { interface, .. }
            | Self::CapabilityShape { interface, .. } => interface,
        }
    }

    /// The member that could not be resolved.
    pub fn member(&self) -> &str {
        match self {
            Self::MissingConstructor { constructor, .. } => constructor,
            Self::MissingMethod { method, .. }
            | Self::MethodArity { method, .. }
            | Self::MissingCapability { method, .. }
            | Self::CapabilityShape { method, .. } => method,
            Self::MissingInterface { interface, .. } => interface,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms000_validation_message_with_line() {
        let e = Error::validation("pkg/a.go", Some(12), "undefined: Foo");
        assert_eq!(e.to_string(), "checking package: pkg/a.go:12: undefined: Foo");
    }

    #[test]
    fn test_ms000_validation_message_without_line() {
        let e = Error::validation("pkg", None, "go build failed");
        assert_eq!(e.to_string(), "checking package: pkg: go build failed");
    }

    #[test]
    fn test_ms000_resolution_is_single_line() {
        let e: Error = ResolutionError::MissingCapability {
            package: "wc".to_string(),
            interface: "Context".to_string(),
            method: "Write".to_string(),
        }
        .into();
        let msg = e.to_string();
        assert!(!msg.contains('\n'));
        assert!(msg.contains("wc.Context"));
        assert!(msg.contains("Write"));
    }

    #[test]
    fn test_ms000_owner_and_member() {
        let e = ResolutionError::MissingMethod {
            package: "wc".to_string(),
            decl: "Counter".to_string(),
            method: "Map".to_string(),
        };
        assert_eq!(e.owner(), "Counter");
        assert_eq!(e.member(), "Map");
    }

    #[test]
    fn test_ms000_constructor_owner_is_struct() {
        let e = ResolutionError::MissingConstructor {
            package: "wc".to_string(),
            decl: "Counter".to_string(),
            constructor: "NewCounter".to_string(),
        };
        assert_eq!(e.owner(), "Counter");
        assert_eq!(e.member(), "NewCounter");
        assert_eq!(
            e.to_string(),
            "unable to locate constructor function wc.NewCounter for struct Counter"
        );
    }
}
