//! MS-012: Optional TOML configuration.
//!
//! ```toml
//! [roots]
//! primary = "/usr/local/go"
//! secondary = "/home/me/go"
//!
//! [validation]
//! mode = "auto"   # or "go", "builtin"
//! go_bin = "go"
//! ```

use crate::core::locate::Locator;
use crate::core::validator::{
    AutoValidator, BuiltinValidator, GoToolchainValidator, SourceValidator,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "mrshim.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub roots: Roots,
    pub validation: Validation,
}

/// Search roots for non-local input paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Roots {
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Validation {
    pub mode: ValidationMode,
    pub go_bin: PathBuf,
}

impl Default for Validation {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Auto,
            go_bin: PathBuf::from("go"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// `go build` when the toolchain is installed, otherwise `builtin`.
    #[default]
    Auto,
    /// `go build`; a missing toolchain is an error.
    Go,
    /// Declaration-level checks only.
    Builtin,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist and parse. Without one, `mrshim.toml` in
    /// the working directory is used if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml_str(&content).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.message().to_string())
    }

    pub fn locator(&self) -> Locator {
        Locator::new(self.roots.primary.clone(), self.roots.secondary.clone())
    }

    pub fn validator(&self) -> Box<dyn SourceValidator> {
        match self.validation.mode {
            ValidationMode::Auto => Box::new(AutoValidator::new(&self.validation.go_bin)),
            ValidationMode::Builtin => Box::new(BuiltinValidator),
            ValidationMode::Go => Box::new(GoToolchainValidator::new(&self.validation.go_bin)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms012_defaults() {
        let s = Settings::from_toml_str("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.validation.mode, ValidationMode::Auto);
        assert_eq!(s.validation.go_bin, PathBuf::from("go"));
        assert_eq!(s.locator(), Locator::default());
    }

    #[test]
    fn test_ms012_full_file() {
        let s = Settings::from_toml_str(
            r#"
[roots]
primary = "/usr/local/go"
secondary = "/home/me/go"

[validation]
mode = "go"
go_bin = "/opt/go/bin/go"
"#,
        )
        .unwrap();
        assert_eq!(s.roots.primary, Some(PathBuf::from("/usr/local/go")));
        assert_eq!(s.roots.secondary, Some(PathBuf::from("/home/me/go")));
        assert_eq!(s.validation.mode, ValidationMode::Go);
        assert_eq!(s.validation.go_bin, PathBuf::from("/opt/go/bin/go"));
    }

    #[test]
    fn test_ms012_rejects_unknown_keys() {
        assert!(Settings::from_toml_str("[roots]\ntertiary = \"/x\"\n").is_err());
        assert!(Settings::from_toml_str("[validation]\nmode = \"strict\"\n").is_err());
    }

    #[test]
    fn test_ms012_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_ms012_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mrshim.toml");
        std::fs::write(&path, "[roots\nprimary = 1").unwrap();
        match Settings::load(Some(&path)) {
            Err(Error::Config { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_ms012_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mrshim.toml");
        std::fs::write(&path, "[roots]\nprimary = \"/go\"\n").unwrap();
        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.locator().primary, Some(PathBuf::from("/go")));
    }

    #[test]
    fn test_ms012_mode_names() {
        for (name, mode) in [
            ("auto", ValidationMode::Auto),
            ("go", ValidationMode::Go),
            ("builtin", ValidationMode::Builtin),
        ] {
            let s = Settings::from_toml_str(&format!("[validation]\nmode = \"{}\"\n", name)).unwrap();
            assert_eq!(s.validation.mode, mode);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_ms012_default_mode_checks_bodies() {
        let bin_dir = tempfile::tempdir().unwrap();
        let go = crate::core::validator::fake_go(
            bin_dir.path(),
            "# wc\n./counter.go:9:2: undefined: helper",
            1,
        );
        let pkg = tempfile::tempdir().unwrap();
        std::fs::write(
            pkg.path().join("counter.go"),
            "package wc\n\n// @mapper\ntype Counter struct{}\n\nfunc NewCounter() *Counter { return nil }\n\nfunc (c *Counter) Map(k int, v string, ctx Context) {\n\thelper(v)\n}\n\ntype Context interface{ Write(k string, v int) }\n",
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.validation.go_bin = go;
        let err = crate::Engine::from_settings(&settings)
            .run(&[pkg.path().to_str().unwrap()])
            .unwrap_err();
        match err {
            Error::SourceValidation { file, line, message } => {
                assert_eq!(file, pkg.path().join("counter.go"));
                assert_eq!(line, Some(9));
                assert_eq!(message, "undefined: helper");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
