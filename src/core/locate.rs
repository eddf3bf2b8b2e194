//! MS-010: Map user-supplied paths to package directories.
//!
//! Local paths (`.`, `..`, `./x`, `../x`) are used as given. Anything else is
//! tried literally, then under `<primary>/src`, then under `<secondary>/src`.
//! A path naming a file resolves to its parent directory.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Whether `path` is a local (working-directory relative) path.
pub fn is_local(path: &str) -> bool {
    path == "." || path == ".." || path.starts_with("./") || path.starts_with("../")
}

/// Search roots for non-local paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
}

impl Locator {
    pub fn new(primary: Option<PathBuf>, secondary: Option<PathBuf>) -> Self {
        Self { primary, secondary }
    }

    /// Places `input` may live, in lookup order.
    pub fn candidates(&self, input: &str) -> Vec<PathBuf> {
        let mut out = vec![PathBuf::from(input)];
        if !is_local(input) {
            for root in [&self.primary, &self.secondary].into_iter().flatten() {
                out.push(root.join("src").join(input));
            }
        }
        out
    }

    /// Resolve `input` to an existing package directory.
    pub fn locate(&self, input: &str) -> Result<PathBuf> {
        let candidates = self.candidates(input);
        for candidate in &candidates {
            let Ok(meta) = std::fs::metadata(candidate) else {
                tracing::debug!(path = %candidate.display(), "not found");
                continue;
            };
            let dir = if meta.is_dir() {
                candidate.clone()
            } else {
                parent_dir(candidate)
            };
            tracing::debug!(input, dir = %dir.display(), "located package");
            return Ok(dir);
        }
        let tried: Vec<String> = candidates.iter().map(|c| c.display().to_string()).collect();
        Err(Error::read(
            input,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not found (tried {})", tried.join(", ")),
            ),
        ))
    }
}

fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
