//! MS-006: Find structs that opt into a generation role.

use super::types::{Package, Role, Struct};
use crate::error::{Error, Result};

/// A struct carrying a role marker, not yet resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub package: &'a Package,
    pub decl: &'a Struct,
    pub role: Role,
}

/// Roles whose marker appears in `marker`, in `Role::ALL` order.
pub fn roles(marker: &str) -> impl Iterator<Item = Role> + '_ {
    Role::ALL
        .into_iter()
        .filter(move |role| marker.contains(role.marker()))
}

/// All candidates across packages, in package then struct order.
///
/// A struct marked with both roles yields two candidates, Mapper first.
pub fn scan(packages: &[Package]) -> Result<Vec<Candidate<'_>>> {
    let mut candidates = Vec::new();
    for package in packages {
        for decl in &package.structs {
            for role in roles(&decl.marker) {
                tracing::debug!(package = %package.name, "candidate {} ({})", decl.name, role);
                candidates.push(Candidate {
                    package,
                    decl,
                    role,
                });
            }
        }
    }
    if candidates.is_empty() {
        return Err(Error::NoTargets);
    }
    Ok(candidates)
}
