//! MS-007: Convention resolution for marked structs.
//!
//! Resolves the constructor, the processing method, the context interface and
//! its capability methods for one candidate. Every step is mandatory and the
//! first missing piece fails the candidate.

use super::scanner::Candidate;
use super::types::{Method, Role, Target};
use crate::error::ResolutionError;

/// Method every context interface must declare.
pub const WRITE: &str = "Write";

/// Method a reducer's context must declare to iterate values.
pub const NEXT: &str = "Next";

/// Prefix of the constructor function name.
pub const CONSTRUCTOR_PREFIX: &str = "New";

/// Minimum params of the processing method: (key, value, ctx) or (key, ctx).
pub fn min_params(role: Role) -> usize {
    match role {
        Role::Mapper => 3,
        Role::Reducer => 2,
    }
}

/// Resolve one candidate into a `Target`.
pub fn resolve(candidate: &Candidate<'_>) -> Result<Target, ResolutionError> {
    let Candidate {
        package,
        decl,
        role,
    } = *candidate;
    let pkg = package.name.as_str();

    // Constructor
    let ctor_name = format!("{}{}", CONSTRUCTOR_PREFIX, decl.name);
    let ctor = package
        .find_function(&ctor_name)
        .ok_or_else(|| ResolutionError::MissingConstructor {
            package: pkg.to_string(),
            decl: decl.name.clone(),
            constructor: ctor_name.clone(),
        })?;
    tracing::debug!("{}: constructor {}", decl.name, ctor.name);

    // Processing method
    let method_name = role.method_name();
    let method = decl
        .find_method(method_name)
        .ok_or_else(|| ResolutionError::MissingMethod {
            package: pkg.to_string(),
            decl: decl.name.clone(),
            method: method_name.to_string(),
        })?;
    let expected = min_params(role);
    let params = method.params();
    if params.len() < expected {
        return Err(ResolutionError::MethodArity {
            package: pkg.to_string(),
            decl: decl.name.clone(),
            method: method_name.to_string(),
            expected,
            found: params.len(),
        });
    }

    // Context interface
    let ctx_type = params[params.len() - 1].type_name.as_str();
    let ctx = package
        .find_interface(ctx_type)
        .ok_or_else(|| ResolutionError::MissingInterface {
            package: pkg.to_string(),
            decl: decl.name.clone(),
            method: method_name.to_string(),
            interface: ctx_type.to_string(),
        })?;
    tracing::debug!("{}.{}: context {}", decl.name, method_name, ctx.name);

    // Capabilities
    let capability = |name: &str| {
        ctx.find_method(name)
            .ok_or_else(|| ResolutionError::MissingCapability {
                package: pkg.to_string(),
                interface: ctx.name.clone(),
                method: name.to_string(),
            })
    };
    let shape = |m: &Method, problem: String| ResolutionError::CapabilityShape {
        package: pkg.to_string(),
        interface: ctx.name.clone(),
        method: m.name().to_string(),
        problem,
    };

    let write = capability(WRITE)?;
    if write.params().len() < 2 {
        return Err(shape(
            write,
            format!("takes {} parameter(s), need at least 2", write.params().len()),
        ));
    }

    let value_in = match role {
        Role::Mapper => params[1].clone(),
        Role::Reducer => {
            let next = capability(NEXT)?;
            if !next.params().is_empty() {
                return Err(shape(next, "must take no parameters".to_string()));
            }
            let first = next
                .returns()
                .first()
                .ok_or_else(|| shape(next, "must return at least one value".to_string()))?;
            first.clone()
        }
    };

    tracing::info!(package = pkg, "resolved {} {}", role, decl.name);
    Ok(Target {
        role,
        package: package.into(),
        decl: decl.clone(),
        ctor: ctor.clone(),
        method: method.clone(),
        ctx: ctx.clone(),
        key_in: params[0].clone(),
        value_in,
        key_out: write.params()[0].clone(),
        value_out: write.params()[1].clone(),
    })
}

/// Resolve candidates in order, stopping at the first failure.
pub fn resolve_all(candidates: &[Candidate<'_>]) -> Result<Vec<Target>, ResolutionError> {
    candidates.iter().map(resolve).collect()
}
