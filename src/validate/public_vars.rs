//! Public-variable usage check

use super::{paths, Finding};
use crate::manifest::{Binding, Manifest};

/// Every `manifest.vars` entry must be referenced by at least one container
/// environment binding (`$name`, matched against the reference target, not
/// the binding key). Unused declarations are an error; an absent `vars`
/// mapping is tolerated.
pub fn check_public_vars(manifest: &Manifest) -> Vec<Finding> {
    let Some(vars) = manifest.manifest.vars.as_ref() else {
        return Vec::new();
    };

    vars.keys()
        .filter(|name| !is_referenced(manifest, name))
        .map(|name| {
            Finding::new(
                paths::manifest_var(name),
                format!("public var declared but never referenced by a container environment. var={name}"),
            )
        })
        .collect()
}

pub(super) fn is_referenced(manifest: &Manifest, name: &str) -> bool {
    manifest
        .manifest
        .containers
        .iter()
        .flat_map(|container| container.environment_entries())
        .any(|(_, raw)| Binding::parse(raw).reference_target() == Some(name))
}
