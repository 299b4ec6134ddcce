//! Private-variable commitment consistency checks

use super::{paths, public_vars, Finding};
use crate::commitment;
use crate::manifest::{Binding, Manifest, VarSpec};

/// Check every `private.vars` entry against its public commitment and its
/// container usage.
///
/// Each entry must have a commitment in `manifest.vars` whose digest matches
/// a recomputation over the private value and nonce, and must be referenced
/// by at least one `$name` binding. A literal binding carrying the variable's
/// name is flagged: it would put secret-shaped data into the public document.
pub fn check_private_vars(manifest: &Manifest) -> Vec<Finding> {
    let Some(private) = manifest.private.as_ref() else {
        // Wholly absent private sections are the container checker's concern.
        return Vec::new();
    };

    let mut findings = Vec::new();
    for (name, spec) in &private.vars {
        match manifest.manifest.var(name) {
            None => {
                findings.push(Finding::new(
                    paths::private_var(name),
                    format!("private var has no corresponding commitment in manifest.vars. var={name}"),
                ));
            }
            Some(VarSpec::Literal { .. }) => {
                findings.push(Finding::new(
                    paths::manifest_var(name),
                    format!("public entry for private var is a literal, not a commitment. var={name}"),
                ));
            }
            Some(VarSpec::Commitment { value: public_digest, .. }) => {
                match commitment::hash_private_var(spec) {
                    Ok(recomputed) if &recomputed == public_digest => {}
                    Ok(recomputed) => {
                        findings.push(Finding::new(
                            paths::manifest_var(name),
                            format!(
                                "private var hash does not match its commitment. var={name} public-hash={public_digest} hashed-value={recomputed}"
                            ),
                        ));
                    }
                    Err(err) => {
                        findings.push(Finding::new(
                            paths::private_var(name),
                            format!("private var could not be canonicalized: {err}"),
                        ));
                    }
                }
            }
        }

        findings.extend(check_usage(manifest, name));
    }

    findings
}

fn check_usage(manifest: &Manifest, name: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (index, container) in manifest.manifest.containers.iter().enumerate() {
        for (env_name, raw) in container.environment_entries() {
            if Binding::parse(raw) == Binding::Literal(name) {
                findings.push(Finding::new(
                    paths::container_env(index, env_name),
                    format!("private var bound as a literal; secrets must be referenced as ${name}. var={name}"),
                ));
            }
        }
    }

    if !public_vars::is_referenced(manifest, name) {
        findings.push(Finding::new(
            paths::private_var(name),
            format!("private var is never referenced by a container environment. var={name}"),
        ));
    }

    findings
}
