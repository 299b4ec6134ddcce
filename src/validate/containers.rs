//! Container and environment referential checks

use std::collections::BTreeSet;

use super::{paths, Finding};
use crate::manifest::{Binding, Manifest, RESERVED_ENV_PREFIX};

/// Check container id uniqueness and every environment binding.
///
/// Reference-form bindings must resolve to a declared public variable; when
/// the target is a commitment, the matching private entry must exist. A
/// wholly absent `private` section is recorded once, not per variable.
pub fn check_containers(manifest: &Manifest) -> Vec<Finding> {
    let mut findings = Vec::new();

    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for container in &manifest.manifest.containers {
        if !seen.insert(container.id.as_str()) {
            duplicates.insert(container.id.as_str());
        }
    }
    if !duplicates.is_empty() {
        let ids = duplicates.into_iter().collect::<Vec<_>>().join(", ");
        findings.push(Finding::new(
            paths::CONTAINERS,
            format!("duplicate container id(s): {ids}"),
        ));
    }

    let mut private_absent_reported = false;
    for (index, container) in manifest.manifest.containers.iter().enumerate() {
        for (name, raw) in container.environment_entries() {
            if name.starts_with(RESERVED_ENV_PREFIX) {
                findings.push(Finding::new(
                    paths::container_env(index, name),
                    format!(
                        "environment variable names starting with \"{RESERVED_ENV_PREFIX}\" are reserved. var={name}"
                    ),
                ));
            }

            let Some(target) = Binding::parse(raw).reference_target() else {
                continue;
            };

            let Some(var_spec) = manifest.manifest.var(target) else {
                findings.push(Finding::new(
                    paths::container_env(index, name),
                    format!("references a variable not declared in manifest.vars. var={target}"),
                ));
                continue;
            };

            if var_spec.is_commitment() {
                match &manifest.private {
                    None => {
                        if !private_absent_reported {
                            findings.push(Finding::new(
                                paths::PRIVATE,
                                "manifest.vars contains commitments but the private section is absent"
                                    .to_string(),
                            ));
                            private_absent_reported = true;
                        }
                    }
                    Some(private) => {
                        if !private.vars.contains_key(target) {
                            findings.push(Finding::new(
                                paths::container_env(index, name),
                                format!(
                                    "commitment has no counterpart in private.vars. var={target}"
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use serde_json::json;

    fn manifest_from(value: serde_json::Value) -> Manifest {
        serde_json::from_value(value).unwrap()
    }

    fn container(id: &str, environment: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "image": "hello-world@sha256:1234",
            "command": ["/bin/sh"],
            "workdir": "/root",
            "environment": environment
        })
    }

    #[test]
    fn duplicate_ids_reported_once_at_list_level() {
        let manifest = manifest_from(json!({
            "manifest": {
                "name": "app", "version": "1.0.0", "machine": "small",
                "containers": [
                    container("a", json!({})),
                    container("a", json!({})),
                    container("a", json!({}))
                ]
            }
        }));
        let findings = check_containers(&manifest);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "manifest.containers");
        assert!(findings[0].message.contains("duplicate container id(s): a"));
    }

    #[test]
    fn reserved_prefix_is_rejected_with_exact_path() {
        let manifest = manifest_from(json!({
            "manifest": {
                "name": "app", "version": "1.0.0", "machine": "small",
                "containers": [container("app", json!({ "CODIUS_K": "$AWS_KEY" }))],
                "vars": { "AWS_KEY": { "value": "v1" } }
            }
        }));
        let findings = check_containers(&manifest);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].path,
            "manifest.containers[0].environment.CODIUS_K"
        );
        assert!(findings[0].message.contains("reserved"));
    }

    #[test]
    fn undeclared_reference_is_an_error() {
        let manifest = manifest_from(json!({
            "manifest": {
                "name": "app", "version": "1.0.0", "machine": "small",
                "containers": [container("app", json!({ "K": "$MISSING" }))]
            }
        }));
        let findings = check_containers(&manifest);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "manifest.containers[0].environment.K");
        assert!(findings[0].message.contains("MISSING"));
    }

    #[test]
    fn literal_bindings_do_not_require_declarations() {
        // Absent manifest.vars is tolerated; only references are checked.
        let manifest = manifest_from(json!({
            "manifest": {
                "name": "app", "version": "1.0.0", "machine": "small",
                "containers": [container("app", json!({ "K": "plain-value" }))]
            }
        }));
        assert!(check_containers(&manifest).is_empty());
    }

    #[test]
    fn absent_private_section_reported_once() {
        let manifest = manifest_from(json!({
            "manifest": {
                "name": "app", "version": "1.0.0", "machine": "small",
                "containers": [
                    container("a", json!({ "K": "$SECRET" })),
                    container("b", json!({ "K": "$SECRET" }))
                ],
                "vars": { "SECRET": { "encoding": "private:sha256", "value": "abcd" } }
            }
        }));
        let findings = check_containers(&manifest);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "private");
        assert!(findings[0].message.contains("private section is absent"));
    }

    #[test]
    fn commitment_without_private_entry_is_reported_per_reference() {
        let manifest = manifest_from(json!({
            "manifest": {
                "name": "app", "version": "1.0.0", "machine": "small",
                "containers": [container("app", json!({ "K": "$SECRET" }))],
                "vars": { "SECRET": { "encoding": "private:sha256", "value": "abcd" } }
            },
            "private": {}
        }));
        let findings = check_containers(&manifest);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "manifest.containers[0].environment.K");
        assert!(findings[0].message.contains("no counterpart"));
    }
}
