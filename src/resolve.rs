//! Environment resolver
//!
//! Projects a generated manifest into the runtime form handed to the
//! container host: every `$name` binding replaced by its concrete value,
//! commitments substituted with the revealed private values, and the
//! variable-declaration machinery dropped entirely.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::manifest::{Binding, Container, Manifest, VarSpec};
use crate::validate::{self, format_findings, Finding};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("manifest failed validation:\n{}", format_findings(.0))]
    InvalidManifest(Vec<Finding>),

    #[error("binding references undeclared variable {0}")]
    UndeclaredVariable(String),

    #[error("commitment for {0} has no private value to substitute")]
    MissingPrivateValue(String),
}

/// The runtime projection of a manifest: containers with fully-resolved
/// environments and no variable sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleManifest {
    pub manifest: SimpleSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleSpec {
    pub name: String,
    pub version: String,
    pub machine: String,
    pub containers: Vec<Container>,
}

impl SimpleManifest {
    /// Serialize to JSON (pretty printed)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}

/// Resolve a generated manifest into its runtime form.
///
/// The manifest is fully validated first; a manifest with findings is never
/// resolved, so the remaining lookups cannot fail on well-formed input. The
/// fallible variants remain to keep this function total on arbitrary typed
/// values.
pub fn generate_simple_manifest(manifest: &Manifest) -> Result<SimpleManifest, ResolveError> {
    let findings = validate::validate_generated(manifest);
    if !findings.is_empty() {
        return Err(ResolveError::InvalidManifest(findings));
    }

    let mut containers = Vec::with_capacity(manifest.manifest.containers.len());
    for container in &manifest.manifest.containers {
        let environment = match &container.environment {
            Some(env) => {
                let mut resolved = std::collections::BTreeMap::new();
                for (name, raw) in env {
                    resolved.insert(name.clone(), resolve_binding(manifest, raw)?);
                }
                Some(resolved)
            }
            None => None,
        };
        containers.push(Container {
            environment,
            ..container.clone()
        });
    }

    debug!(
        containers = containers.len(),
        "resolved manifest to runtime form"
    );
    Ok(SimpleManifest {
        manifest: SimpleSpec {
            name: manifest.manifest.name.clone(),
            version: manifest.manifest.version.clone(),
            machine: manifest.manifest.machine.clone(),
            containers,
        },
    })
}

fn resolve_binding(manifest: &Manifest, raw: &str) -> Result<String, ResolveError> {
    let target = match Binding::parse(raw) {
        Binding::Literal(value) => return Ok(value.to_string()),
        Binding::Reference(name) => name,
    };

    let spec = manifest
        .manifest
        .var(target)
        .ok_or_else(|| ResolveError::UndeclaredVariable(target.to_string()))?;

    match spec {
        VarSpec::Literal { value } => Ok(value.clone()),
        VarSpec::Commitment { .. } => {
            let private = manifest
                .private_var(target)
                .ok_or_else(|| ResolveError::MissingPrivateValue(target.to_string()))?;
            Ok(match &private.value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        }
    }
}
