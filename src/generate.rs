//! Manifest generator
//!
//! Merges a `codiusvars.json` variables document into an authored
//! `codius.json` manifest and produces the generated, self-verifying
//! artifact: public values merged last-writer-wins, private values nonced and
//! committed, authoring metadata stripped, empty structures normalized,
//! images digest-pinned, and the result proven valid before it is returned.
//! The generator fails fast; it never emits a document it cannot validate.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::commitment::{self, CommitmentError};
use crate::image::{is_digest_pinned, DigestResolver, ResolveImageError};
use crate::manifest::authored::{AuthoredManifest, VarsDocument};
use crate::manifest::{Manifest, ManifestSpec, PrivateSection, PrivateVarSpec, VarSpec};
use crate::schema;
use crate::validate::{self, format_findings, Finding};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to read input document: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse input document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("input schema validation failed:\n{}", format_input_findings(.manifest, .vars))]
    InputSchema {
        manifest: Vec<Finding>,
        vars: Vec<Finding>,
    },

    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    #[error("image digest resolution failed: {0}")]
    ImageResolution(#[from] ResolveImageError),

    #[error("generated manifest is invalid:\n{}", format_findings(.0))]
    Validation(Vec<Finding>),
}

fn format_input_findings(manifest: &[Finding], vars: &[Finding]) -> String {
    let mut all: Vec<Finding> = Vec::with_capacity(manifest.len() + vars.len());
    all.extend_from_slice(manifest);
    all.extend_from_slice(vars);
    format_findings(&all)
}

/// Generate a manifest from raw input documents.
///
/// Both documents are schema-checked up front; any violation aborts with the
/// aggregated finding list and no partial output. Digest resolution failures
/// and post-generation validation failures abort likewise.
pub fn generate_manifest(
    vars_document: &Value,
    manifest_document: &Value,
    resolver: &dyn DigestResolver,
) -> Result<Manifest, GenerateError> {
    debug!("validating input documents against their schemas");
    let manifest_findings = schema::validate_authored_manifest(manifest_document);
    let vars_findings = schema::validate_vars_document(vars_document);
    if !manifest_findings.is_empty() || !vars_findings.is_empty() {
        return Err(GenerateError::InputSchema {
            manifest: manifest_findings,
            vars: vars_findings,
        });
    }

    let authored: AuthoredManifest = serde_json::from_value(manifest_document.clone())?;
    let vars_document: VarsDocument = serde_json::from_value(vars_document.clone())?;

    debug!("merging public vars");
    let mut vars: BTreeMap<String, VarSpec> = authored
        .manifest
        .vars
        .map(|authored_vars| {
            authored_vars
                .into_iter()
                .map(|(name, spec)| (name, spec.into_var_spec()))
                .collect()
        })
        .unwrap_or_default();
    if let Some(public) = vars_document.vars.public {
        // Last writer wins: an authored placeholder is replaced by the
        // environment-specific value without editing the manifest file.
        for (name, spec) in public {
            vars.insert(name, spec.into_var_spec());
        }
    }

    debug!("merging private vars");
    let mut private = match vars_document.vars.private {
        Some(raw_values) => {
            let private_vars: BTreeMap<String, PrivateVarSpec> = raw_values
                .into_iter()
                .map(|(name, value)| {
                    (
                        name,
                        PrivateVarSpec {
                            value,
                            nonce: commitment::generate_nonce(),
                        },
                    )
                })
                .collect();
            // The generator is the sole source of truth for commitments: any
            // pre-existing entry at the same key is overwritten.
            for (name, digest) in commitment::hash_private_vars(&private_vars)? {
                vars.insert(name, VarSpec::commitment(digest));
            }
            Some(PrivateSection { vars: private_vars })
        }
        None => None,
    };

    let mut containers = authored.manifest.containers;
    for container in &mut containers {
        if container
            .environment
            .as_ref()
            .is_some_and(BTreeMap::is_empty)
        {
            container.environment = None;
        }
    }

    let vars = if vars.is_empty() { None } else { Some(vars) };
    // Downstream deployment systems reject a manifest that declares public
    // vars without any private section, so one is emitted proactively.
    if private.is_none() && vars.is_some() {
        private = Some(PrivateSection::default());
    }

    let mut generated = Manifest {
        manifest: ManifestSpec {
            name: authored.manifest.name,
            version: authored.manifest.version,
            machine: authored.manifest.machine,
            containers,
            vars,
        },
        private,
    };

    debug!("resolving container image digests");
    for container in &mut generated.manifest.containers {
        if !is_digest_pinned(&container.image) {
            container.image = resolver.resolve(&container.image)?;
        }
    }

    debug!("validating generated manifest");
    let findings = validate::validate_generated(&generated);
    if !findings.is_empty() {
        return Err(GenerateError::Validation(findings));
    }

    Ok(generated)
}

/// Generate a manifest from files on disk.
pub fn generate_manifest_from_files(
    vars_path: impl AsRef<Path>,
    manifest_path: impl AsRef<Path>,
    resolver: &dyn DigestResolver,
) -> Result<Manifest, GenerateError> {
    let vars_document: Value = serde_json::from_str(&fs::read_to_string(vars_path)?)?;
    let manifest_document: Value = serde_json::from_str(&fs::read_to_string(manifest_path)?)?;
    generate_manifest(&vars_document, &manifest_document, resolver)
}
