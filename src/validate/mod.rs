//! Manifest validator
//!
//! Composes the structural schema check with three semantic checkers:
//! container/environment referential integrity, public-variable usage, and
//! private-variable commitment consistency. Schema violations short-circuit
//! the semantic stages; the semantic checkers accumulate every finding rather
//! than stopping at the first.

mod containers;
mod private_vars;
mod public_vars;

pub use containers::check_containers;
pub use private_vars::check_private_vars;
pub use public_vars::check_public_vars;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::manifest::Manifest;
use crate::schema;

/// A single validation finding: a stable hierarchical path into the document
/// plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub path: String,
    pub message: String,
}

impl Finding {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Render findings one per line, for error displays and CLI output.
pub fn format_findings(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Centralized path construction so every checker addresses the document the
/// same way. Tests assert on exact path strings.
pub(crate) mod paths {
    pub const CONTAINERS: &str = "manifest.containers";
    pub const PRIVATE: &str = "private";

    pub fn manifest_var(name: &str) -> String {
        format!("manifest.vars.{name}")
    }

    pub fn private_var(name: &str) -> String {
        format!("private.vars.{name}")
    }

    pub fn container_env(index: usize, name: &str) -> String {
        format!("manifest.containers[{index}].environment.{name}")
    }
}

/// Validate a candidate generated-manifest document.
///
/// Stage 1 is the structural schema check; on any violation only those
/// findings are returned, since the semantic stages are meaningless against a
/// malformed document. Otherwise the findings of all three semantic checkers
/// are merged.
pub fn validate_document(document: &Value) -> Vec<Finding> {
    debug!("validating generated manifest");
    let schema_findings = schema::validate_generated_manifest(document);
    if !schema_findings.is_empty() {
        debug!(count = schema_findings.len(), "schema check failed");
        return schema_findings;
    }

    let manifest: Manifest = match serde_json::from_value(document.clone()) {
        Ok(manifest) => manifest,
        Err(err) => {
            // Schema passed but the typed model disagrees; report rather
            // than guess at semantic findings.
            return vec![Finding::new("$", format!("malformed manifest document: {err}"))];
        }
    };

    validate_manifest(&manifest)
}

/// Run the semantic checkers over an already-parsed manifest.
pub fn validate_manifest(manifest: &Manifest) -> Vec<Finding> {
    let mut findings = check_containers(manifest);
    findings.extend(check_public_vars(manifest));
    findings.extend(check_private_vars(manifest));
    debug!(count = findings.len(), "semantic checks complete");
    findings
}

/// Serialize a typed manifest and validate it end to end, schema included.
/// Used by the generator to prove its own output before returning it.
pub fn validate_generated(manifest: &Manifest) -> Vec<Finding> {
    match serde_json::to_value(manifest) {
        Ok(document) => validate_document(&document),
        Err(err) => vec![Finding::new("$", format!("manifest is not serializable: {err}"))],
    }
}
