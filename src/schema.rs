//! Structural schema validation
//!
//! Wraps the Draft-07 JSON Schema documents embedded under `schemas/` and
//! reports every violation as a finding with a dotted instance path. This is
//! the opaque structural contract: a document list is either empty (valid) or
//! enumerates the violated paths.

use jsonschema::{Draft, Validator};
use serde_json::Value;

use crate::validate::Finding;

static CODIUS_SPEC: &str = include_str!("../schemas/codius-spec.json");
static CODIUS_VARS_SPEC: &str = include_str!("../schemas/codius-vars-spec.json");
static GENERATED_MANIFEST_SPEC: &str = include_str!("../schemas/generated-manifest-spec.json");

/// Validate an authored `codius.json` document.
pub fn validate_authored_manifest(document: &Value) -> Vec<Finding> {
    check(CODIUS_SPEC, document)
}

/// Validate a `codiusvars.json` variables document.
pub fn validate_vars_document(document: &Value) -> Vec<Finding> {
    check(CODIUS_VARS_SPEC, document)
}

/// Validate a generated manifest document.
pub fn validate_generated_manifest(document: &Value) -> Vec<Finding> {
    check(GENERATED_MANIFEST_SPEC, document)
}

fn check(schema_json: &'static str, instance: &Value) -> Vec<Finding> {
    let schema: Value = match serde_json::from_str(schema_json) {
        Ok(schema) => schema,
        Err(err) => {
            return vec![Finding::new("$", format!("embedded schema is not valid JSON: {err}"))]
        }
    };
    let validator = match compile_validator(&schema) {
        Ok(validator) => validator,
        Err(err) => return vec![Finding::new("$", format!("invalid embedded schema: {err}"))],
    };

    validator
        .iter_errors(instance)
        .map(|err| {
            Finding::new(
                pointer_to_path(&err.instance_path().to_string()),
                format!("schema violation: {err}"),
            )
        })
        .collect()
}

fn compile_validator(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(schema)
        .map_err(|err| err.to_string())
}

/// Convert a JSON-pointer instance path (`/manifest/containers/0/id`) to the
/// dotted addressing used by every checker (`manifest.containers[0].id`).
fn pointer_to_path(pointer: &str) -> String {
    if pointer.is_empty() {
        return "$".to_string();
    }
    let mut path = String::new();
    for segment in pointer.split('/').skip(1) {
        if segment.chars().all(|c| c.is_ascii_digit()) {
            path.push_str(&format!("[{segment}]"));
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);
        }
    }
    path
}
