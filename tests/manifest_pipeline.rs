//! End-to-end manifest pipeline tests
//!
//! Exercise the full generate -> validate -> resolve flow and the validator's
//! behavior against targeted corruptions of a generated manifest.

use codius_manifest::mock::MockResolver;
use codius_manifest::validate::validate_manifest;
use codius_manifest::{
    generate_manifest, generate_manifest_from_files, generate_simple_manifest, Manifest, VarSpec,
};
use serde_json::json;

fn authored_manifest() -> serde_json::Value {
    json!({
        "manifest": {
            "name": "shopping-list",
            "version": "1.0.0",
            "machine": "small",
            "containers": [{
                "id": "app",
                "image": "codius/shopping-list:latest",
                "command": ["npm", "start"],
                "workdir": "/app",
                "environment": {
                    "AWS_ACCESS_KEY": "$AWS_ACCESS_KEY",
                    "AWS_SECRET_KEY": "$AWS_SECRET_KEY",
                    "NODE_ENV": "production"
                }
            }],
            "vars": {
                "AWS_ACCESS_KEY": {
                    "value": "overridden-below",
                    "description": "An AWS access key"
                }
            }
        }
    })
}

fn vars_document() -> serde_json::Value {
    json!({
        "vars": {
            "public": {
                "AWS_ACCESS_KEY": { "value": "AKRANDOM123" }
            },
            "private": {
                "AWS_SECRET_KEY": "s3cret-value"
            }
        }
    })
}

fn generate() -> Manifest {
    generate_manifest(&vars_document(), &authored_manifest(), &MockResolver::new())
        .expect("generation should succeed")
}

// =============================================================================
// Round trip: generate -> validate -> resolve
// =============================================================================

#[test]
fn test_generated_manifest_validates_cleanly() {
    let manifest = generate();
    assert!(validate_manifest(&manifest).is_empty());
}

#[test]
fn test_round_trip_through_serialized_form() {
    let manifest = generate();
    let json = manifest.to_json().unwrap();
    let reparsed = Manifest::from_json(&json).unwrap();
    assert_eq!(reparsed, manifest);
    assert!(validate_manifest(&reparsed).is_empty());
}

#[test]
fn test_resolution_reveals_public_and_private_values() {
    let manifest = generate();
    let simple = generate_simple_manifest(&manifest).expect("resolution should succeed");

    let env = simple.manifest.containers[0]
        .environment
        .as_ref()
        .expect("resolved container should keep its environment");
    assert_eq!(env["AWS_ACCESS_KEY"], "AKRANDOM123");
    assert_eq!(env["AWS_SECRET_KEY"], "s3cret-value");
    assert_eq!(env["NODE_ENV"], "production");

    let value = serde_json::to_value(&simple).unwrap();
    assert!(value["manifest"].get("vars").is_none());
    assert!(value.get("private").is_none());
}

#[test]
fn test_generation_from_fixture_files() {
    let resolver = MockResolver::new();
    let manifest = generate_manifest_from_files(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/codiusvars.json"),
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/codius.json"),
        &resolver,
    )
    .expect("fixture inputs should generate");

    assert!(validate_manifest(&manifest).is_empty());
    assert!(manifest.manifest.containers[0].image.contains("@sha256:"));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("generated.json");
    manifest.write_to_file(&out).unwrap();
    assert_eq!(Manifest::from_file(&out).unwrap(), manifest);
}

// =============================================================================
// Targeted corruptions of a generated manifest
// =============================================================================

#[test]
fn test_tampered_private_value_yields_one_mismatch_finding() {
    let mut manifest = generate();
    manifest
        .private
        .as_mut()
        .unwrap()
        .vars
        .get_mut("AWS_SECRET_KEY")
        .unwrap()
        .value = json!("tampered");

    let findings = validate_manifest(&manifest);
    assert_eq!(findings.len(), 1, "findings: {findings:?}");
    assert_eq!(findings[0].path, "manifest.vars.AWS_SECRET_KEY");
    assert!(findings[0].message.contains("does not match"));
}

#[test]
fn test_removed_private_entry_yields_one_finding() {
    let mut manifest = generate();
    manifest
        .private
        .as_mut()
        .unwrap()
        .vars
        .remove("AWS_SECRET_KEY");

    let findings = validate_manifest(&manifest);
    assert_eq!(findings.len(), 1, "findings: {findings:?}");
    assert!(findings[0]
        .message
        .contains("no counterpart in private.vars"));
}

#[test]
fn test_removed_private_section_is_reported_once() {
    let mut manifest = generate();
    manifest.private = None;

    let findings = validate_manifest(&manifest);
    assert_eq!(findings.len(), 1, "findings: {findings:?}");
    assert_eq!(findings[0].path, "private");
    assert!(findings[0].message.contains("private section is absent"));
}

#[test]
fn test_reserved_env_prefix_is_flagged_at_exact_path() {
    let mut manifest = generate();
    manifest.manifest.containers[0]
        .environment
        .as_mut()
        .unwrap()
        .insert("CODIUS_HOST".to_string(), "anything".to_string());

    let findings = validate_manifest(&manifest);
    assert_eq!(findings.len(), 1, "findings: {findings:?}");
    assert_eq!(
        findings[0].path,
        "manifest.containers[0].environment.CODIUS_HOST"
    );
}

#[test]
fn test_undeclared_reference_and_unused_var_are_both_reported() {
    let mut manifest = generate();
    let env = manifest.manifest.containers[0].environment.as_mut().unwrap();
    env.insert("DB_URL".to_string(), "$DB_URL".to_string());
    env.remove("AWS_ACCESS_KEY");

    let findings = validate_manifest(&manifest);
    assert!(findings
        .iter()
        .any(|f| f.message.contains("not declared in manifest.vars")));
    assert!(findings
        .iter()
        .any(|f| f.path == "manifest.vars.AWS_ACCESS_KEY"
            && f.message.contains("never referenced")));
}

#[test]
fn test_duplicate_container_ids_reported_once_at_list_level() {
    let mut manifest = generate();
    let dup = manifest.manifest.containers[0].clone();
    manifest.manifest.containers.push(dup);

    let findings = validate_manifest(&manifest);
    assert_eq!(
        findings
            .iter()
            .filter(|f| f.path == "manifest.containers")
            .count(),
        1,
        "findings: {findings:?}"
    );
}

#[test]
fn test_stale_commitment_blocks_resolution() {
    let mut manifest = generate();
    manifest.manifest.vars.as_mut().unwrap().insert(
        "AWS_SECRET_KEY".to_string(),
        VarSpec::commitment("0".repeat(64)),
    );

    assert!(generate_simple_manifest(&manifest).is_err());
}
