//! Generated-manifest data model
//!
//! Types for the operational artifact produced by the generator: the
//! `manifest` section with its containers and public variable declarations,
//! and the optional `private` section holding revealed secret values.
//! Authoring-time documents live in [`authored`].

pub mod authored;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Environment-variable names starting with this prefix are reserved for the
/// host and may not appear in container environments.
pub const RESERVED_ENV_PREFIX: &str = "CODIUS";

/// Discriminator value marking a public variable as a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentEncoding {
    #[serde(rename = "private:sha256")]
    PrivateSha256,
}

/// A public variable declaration in `manifest.vars`.
///
/// Either a literal value visible as authored, or a SHA-256 commitment to a
/// private value that never appears here in plaintext. The two forms are
/// distinguished on the wire by the presence of the `encoding` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarSpec {
    Commitment {
        encoding: CommitmentEncoding,
        value: String,
    },
    Literal {
        value: String,
    },
}

impl VarSpec {
    pub fn literal(value: impl Into<String>) -> Self {
        VarSpec::Literal {
            value: value.into(),
        }
    }

    pub fn commitment(digest: impl Into<String>) -> Self {
        VarSpec::Commitment {
            encoding: CommitmentEncoding::PrivateSha256,
            value: digest.into(),
        }
    }

    pub fn is_commitment(&self) -> bool {
        matches!(self, VarSpec::Commitment { .. })
    }

    /// The literal value or the commitment digest, depending on the variant.
    pub fn value(&self) -> &str {
        match self {
            VarSpec::Commitment { value, .. } | VarSpec::Literal { value } => value,
        }
    }
}

/// A private variable entry: the secret value plus the per-generation nonce
/// mixed into its commitment digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateVarSpec {
    pub value: serde_json::Value,
    pub nonce: String,
}

/// The `private` section of a generated manifest.
///
/// Presence with an empty `vars` map is a distinct state from absence of the
/// section: absent means no private-variable machinery was declared at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateSection {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, PrivateVarSpec>,
}

/// A container declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Unique within the containers list.
    pub id: String,

    /// Image reference, digest-pinned after generation.
    pub image: String,

    pub command: Vec<String>,

    pub workdir: String,

    /// Environment-variable name to binding expression. Absent and empty are
    /// equivalent on output; the generator collapses empty to absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
}

impl Container {
    /// Iterate environment entries, treating an absent map as empty.
    pub fn environment_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.environment
            .iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The public `manifest` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSpec {
    pub name: String,
    pub version: String,
    /// Machine sizing class (for example `"small"`).
    pub machine: String,
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<BTreeMap<String, VarSpec>>,
}

impl ManifestSpec {
    /// Look up a public variable declaration by name.
    pub fn var(&self, name: &str) -> Option<&VarSpec> {
        self.vars.as_ref().and_then(|vars| vars.get(name))
    }
}

/// A generated manifest document (`manifest` + optional `private`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest: ManifestSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<PrivateSection>,
}

impl Manifest {
    /// Serialize to JSON (pretty printed)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }

    /// Load from file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }

    /// Look up a private variable entry by name.
    pub fn private_var(&self, name: &str) -> Option<&PrivateVarSpec> {
        self.private.as_ref().and_then(|p| p.vars.get(name))
    }
}

/// A container environment binding expression.
///
/// Either a literal string passed through to the runtime as-is, or a `$name`
/// reference resolved against `manifest.vars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    Literal(&'a str),
    Reference(&'a str),
}

impl<'a> Binding<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.strip_prefix('$') {
            Some(name) => Binding::Reference(name),
            None => Binding::Literal(raw),
        }
    }

    /// The referenced variable name, if this is a reference-form binding.
    pub fn reference_target(self) -> Option<&'a str> {
        match self {
            Binding::Reference(name) => Some(name),
            Binding::Literal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_manifest() -> Manifest {
        Manifest {
            manifest: ManifestSpec {
                name: "test-app".to_string(),
                version: "1.0.0".to_string(),
                machine: "small".to_string(),
                containers: vec![Container {
                    id: "app".to_string(),
                    image: "hello-world@sha256:1234".to_string(),
                    command: vec!["/bin/sh".to_string()],
                    workdir: "/root".to_string(),
                    environment: Some(BTreeMap::from([(
                        "AWS_ACCESS_KEY".to_string(),
                        "$AWS_ACCESS_KEY".to_string(),
                    )])),
                }],
                vars: Some(BTreeMap::from([(
                    "AWS_ACCESS_KEY".to_string(),
                    VarSpec::literal("AKRANDOM"),
                )])),
            },
            private: Some(PrivateSection::default()),
        }
    }

    #[test]
    fn var_spec_literal_roundtrip() {
        let spec = VarSpec::literal("hello");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json, json!({ "value": "hello" }));
        let parsed: VarSpec = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn var_spec_commitment_roundtrip() {
        let spec = VarSpec::commitment("abc123");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            json!({ "encoding": "private:sha256", "value": "abc123" })
        );
        let parsed: VarSpec = serde_json::from_value(json).unwrap();
        assert!(parsed.is_commitment());
        assert_eq!(parsed.value(), "abc123");
    }

    #[test]
    fn var_spec_rejects_unknown_encoding() {
        let result: Result<VarSpec, _> =
            serde_json::from_value(json!({ "encoding": "private:md5", "value": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_private_section_serializes_as_empty_object() {
        let manifest = sample_manifest();
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["private"], json!({}));
    }

    #[test]
    fn absent_private_section_is_distinct_from_empty() {
        let mut manifest = sample_manifest();
        manifest.private = None;
        let value = serde_json::to_value(&manifest).unwrap();
        assert!(value.get("private").is_none());

        let parsed: Manifest = serde_json::from_value(json!({
            "manifest": value["manifest"],
            "private": {}
        }))
        .unwrap();
        assert!(parsed.private.is_some());
        assert!(parsed.private.unwrap().vars.is_empty());
    }

    #[test]
    fn binding_parse_distinguishes_forms() {
        assert_eq!(Binding::parse("$AWS_KEY"), Binding::Reference("AWS_KEY"));
        assert_eq!(Binding::parse("plain"), Binding::Literal("plain"));
        assert_eq!(Binding::parse("$AWS_KEY").reference_target(), Some("AWS_KEY"));
        assert_eq!(Binding::parse("plain").reference_target(), None);
    }

    #[test]
    fn manifest_json_roundtrip() {
        let manifest = sample_manifest();
        let json = manifest.to_json().unwrap();
        let parsed = Manifest::from_json(&json).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn environment_entries_treats_absent_as_empty() {
        let mut manifest = sample_manifest();
        manifest.manifest.containers[0].environment = None;
        assert_eq!(
            manifest.manifest.containers[0].environment_entries().count(),
            0
        );
    }
}
