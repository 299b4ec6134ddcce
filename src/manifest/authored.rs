//! Authoring-time documents
//!
//! The looser pre-generation shapes: the authored `codius.json` manifest
//! (variable declarations may carry a `description`, commitments may be stale
//! placeholders) and the `codiusvars.json` variables document. Keeping these
//! as distinct types from the generated [`Manifest`](super::Manifest) removes
//! the "is this field present yet" class of bugs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CommitmentEncoding, Container, VarSpec};

/// A public variable declaration as authored: `description` is allowed and a
/// pre-existing `encoding` is tolerated (the generator overwrites it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredVarSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<CommitmentEncoding>,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AuthoredVarSpec {
    /// Convert to the operational form, stripping authoring metadata.
    pub fn into_var_spec(self) -> VarSpec {
        match self.encoding {
            Some(CommitmentEncoding::PrivateSha256) => VarSpec::commitment(self.value),
            None => VarSpec::literal(self.value),
        }
    }
}

/// The `manifest` section of an authored `codius.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredManifestSpec {
    pub name: String,
    pub version: String,
    pub machine: String,
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<BTreeMap<String, AuthoredVarSpec>>,
}

/// An authored `codius.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredManifest {
    pub manifest: AuthoredManifestSpec,
}

/// The `vars` section of a `codiusvars.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<BTreeMap<String, AuthoredVarSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<BTreeMap<String, serde_json::Value>>,
}

/// A `codiusvars.json` document: environment-specific values merged into the
/// authored manifest at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarsDocument {
    pub vars: VarsSection,
}
