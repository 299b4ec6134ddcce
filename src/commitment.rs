//! Commitment engine
//!
//! Deterministic hashing of private variable entries into reproducible
//! digests, and nonce generation for diversifying them. Digests are computed
//! over RFC 8785 JSON Canonicalization Scheme (JCS) bytes so that identical
//! logical documents always hash identically regardless of key order.
//!
//! Encoding contract: nonces and digests are lowercase hex, held fixed across
//! generation and validation.

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::manifest::{Manifest, PrivateVarSpec};

/// Nonce length in bytes (128 bits of entropy).
pub const NONCE_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum CommitmentError {
    #[error("JCS canonicalization error: {0}")]
    Canonicalize(String),
}

/// Generate a fresh random nonce, hex-encoded.
///
/// Every call draws new entropy; two generations of the same secret value
/// therefore commit to different digests.
pub fn generate_nonce() -> String {
    let mut buf = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

fn sha256_jcs<T: serde::Serialize>(value: &T) -> Result<[u8; 32], CommitmentError> {
    let jcs_bytes = serde_json_canonicalizer::to_vec(value)
        .map_err(|e| CommitmentError::Canonicalize(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    Ok(hasher.finalize().into())
}

/// Compute the commitment digest for a single private variable entry.
///
/// The digest covers the whole entry (value and nonce) in canonical form;
/// it is what the generator publishes under `manifest.vars` and what the
/// validator recomputes for comparison.
pub fn hash_private_var(spec: &PrivateVarSpec) -> Result<String, CommitmentError> {
    Ok(hex::encode(sha256_jcs(spec)?))
}

/// Compute commitment digests for every entry of a private-vars map.
pub fn hash_private_vars(
    vars: &BTreeMap<String, PrivateVarSpec>,
) -> Result<BTreeMap<String, String>, CommitmentError> {
    let mut digests = BTreeMap::new();
    for (name, spec) in vars {
        digests.insert(name.clone(), hash_private_var(spec)?);
    }
    Ok(digests)
}

/// Content identifier for a whole manifest document: SHA-256 hex over its
/// canonical JSON form. Not used by generation or validation logic; exposed
/// for downstream deduplication and addressing.
pub fn hash_manifest(manifest: &Manifest) -> Result<String, CommitmentError> {
    Ok(hex::encode(sha256_jcs(manifest)?))
}
