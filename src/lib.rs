//! Codius Manifest - Container deployment manifest tooling
//!
//! This crate implements the Codius manifest pipeline: generating a
//! self-verifying deployment manifest from authored inputs, validating that
//! its public variable commitments and container bindings are consistent, and
//! resolving it into the runtime form handed to the container host.

pub mod commitment;
pub mod generate;
pub mod image;
pub mod manifest;
pub mod mock;
pub mod resolve;
pub mod schema;
pub mod validate;

pub use commitment::{generate_nonce, hash_manifest, hash_private_var, hash_private_vars};
pub use generate::{generate_manifest, generate_manifest_from_files, GenerateError};
pub use image::{DigestResolver, RegistryResolver, ResolveImageError};
pub use manifest::{Manifest, ManifestSpec, PrivateSection, PrivateVarSpec, VarSpec};
pub use resolve::{generate_simple_manifest, ResolveError, SimpleManifest};
pub use validate::{validate_document, validate_manifest, Finding};
