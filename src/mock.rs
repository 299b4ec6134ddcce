//! Mock digest resolver
//!
//! In-process [`DigestResolver`](crate::image::DigestResolver) for tests:
//! digests can be pinned per image, otherwise a deterministic digest is
//! derived from the reference itself, and failures can be injected to
//! exercise the generator's abort path.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::image::{is_digest_pinned, DigestResolver, ImageRef, ResolveImageError};

/// Configurable mock resolver for testing.
#[derive(Debug, Default)]
pub struct MockResolver {
    digests: HashMap<String, String>,
    fail: bool,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the digest returned for a specific image reference.
    pub fn with_digest(mut self, image: impl Into<String>, digest: impl Into<String>) -> Self {
        self.digests.insert(image.into(), digest.into());
        self
    }

    /// Make every unpinned resolution fail.
    pub fn failing() -> Self {
        Self {
            digests: HashMap::new(),
            fail: true,
        }
    }

    fn derived_digest(image: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(image.as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

impl DigestResolver for MockResolver {
    fn resolve(&self, image: &str) -> Result<String, ResolveImageError> {
        if is_digest_pinned(image) {
            return Ok(image.to_string());
        }
        if self.fail {
            return Err(ResolveImageError::Digest {
                image: image.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let digest = self
            .digests
            .get(image)
            .cloned()
            .unwrap_or_else(|| Self::derived_digest(image));
        Ok(ImageRef::parse(image)?.pinned(&digest))
    }
}
