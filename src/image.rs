//! Container image references and digest resolution
//!
//! Pinning an image means replacing a mutable tag reference with the
//! content-addressed `repository@sha256:<digest>` form. Resolution is behind
//! the [`DigestResolver`] trait; [`RegistryResolver`] implements the Docker
//! Registry v2 token flow over HTTP. References already in pinned form are
//! returned unchanged without any network traffic.

use regex_lite::Regex;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_REGISTRY: &str = "registry-1.docker.io";
const DEFAULT_NAMESPACE: &str = "library";
const DEFAULT_TAG: &str = "latest";
const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json";

#[derive(Debug, Error)]
pub enum ResolveImageError {
    #[error("invalid image reference: {0}")]
    InvalidReference(String),

    #[error("failed to get authentication info from registry: {0}")]
    Auth(String),

    #[error("failed to fetch digest for image {image}: {reason}")]
    Digest { image: String, reason: String },

    #[error("registry request failed: {0}")]
    Http(String),
}

/// True when the reference is already digest-pinned
/// (`repository@sha256:<64 hex>`).
pub fn is_digest_pinned(image: &str) -> bool {
    // The pattern is fixed; a compile failure would be a programming error
    // caught by the unit tests below.
    Regex::new(r"^.+@sha256:[A-Fa-f0-9]{64}$")
        .map(|re| re.is_match(image))
        .unwrap_or(false)
}

/// A parsed image reference: `[registry/][namespace/]repository[:tag]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: Option<String>,
    pub namespace: Option<String>,
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn parse(image: &str) -> Result<Self, ResolveImageError> {
        if image.is_empty() {
            return Err(ResolveImageError::InvalidReference(image.to_string()));
        }

        let mut segments: Vec<&str> = image.split('/').collect();
        let registry = if segments.len() > 1
            && (segments[0].contains('.') || segments[0].contains(':') || segments[0] == "localhost")
        {
            Some(segments.remove(0).to_string())
        } else {
            None
        };

        let last = segments
            .pop()
            .ok_or_else(|| ResolveImageError::InvalidReference(image.to_string()))?;
        let (repository, tag) = match last.rsplit_once(':') {
            Some((repo, tag)) if !repo.is_empty() && !tag.is_empty() => (repo, tag),
            None => (last, DEFAULT_TAG),
            Some(_) => return Err(ResolveImageError::InvalidReference(image.to_string())),
        };

        let namespace = if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        };

        Ok(Self {
            registry,
            namespace,
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    fn registry_host(&self) -> &str {
        self.registry.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    fn scoped_name(&self) -> String {
        format!(
            "{}/{}",
            self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE),
            self.repository
        )
    }

    /// The pinned form of this reference for a given digest, preserving the
    /// registry and namespace exactly as authored.
    pub fn pinned(&self, digest: &str) -> String {
        let mut out = String::new();
        if let Some(registry) = &self.registry {
            out.push_str(registry);
            out.push('/');
        }
        if let Some(namespace) = &self.namespace {
            out.push_str(namespace);
            out.push('/');
        }
        out.push_str(&self.repository);
        out.push('@');
        out.push_str(digest);
        out
    }
}

/// Resolution of a mutable image reference to its immutable digest form.
///
/// A single attempt: network and auth errors propagate to the caller, which
/// aborts the enclosing operation rather than retrying.
pub trait DigestResolver {
    fn resolve(&self, image: &str) -> Result<String, ResolveImageError>;
}

/// Docker Registry v2 client: discovers the bearer realm via the 401
/// challenge, fetches a pull-scope token, and reads the
/// `Docker-Content-Digest` header from the manifest endpoint.
pub struct RegistryResolver {
    agent: ureq::Agent,
}

impl Default for RegistryResolver {
    fn default() -> Self {
        Self::new()
    }
}

struct AuthChallenge {
    realm: String,
    service: String,
}

impl RegistryResolver {
    pub fn new() -> Self {
        // 401 responses carry the auth challenge headers we need, so status
        // codes must not surface as transport errors.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(30)))
            .build()
            .into();
        Self { agent }
    }

    fn fetch_challenge(&self, image: &ImageRef) -> Result<AuthChallenge, ResolveImageError> {
        let url = format!("https://{}/v2/", image.registry_host());
        debug!(%url, "fetching auth requirements from registry");
        let resp = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ResolveImageError::Http(e.to_string()))?;

        let header = resp
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ResolveImageError::Auth("registry sent no Www-Authenticate challenge".to_string())
            })?;

        let re = Regex::new(r#"(?i)Bearer realm="([^"]+)",service="([^"]+)""#)
            .map_err(|e| ResolveImageError::Auth(e.to_string()))?;
        let captures = re.captures(header).ok_or_else(|| {
            ResolveImageError::Auth(format!("unrecognized auth challenge: {header}"))
        })?;
        Ok(AuthChallenge {
            realm: captures[1].to_string(),
            service: captures[2].to_string(),
        })
    }

    fn fetch_token(
        &self,
        image: &ImageRef,
        challenge: &AuthChallenge,
    ) -> Result<String, ResolveImageError> {
        let url = format!(
            "{}?service={}&scope=repository:{}:pull",
            challenge.realm,
            challenge.service,
            image.scoped_name()
        );
        debug!(realm = %challenge.realm, "fetching auth token");
        let resp = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ResolveImageError::Http(e.to_string()))?;
        if resp.status().as_u16() >= 400 {
            return Err(ResolveImageError::Auth(format!(
                "token endpoint returned HTTP {}",
                resp.status()
            )));
        }

        let body = read_body(resp)?;
        let token_doc: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| ResolveImageError::Auth(format!("malformed token response: {e}")))?;
        token_doc
            .get("token")
            .and_then(|t| t.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| {
                ResolveImageError::Auth("token response contained no token".to_string())
            })
    }

    fn fetch_digest(
        &self,
        image: &ImageRef,
        raw: &str,
        token: &str,
    ) -> Result<String, ResolveImageError> {
        let url = format!(
            "https://{}/v2/{}/manifests/{}",
            image.registry_host(),
            image.scoped_name(),
            image.tag
        );
        debug!(%url, "fetching manifest digest");
        let resp = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {token}"))
            .header("Accept", MANIFEST_ACCEPT)
            .call()
            .map_err(|e| ResolveImageError::Http(e.to_string()))?;
        if resp.status().as_u16() >= 400 {
            return Err(ResolveImageError::Digest {
                image: raw.to_string(),
                reason: format!("registry returned HTTP {}", resp.status()),
            });
        }

        resp.headers()
            .get("docker-content-digest")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| ResolveImageError::Digest {
                image: raw.to_string(),
                reason: "response carried no Docker-Content-Digest header".to_string(),
            })
    }
}

fn read_body(resp: ureq::http::Response<ureq::Body>) -> Result<Vec<u8>, ResolveImageError> {
    let mut reader = resp.into_body().into_reader();
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|e| ResolveImageError::Http(e.to_string()))?;
    Ok(body)
}

impl DigestResolver for RegistryResolver {
    fn resolve(&self, image: &str) -> Result<String, ResolveImageError> {
        if is_digest_pinned(image) {
            return Ok(image.to_string());
        }

        let parsed = ImageRef::parse(image)?;
        let challenge = self.fetch_challenge(&parsed)?;
        let token = self.fetch_token(&parsed, &challenge)?;
        let digest = self.fetch_digest(&parsed, image, &token)?;
        let resolved = parsed.pinned(&digest);
        debug!(%image, %resolved, "resolved image digest");
        Ok(resolved)
    }
}
