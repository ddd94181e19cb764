//! OCI image references.
//!
//! Supported forms:
//! - `foo` → `docker.io/library/foo:latest`
//! - `acme/foo:1.0.0` → Docker Hub repository `acme/foo`, tag `1.0.0`
//! - `ghcr.io/acme/foo:1.0.0` → explicit registry host
//! - `localhost:5000/foo@sha256:abc...` → digest reference on a local registry

use std::fmt;
use std::net::IpAddr;

use pkgclaim_core::{Result, ValidationError};

/// Docker Hub's canonical name.
const DOCKER_HUB: &str = "docker.io";

/// Host serving Docker Hub's registry API.
const DOCKER_HUB_API: &str = "registry-1.docker.io";

/// A parsed OCI image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host, with port if given.
    pub registry: String,

    /// Repository path within the registry.
    pub repository: String,

    /// Tag, if given.
    pub tag: Option<String>,

    /// Content digest, if given.
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parses an image reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkgclaim_registry::ImageReference;
    ///
    /// let image = ImageReference::parse("ghcr.io/acme/foo:1.0.0").unwrap();
    /// assert_eq!(image.registry, "ghcr.io");
    /// assert_eq!(image.repository, "acme/foo");
    /// assert_eq!(image.tag.as_deref(), Some("1.0.0"));
    ///
    /// let image = ImageReference::parse("postgres").unwrap();
    /// assert_eq!(image.registry, "docker.io");
    /// assert_eq!(image.repository, "library/postgres");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInput`] if the reference is empty,
    /// contains whitespace, or has an invalid repository, tag or digest.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            ValidationError::invalid_input(format!("invalid OCI reference '{input}': {reason}"))
        };

        if input.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if input.chars().any(char::is_whitespace) {
            return Err(invalid("reference contains whitespace"));
        }

        let (name_and_tag, digest) = match input.split_once('@') {
            Some((name, digest)) => {
                if !is_valid_digest(digest) {
                    return Err(invalid("digest must look like 'algorithm:hex'"));
                }
                (name, Some(digest.to_string()))
            }
            None => (input, None),
        };

        let (registry, remainder) = match name_and_tag.split_once('/') {
            Some((first, rest)) if looks_like_host(first) => (first.to_string(), rest),
            _ => (DOCKER_HUB.to_string(), name_and_tag),
        };
        let registry = if registry == "index.docker.io" {
            DOCKER_HUB.to_string()
        } else {
            registry
        };

        // A tag separator can only appear after the last path separator.
        let last_segment_start = remainder.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match remainder[last_segment_start..].rfind(':') {
            Some(i) => {
                let split = last_segment_start + i;
                (&remainder[..split], Some(remainder[split + 1..].to_string()))
            }
            None => (remainder, None),
        };

        if repository.is_empty() {
            return Err(invalid("repository is empty"));
        }
        if !repository.split('/').all(is_valid_path_component) {
            return Err(invalid(
                "repository components must be lowercase alphanumerics separated by '.', '_' or '-'",
            ));
        }
        if let Some(ref tag) = tag {
            if !is_valid_tag(tag) {
                return Err(invalid("tag is invalid"));
            }
        }

        let repository = if registry == DOCKER_HUB && !repository.contains('/') {
            format!("library/{repository}")
        } else {
            repository.to_string()
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Returns the reference to request: digest, then tag, then `fallback_tag`.
    #[must_use]
    pub fn manifest_reference<'a>(&'a self, fallback_tag: &'a str) -> &'a str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(fallback_tag)
    }

    /// Returns the root URL of the registry's Distribution API.
    ///
    /// Loopback registries are addressed over plain HTTP.
    #[must_use]
    pub fn api_base(&self) -> String {
        if self.registry == DOCKER_HUB {
            format!("https://{DOCKER_HUB_API}")
        } else if self.is_loopback() {
            format!("http://{}", self.registry)
        } else {
            format!("https://{}", self.registry)
        }
    }

    /// Returns true if the registry host is a loopback address.
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        is_loopback_host(host_without_port(&self.registry))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

/// Returns true for `localhost` and for loopback IP literals (`127.0.0.0/8`, `[::1]`).
///
/// Names that merely start with `127.` are ordinary DNS names.
pub(crate) fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let literal = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    literal.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

fn host_without_port(registry: &str) -> &str {
    if registry.starts_with('[') {
        return registry
            .find(']')
            .map_or(registry, |end| &registry[..=end]);
    }
    registry.split(':').next().unwrap_or(registry)
}

fn looks_like_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn is_valid_path_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
        && component.starts_with(|c: char| c.is_ascii_alphanumeric())
}

fn is_valid_tag(tag: &str) -> bool {
    (1..=128).contains(&tag.len())
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && !tag.starts_with(['.', '-'])
}

/// Returns true for `algorithm:hex` digests.
pub(crate) fn is_valid_digest(digest: &str) -> bool {
    digest.split_once(':').is_some_and(|(algorithm, hex)| {
        algorithm.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
            && algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
            && !hex.is_empty()
            && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}
