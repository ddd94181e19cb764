//! OCI ownership checker.
//!
//! Images declare their server name with the
//! `io.modelcontextprotocol.server.name` label (image config) or annotation
//! (manifest). The checker reads both through the OCI Distribution API and
//! treats differing values as a conflict.
//!
//! Public registries usually demand an anonymous bearer token even for pulls;
//! the checker answers a `WWW-Authenticate: Bearer` challenge once per call.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use pkgclaim_core::proof::OCI_SERVER_NAME_LABEL;
use pkgclaim_core::{
    verify_ownership, OwnershipProof, PackageReference, RegistryType, Result, ServerNameClaim,
};

use crate::checker::{OwnershipChecker, PackageScope};
use crate::client::{package_status, OriginClient};
use crate::context::ValidationContext;
use crate::reference::{is_valid_digest, ImageReference};

/// Media types accepted for manifests.
pub struct MediaType;

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index media type.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// Docker image manifest (schema 2) media type.
    pub const DOCKER_MANIFEST: &'static str = "application/vnd.docker.distribution.manifest.v2+json";

    /// Docker manifest list media type.
    pub const DOCKER_MANIFEST_LIST: &'static str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// `Accept` header value covering every manifest flavour.
    #[must_use]
    pub fn manifest_accept() -> String {
        [
            Self::OCI_MANIFEST,
            Self::OCI_INDEX,
            Self::DOCKER_MANIFEST,
            Self::DOCKER_MANIFEST_LIST,
        ]
        .join(", ")
    }
}

/// OCI content descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Digest of the targeted content.
    pub digest: String,

    /// Size in bytes of the content.
    #[serde(default)]
    pub size: u64,

    /// Target platform, for index entries.
    #[serde(default)]
    pub platform: Option<Platform>,

    /// Optional annotations.
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

/// Platform of an index entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Platform {
    /// CPU architecture (e.g., `amd64`).
    pub architecture: String,

    /// Operating system (e.g., `linux`).
    pub os: String,
}

/// An image manifest or an image index.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (always 2).
    #[serde(default)]
    pub schema_version: u32,

    /// Media type of this document.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Image configuration descriptor.
    #[serde(default)]
    pub config: Option<Descriptor>,

    /// Platform manifests, present on an index.
    #[serde(default)]
    pub manifests: Option<Vec<Descriptor>>,

    /// Optional annotations.
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

impl Manifest {
    /// Returns true if this document is an image index.
    #[must_use]
    pub fn is_index(&self) -> bool {
        self.manifests.is_some()
            || matches!(
                self.media_type.as_deref(),
                Some(MediaType::OCI_INDEX | MediaType::DOCKER_MANIFEST_LIST)
            )
    }

    /// Picks the `linux/amd64` entry of an index, else its first entry.
    #[must_use]
    pub fn select_platform(&self) -> Option<&Descriptor> {
        let manifests = self.manifests.as_deref()?;
        manifests
            .iter()
            .find(|d| {
                d.platform
                    .as_ref()
                    .is_some_and(|p| p.os == "linux" && p.architecture == "amd64")
            })
            .or_else(|| manifests.first())
    }

    /// Returns the server name annotation, if present.
    #[must_use]
    pub fn server_name_annotation(&self) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(OCI_SERVER_NAME_LABEL))
            .map(String::as_str)
    }
}

/// The image configuration blob.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageConfig {
    /// Runtime configuration.
    #[serde(default)]
    pub config: Option<ContainerConfig>,
}

/// The `config` section of an image configuration blob.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerConfig {
    /// Image labels (`LABEL` instructions).
    #[serde(rename = "Labels", default)]
    pub labels: Option<HashMap<String, String>>,
}

impl ImageConfig {
    /// Returns the server name label, if present.
    #[must_use]
    pub fn server_name_label(&self) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|c| c.labels.as_ref())
            .and_then(|labels| labels.get(OCI_SERVER_NAME_LABEL))
            .map(String::as_str)
    }
}

/// A `WWW-Authenticate: Bearer` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    /// Token endpoint.
    pub realm: String,
    /// Service the token is for.
    pub service: Option<String>,
    /// Requested scope.
    pub scope: Option<String>,
}

impl BearerChallenge {
    /// Parses a challenge header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkgclaim_registry::BearerChallenge;
    ///
    /// let challenge = BearerChallenge::parse(
    ///     r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io""#,
    /// )
    /// .unwrap();
    /// assert_eq!(challenge.realm, "https://auth.docker.io/token");
    /// ```
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut values: HashMap<String, String> = HashMap::new();
        let mut rest = params.trim();
        while !rest.is_empty() {
            let (key, after_key) = rest.split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            let after_key = after_key.trim_start();

            let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
                let end = quoted.find('"')?;
                (&quoted[..end], &quoted[end + 1..])
            } else {
                let end = after_key.find(',').unwrap_or(after_key.len());
                (after_key[..end].trim(), &after_key[end..])
            };

            values.insert(key, value.to_string());
            rest = remainder.trim_start().trim_start_matches(',').trim_start();
        }

        Some(Self {
            realm: values.remove("realm")?,
            service: values.remove("service"),
            scope: values.remove("scope"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// One checker call's view of a registry: base URL, repository, token.
struct Session<'a> {
    api_base: String,
    image: &'a ImageReference,
    token: Option<String>,
}

/// Checks OCI images.
#[derive(Debug, Clone)]
pub struct OciChecker {
    client: OriginClient,
}

impl OciChecker {
    /// Creates a checker using `client`.
    #[must_use]
    pub const fn new(client: OriginClient) -> Self {
        Self { client }
    }

    /// GETs a registry path, answering a bearer challenge once.
    async fn authorized_get(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        session: &mut Session<'_>,
        path: &str,
        accept: &str,
    ) -> Result<Response> {
        let url = format!("{}/v2/{}/{path}", session.api_base, session.image.repository);

        let response = self.send(ctx, scope, session, &url, accept).await?;
        if response.status() != StatusCode::UNAUTHORIZED || session.token.is_some() {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerChallenge::parse);

        let Some(challenge) = challenge else {
            debug!(url = %url, "Registry requires credentials other than an anonymous token");
            return Ok(response);
        };

        session.token = Some(self.fetch_token(ctx, scope, session.image, &challenge).await?);
        self.send(ctx, scope, session, &url, accept).await
    }

    async fn send(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        session: &Session<'_>,
        url: &str,
        accept: &str,
    ) -> Result<Response> {
        let mut request = self.client.request(url).header(ACCEPT, accept);
        if let Some(ref token) = session.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        self.client.send(ctx, scope, request).await
    }

    async fn fetch_token(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        image: &ImageReference,
        challenge: &BearerChallenge,
    ) -> Result<String> {
        let default_scope = format!("repository:{}:pull", image.repository);
        let mut query = vec![(
            "scope",
            challenge.scope.clone().unwrap_or(default_scope),
        )];
        if let Some(ref service) = challenge.service {
            query.push(("service", service.clone()));
        }

        let request = self.client.request(&challenge.realm).query(&query);
        let response = self.client.send(ctx, scope, request).await?;
        if !response.status().is_success() {
            return Err(scope.unreachable(format!(
                "token endpoint {} answered HTTP {}",
                challenge.realm,
                response.status()
            )));
        }

        let token: TokenResponse = self.client.read_json(ctx, scope, response).await?;
        token
            .token
            .or(token.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| scope.unreachable("token endpoint returned no token"))
    }

    async fn fetch_manifest(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        session: &mut Session<'_>,
        reference: &str,
    ) -> Result<Manifest> {
        let response = self
            .authorized_get(
                ctx,
                scope,
                session,
                &format!("manifests/{reference}"),
                &MediaType::manifest_accept(),
            )
            .await?;

        // Anonymous pulls of private or missing repositories are refused, not 404'd.
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!(reference, status = %response.status(), "Manifest is not publicly pullable");
            return Err(scope.not_found());
        }

        let response = package_status(scope, response)?;
        self.client.read_json(ctx, scope, response).await
    }

    async fn fetch_config(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        session: &mut Session<'_>,
        config: &Descriptor,
    ) -> Result<ImageConfig> {
        let digest = checked_digest(scope, "config", &config.digest)?;
        let response = self
            .authorized_get(
                ctx,
                scope,
                session,
                &format!("blobs/{digest}"),
                "application/json",
            )
            .await?;

        // The manifest exists, so a missing blob means the manifest is broken.
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(scope.invalid_metadata(format!(
                "manifest references config blob {digest} that the registry does not have"
            )));
        }
        if !status.is_success() {
            return Err(scope.unreachable(format!(
                "config blob {digest} answered HTTP {status}"
            )));
        }
        self.client.read_json(ctx, scope, response).await
    }
}

/// Rejects registry-supplied digests that are unfit for a URL path.
fn checked_digest<'d>(scope: &PackageScope<'_>, what: &str, digest: &'d str) -> Result<&'d str> {
    if is_valid_digest(digest) {
        Ok(digest)
    } else {
        Err(scope.invalid_metadata(format!("{what} digest '{digest}' is not 'algorithm:hex'")))
    }
}

#[async_trait]
impl OwnershipChecker for OciChecker {
    fn registry(&self) -> RegistryType {
        RegistryType::Oci
    }

    async fn check(
        &self,
        ctx: &ValidationContext,
        package: &PackageReference,
        claim: &ServerNameClaim,
        _base_url: Option<&str>,
    ) -> Result<()> {
        let scope = PackageScope::new(RegistryType::Oci, &package.identifier);
        let image = ImageReference::parse(&package.identifier)?;
        let reference = image
            .manifest_reference(package.version().unwrap_or("latest"))
            .to_string();

        let mut session = Session {
            api_base: image.api_base(),
            image: &image,
            token: None,
        };

        let mut manifest = self
            .fetch_manifest(ctx, &scope, &mut session, &reference)
            .await?;

        if manifest.is_index() {
            let entry = manifest
                .select_platform()
                .ok_or_else(|| scope.invalid_metadata("image index lists no manifests"))?;
            let digest = checked_digest(&scope, "index entry", &entry.digest)?.to_string();
            debug!(image = %image, digest = %digest, "Resolved image index entry");
            manifest = self.fetch_manifest(ctx, &scope, &mut session, &digest).await?;
        }

        let mut candidates: Vec<String> = manifest
            .server_name_annotation()
            .map(str::to_string)
            .into_iter()
            .collect();

        if let Some(ref config) = manifest.config {
            let image_config = self.fetch_config(ctx, &scope, &mut session, config).await?;
            candidates.extend(image_config.server_name_label().map(str::to_string));
        }

        let proof = OwnershipProof::from_candidates(candidates);
        verify_ownership(&proof, claim, RegistryType::Oci, &package.identifier)?;

        info!(image = %image, reference = %reference, server = %claim, "OCI ownership verified");
        Ok(())
    }
}
