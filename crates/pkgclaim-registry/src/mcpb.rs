//! MCP bundle ownership checker.
//!
//! An MCPB package is a zip archive at a direct download URL. The proof is
//! the `mcp_name` field of the bundle's root `manifest.json`.
//!
//! Bundle URLs come from the registrant, so only hosts on the client's
//! allow-list (GitHub and GitLab releases by default) are fetched.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use pkgclaim_core::proof::MCPB_PROOF_FIELD;
use pkgclaim_core::{
    verify_ownership, OwnershipProof, PackageReference, RegistryType, Result, ServerNameClaim,
    ValidationError,
};

use crate::checker::{OwnershipChecker, PackageScope};
use crate::client::OriginClient;
use crate::config::OriginClientConfig;
use crate::context::ValidationContext;
use crate::reference::is_loopback_host;

/// Manifest file at the root of every bundle.
const MANIFEST_FILE: &str = "manifest.json";

/// Checks MCP bundles.
#[derive(Debug, Clone)]
pub struct McpbChecker {
    client: OriginClient,
}

impl McpbChecker {
    /// Creates a checker using `client`.
    #[must_use]
    pub const fn new(client: OriginClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnershipChecker for McpbChecker {
    fn registry(&self) -> RegistryType {
        RegistryType::Mcpb
    }

    async fn check(
        &self,
        ctx: &ValidationContext,
        package: &PackageReference,
        claim: &ServerNameClaim,
        _base_url: Option<&str>,
    ) -> Result<()> {
        let scope = PackageScope::new(RegistryType::Mcpb, &package.identifier);
        let url = bundle_url(&scope, &package.identifier, self.client.config())?;

        let response = self
            .client
            .get(ctx, &scope, url.as_str(), "application/octet-stream")
            .await?;
        let limit = self.client.config().max_bundle_bytes;
        let bundle = self.client.read_bytes(ctx, &scope, response, limit).await?;

        debug!(url = %url, size = bundle.len(), "Downloaded bundle");

        if let Some(expected) = package.file_sha256.as_deref().filter(|d| !d.is_empty()) {
            verify_sha256(&bundle, expected, &package.identifier)?;
        }

        let manifest = read_manifest(&scope, &bundle)?;
        let proof = proof_from_manifest(&scope, &manifest)?;
        verify_ownership(&proof, claim, RegistryType::Mcpb, &package.identifier)?;

        info!(url = %url, server = %claim, "MCPB ownership verified");
        Ok(())
    }
}

/// Parses the bundle location.
///
/// The host must be allow-listed. Only HTTPS is accepted, except for loopback hosts.
fn bundle_url(
    scope: &PackageScope<'_>,
    identifier: &str,
    config: &OriginClientConfig,
) -> Result<Url> {
    let url = Url::parse(identifier)
        .map_err(|e| scope.invalid_input(format!("bundle location is not a URL: {e}")))?;

    let Some(host) = url.host_str() else {
        return Err(scope.invalid_input("bundle URL has no host"));
    };
    if !config.is_bundle_host_allowed(host) {
        return Err(scope.invalid_input(format!(
            "bundles may only be downloaded from {}, not {host}",
            config.allowed_bundle_hosts.join(", ")
        )));
    }

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(host) => Ok(url),
        scheme => Err(scope.invalid_input(format!(
            "bundle must be served over https, not {scheme}"
        ))),
    }
}

/// Compares the bundle's SHA-256 digest with the declared one.
fn verify_sha256(bundle: &[u8], expected: &str, package: &str) -> Result<()> {
    let actual = hex::encode(Sha256::digest(bundle));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ValidationError::ChecksumMismatch {
            package: package.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

fn read_manifest(scope: &PackageScope<'_>, bundle: &[u8]) -> Result<Value> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bundle))
        .map_err(|e| scope.invalid_metadata(format!("bundle is not a zip archive: {e}")))?;

    let mut file = archive
        .by_name(MANIFEST_FILE)
        .map_err(|_| scope.invalid_metadata(format!("bundle has no {MANIFEST_FILE}")))?;

    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .map_err(|e| scope.invalid_metadata(format!("cannot read {MANIFEST_FILE}: {e}")))?;

    serde_json::from_slice(&contents)
        .map_err(|e| scope.invalid_metadata(format!("malformed {MANIFEST_FILE}: {e}")))
}

fn proof_from_manifest(scope: &PackageScope<'_>, manifest: &Value) -> Result<OwnershipProof> {
    match manifest.get(MCPB_PROOF_FIELD) {
        None | Some(Value::Null) => Ok(OwnershipProof::Absent),
        Some(Value::String(name)) => Ok(OwnershipProof::from_field(Some(name.as_str()))),
        Some(other) => Err(scope.invalid_metadata(format!(
            "{MCPB_PROOF_FIELD} must be a string, found {other}"
        ))),
    }
}
