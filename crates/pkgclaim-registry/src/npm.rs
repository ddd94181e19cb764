//! npm ownership checker.
//!
//! Reads the `mcpName` field of the published `package.json`, as served by
//! the registry's version document at `{base}/{name}/{version}`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use pkgclaim_core::{
    verify_ownership, OwnershipProof, PackageReference, RegistryType, Result, ServerNameClaim,
};

use crate::checker::{OwnershipChecker, PackageScope};
use crate::client::{join_url, OriginClient};
use crate::context::ValidationContext;

/// Dist-tag queried when the reference has no version.
const LATEST_TAG: &str = "latest";

/// The subset of an npm version document that carries the proof.
#[derive(Debug, Deserialize)]
struct NpmVersionDocument {
    #[serde(rename = "mcpName")]
    mcp_name: Option<String>,
}

/// Checks npm packages.
#[derive(Debug, Clone)]
pub struct NpmChecker {
    client: OriginClient,
}

impl NpmChecker {
    /// Creates a checker using `client`.
    #[must_use]
    pub const fn new(client: OriginClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnershipChecker for NpmChecker {
    fn registry(&self) -> RegistryType {
        RegistryType::Npm
    }

    async fn check(
        &self,
        ctx: &ValidationContext,
        package: &PackageReference,
        claim: &ServerNameClaim,
        base_url: Option<&str>,
    ) -> Result<()> {
        let scope = PackageScope::new(RegistryType::Npm, &package.identifier);
        let base = scope.require_base_url(base_url)?;

        if package.identifier.is_empty() {
            return Err(scope.invalid_input("package name must not be empty"));
        }

        let version = package.version().unwrap_or(LATEST_TAG);
        let url = join_url(&scope, base, &[package.identifier.as_str(), version])?;

        let response = self.client.get(ctx, &scope, &url, "application/json").await?;
        let document: NpmVersionDocument = self.client.read_json(ctx, &scope, response).await?;

        let proof = OwnershipProof::from_field(document.mcp_name.as_deref());
        verify_ownership(&proof, claim, RegistryType::Npm, &package.identifier)?;

        info!(package = %package.identifier, version, server = %claim, "npm ownership verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_document_with_proof() {
        let json = r#"{
            "name": "@acme/mcp-server-foo",
            "version": "1.0.0",
            "mcpName": "io.github.acme/foo",
            "dist": { "tarball": "https://registry.npmjs.org/@acme/mcp-server-foo/-/mcp-server-foo-1.0.0.tgz" }
        }"#;
        let document: NpmVersionDocument = serde_json::from_str(json).unwrap();
        assert_eq!(document.mcp_name.as_deref(), Some("io.github.acme/foo"));
    }

    #[test]
    fn test_version_document_without_proof() {
        let document: NpmVersionDocument =
            serde_json::from_str(r#"{"name": "foo", "version": "1.0.0"}"#).unwrap();
        assert!(document.mcp_name.is_none());
    }

    #[test]
    fn test_version_document_wrong_type() {
        let result = serde_json::from_str::<NpmVersionDocument>(r#"{"mcpName": 42}"#);
        assert!(result.is_err());
    }
}
