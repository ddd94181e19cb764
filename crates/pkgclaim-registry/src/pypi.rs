//! PyPI ownership checker.
//!
//! PyPI has no free-form metadata field, so the proof lives in the project
//! README (`info.description` of the JSON API) as an `mcp-name:` marker.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use pkgclaim_core::proof::readme_markers;
use pkgclaim_core::{
    verify_ownership, OwnershipProof, PackageReference, RegistryType, Result, ServerNameClaim,
};

use crate::checker::{OwnershipChecker, PackageScope};
use crate::client::{join_url, OriginClient};
use crate::context::ValidationContext;

#[derive(Debug, Deserialize)]
struct PypiDocument {
    info: PypiInfo,
}

#[derive(Debug, Deserialize)]
struct PypiInfo {
    description: Option<String>,
}

/// Checks PyPI packages.
#[derive(Debug, Clone)]
pub struct PypiChecker {
    client: OriginClient,
}

impl PypiChecker {
    /// Creates a checker using `client`.
    #[must_use]
    pub const fn new(client: OriginClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnershipChecker for PypiChecker {
    fn registry(&self) -> RegistryType {
        RegistryType::Pypi
    }

    async fn check(
        &self,
        ctx: &ValidationContext,
        package: &PackageReference,
        claim: &ServerNameClaim,
        base_url: Option<&str>,
    ) -> Result<()> {
        let scope = PackageScope::new(RegistryType::Pypi, &package.identifier);
        let base = scope.require_base_url(base_url)?;

        if package.identifier.is_empty() {
            return Err(scope.invalid_input("project name must not be empty"));
        }

        let name = package.identifier.as_str();
        let url = match package.version() {
            Some(version) => join_url(&scope, base, &["pypi", name, version, "json"])?,
            None => join_url(&scope, base, &["pypi", name, "json"])?,
        };

        let response = self.client.get(ctx, &scope, &url, "application/json").await?;
        let document: PypiDocument = self.client.read_json(ctx, &scope, response).await?;

        let readme = document.info.description.unwrap_or_default();
        let proof = OwnershipProof::from_candidates(readme_markers(&readme));
        verify_ownership(&proof, claim, RegistryType::Pypi, &package.identifier)?;

        info!(package = %package.identifier, server = %claim, "PyPI ownership verified");
        Ok(())
    }
}
