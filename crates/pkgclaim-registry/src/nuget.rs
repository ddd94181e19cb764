//! NuGet ownership checker.
//!
//! The configured base URL is a NuGet V3 service index. The checker locates
//! the flat container (`PackageBaseAddress/3.0.0`), confirms the package and
//! version exist, then looks for an `mcp-name:` marker in the package README.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use pkgclaim_core::proof::readme_markers;
use pkgclaim_core::{
    verify_ownership, OwnershipProof, PackageReference, RegistryType, Result, ServerNameClaim,
    ValidationError,
};

use crate::checker::{OwnershipChecker, PackageScope};
use crate::client::{join_url, package_status, OriginClient};
use crate::context::ValidationContext;

/// Service index resource type of the flat container.
const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    resource_type: String,
}

impl ServiceIndex {
    fn package_base_address(&self) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.resource_type == PACKAGE_BASE_ADDRESS)
            .map(|r| r.id.as_str())
    }
}

/// Flat container `index.json`: every published version, oldest first.
#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// Checks NuGet packages.
#[derive(Debug, Clone)]
pub struct NugetChecker {
    client: OriginClient,
}

impl NugetChecker {
    /// Creates a checker using `client`.
    #[must_use]
    pub const fn new(client: OriginClient) -> Self {
        Self { client }
    }

    async fn package_base_address(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        service_index_url: &str,
    ) -> Result<String> {
        let response = self
            .client
            .get_origin_resource(ctx, scope, service_index_url, "application/json")
            .await?;

        let index: ServiceIndex = self
            .client
            .read_json(ctx, scope, response)
            .await
            .map_err(|e| match e {
                ValidationError::InvalidMetadata { reason, .. } => {
                    scope.unreachable(format!("invalid service index: {reason}"))
                }
                other => other,
            })?;

        index
            .package_base_address()
            .map(str::to_string)
            .ok_or_else(|| {
                scope.unreachable(format!(
                    "service index {service_index_url} has no {PACKAGE_BASE_ADDRESS} resource"
                ))
            })
    }
}

/// Normalizes a NuGet version the way the gallery does.
///
/// Build metadata is dropped, numeric parts lose leading zeros, `1.0` becomes
/// `1.0.0` and a zero fourth part is removed. Comparison is case-insensitive.
fn normalize_version(version: &str) -> String {
    let version = version.trim();
    let version = version.split_once('+').map_or(version, |(v, _)| v);
    let (release, prerelease) = match version.split_once('-') {
        Some((release, pre)) => (release, Some(pre)),
        None => (version, None),
    };

    let mut parts: Vec<String> = release
        .split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_or_else(|_| part.to_string(), |n| n.to_string())
        })
        .collect();
    while parts.len() < 3 {
        parts.push("0".to_string());
    }
    if parts.len() == 4 && parts[3] == "0" {
        parts.pop();
    }

    let mut normalized = parts.join(".");
    if let Some(pre) = prerelease {
        normalized.push('-');
        normalized.push_str(pre);
    }
    normalized.to_lowercase()
}

/// Newest stable version, or the newest prerelease if nothing stable exists.
fn latest_stable(versions: &[String]) -> Option<&String> {
    versions
        .iter()
        .rev()
        .find(|v| {
            let without_metadata = v.split_once('+').map_or(v.as_str(), |(release, _)| release);
            !without_metadata.contains('-')
        })
        .or_else(|| versions.last())
}

#[async_trait]
impl OwnershipChecker for NugetChecker {
    fn registry(&self) -> RegistryType {
        RegistryType::Nuget
    }

    async fn check(
        &self,
        ctx: &ValidationContext,
        package: &PackageReference,
        claim: &ServerNameClaim,
        base_url: Option<&str>,
    ) -> Result<()> {
        let scope = PackageScope::new(RegistryType::Nuget, &package.identifier);
        let base = scope.require_base_url(base_url)?;

        if package.identifier.is_empty() {
            return Err(scope.invalid_input("package id must not be empty"));
        }

        let flat_container = self.package_base_address(ctx, &scope, base).await?;
        let id = package.identifier.to_lowercase();

        let versions_url = join_url(&scope, &flat_container, &[id.as_str(), "index.json"])?;
        let response = self
            .client
            .get(ctx, &scope, &versions_url, "application/json")
            .await?;
        let index: VersionIndex = self.client.read_json(ctx, &scope, response).await?;

        let version = match package.version() {
            Some(requested) => {
                let wanted = normalize_version(requested);
                let Some(published) = index
                    .versions
                    .iter()
                    .find(|v| normalize_version(v) == wanted)
                else {
                    debug!(package = %package.identifier, version = %wanted, "Version not published");
                    return Err(scope.not_found());
                };
                published.to_lowercase()
            }
            None => latest_stable(&index.versions)
                .map(|v| v.to_lowercase())
                .ok_or_else(|| scope.not_found())?,
        };

        let readme_url = join_url(
            &scope,
            &flat_container,
            &[id.as_str(), version.as_str(), "readme"],
        )?;
        let response = self
            .client
            .send(ctx, &scope, self.client.request(&readme_url))
            .await?;

        // A published package without a README has nowhere to carry the marker.
        let readme = if response.status() == StatusCode::NOT_FOUND {
            String::new()
        } else {
            let response = package_status(&scope, response)?;
            self.client.read_text(ctx, &scope, response).await?
        };

        let proof = OwnershipProof::from_candidates(readme_markers(&readme));
        verify_ownership(&proof, claim, RegistryType::Nuget, &package.identifier)?;

        info!(package = %package.identifier, version = %version, server = %claim, "NuGet ownership verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_index_finds_flat_container() {
        let json = r#"{
            "version": "3.0.0",
            "resources": [
                { "@id": "https://azuresearch-usnc.nuget.org/query", "@type": "SearchQueryService" },
                { "@id": "https://api.nuget.org/v3-flatcontainer/", "@type": "PackageBaseAddress/3.0.0" }
            ]
        }"#;
        let index: ServiceIndex = serde_json::from_str(json).unwrap();
        assert_eq!(
            index.package_base_address(),
            Some("https://api.nuget.org/v3-flatcontainer/")
        );
    }

    #[test]
    fn test_service_index_without_flat_container() {
        let index: ServiceIndex = serde_json::from_str(r#"{"resources": []}"#).unwrap();
        assert_eq!(index.package_base_address(), None);
    }

    #[test]
    fn test_version_index() {
        let index: VersionIndex =
            serde_json::from_str(r#"{"versions": ["0.9.0", "1.0.0-beta", "1.0.0"]}"#).unwrap();
        assert_eq!(index.versions.len(), 3);
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("1.0"), "1.0.0");
        assert_eq!(normalize_version("1"), "1.0.0");
        assert_eq!(normalize_version("1.0.0.0"), "1.0.0");
        assert_eq!(normalize_version("1.0.0.4"), "1.0.0.4");
        assert_eq!(normalize_version("01.002.0"), "1.2.0");
        assert_eq!(normalize_version("1.0.0+build.7"), "1.0.0");
        assert_eq!(normalize_version("1.0-Beta.1"), "1.0.0-beta.1");
        assert_eq!(normalize_version(" 2.1.0 "), "2.1.0");
    }

    #[test]
    fn test_latest_stable_skips_prereleases() {
        let versions: Vec<String> = ["0.9.0", "1.0.0", "1.1.0-beta", "1.1.0-rc.1"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(latest_stable(&versions).map(String::as_str), Some("1.0.0"));

        let prereleases = vec!["0.1.0-alpha".to_string(), "0.2.0-alpha".to_string()];
        assert_eq!(latest_stable(&prereleases).map(String::as_str), Some("0.2.0-alpha"));

        assert_eq!(latest_stable(&[]), None);
    }
}
