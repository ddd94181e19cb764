//! The validation dispatcher.
//!
//! Parses the registry type, resolves the origin and delegates to exactly one
//! checker. Unknown registry types fail before any network access.

use futures::future::join_all;
use tracing::{debug, warn};

use pkgclaim_core::{
    resolve_base_url, ErrorKind, PackageReference, RegistryConfig, RegistryType, Result,
    ServerNameClaim, ServerSubmission, ValidationError,
};

use crate::checker::{OwnershipChecker, PackageScope};
use crate::client::OriginClient;
use crate::context::ValidationContext;
use crate::mcpb::McpbChecker;
use crate::npm::NpmChecker;
use crate::nuget::NugetChecker;
use crate::oci::OciChecker;
use crate::pypi::PypiChecker;

/// Validates package ownership claims against their origin registries.
///
/// Holds no mutable state; one validator can serve any number of concurrent
/// calls.
///
/// # Examples
///
/// ```no_run
/// use pkgclaim_core::{PackageReference, RegistryConfig, ServerNameClaim};
/// use pkgclaim_registry::{OriginClient, OriginClientConfig, PackageValidator, ValidationContext};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let validator = PackageValidator::new(OriginClient::new(OriginClientConfig::new())?);
/// let config = RegistryConfig::default();
/// let ctx = ValidationContext::with_timeout(Duration::from_secs(10));
///
/// let package = PackageReference::new("npm", "@acme/mcp-server-foo").with_version("1.0.0");
/// let claim = ServerNameClaim::new("io.github.acme/foo")?;
/// validator.validate(&ctx, &package, &claim, &config).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PackageValidator {
    npm: NpmChecker,
    pypi: PypiChecker,
    nuget: NugetChecker,
    oci: OciChecker,
    mcpb: McpbChecker,
}

/// The outcome of validating one package of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    /// The package that was validated.
    pub package: PackageReference,
    /// Success, or the reason validation failed.
    pub result: Result<()>,
}

impl PackageOutcome {
    /// Returns true if the package passed validation.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}

impl PackageValidator {
    /// Creates a validator whose checkers share `client`.
    #[must_use]
    pub fn new(client: OriginClient) -> Self {
        Self {
            npm: NpmChecker::new(client.clone()),
            pypi: PypiChecker::new(client.clone()),
            nuget: NugetChecker::new(client.clone()),
            oci: OciChecker::new(client.clone()),
            mcpb: McpbChecker::new(client),
        }
    }

    /// Returns the checker responsible for `registry`.
    #[must_use]
    pub fn checker(&self, registry: RegistryType) -> &dyn OwnershipChecker {
        match registry {
            RegistryType::Npm => &self.npm,
            RegistryType::Pypi => &self.pypi,
            RegistryType::Nuget => &self.nuget,
            RegistryType::Oci => &self.oci,
            RegistryType::Mcpb => &self.mcpb,
        }
    }

    /// Validates that `package` proves ownership by `claim`.
    ///
    /// The whole call, including every origin round trip, is bounded by
    /// `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedRegistryType`] without touching
    /// the network if the registry type is unknown, and otherwise whatever
    /// the registry's checker reports.
    pub async fn validate(
        &self,
        ctx: &ValidationContext,
        package: &PackageReference,
        claim: &ServerNameClaim,
        config: &RegistryConfig,
    ) -> Result<()> {
        let registry = package.registry()?;

        if !config.registry_validation_enabled() {
            debug!(
                registry = %registry,
                package = %package.identifier,
                "Registry validation disabled, skipping ownership check"
            );
            return Ok(());
        }

        let base_url = resolve_base_url(registry, config);
        let scope = PackageScope::new(registry, &package.identifier);
        check_declared_origin(&scope, registry, package, base_url)?;
        let checker = self.checker(registry);

        let result = ctx
            .guard(&scope, checker.check(ctx, package, claim, base_url))
            .await
            .and_then(|outcome| outcome);

        if let Err(ref e) = result {
            if matches!(e.kind(), ErrorKind::ProofMissing | ErrorKind::ProofMismatch) {
                warn!(registry = %registry, package = %package.identifier, error = %e, "Ownership proof rejected");
            } else {
                debug!(registry = %registry, package = %package.identifier, error = %e, "Validation failed");
            }
        }
        result
    }

    /// Validates every package of a submission against its name.
    ///
    /// Packages are checked concurrently; outcomes are returned in submission
    /// order.
    pub async fn validate_submission(
        &self,
        ctx: &ValidationContext,
        submission: &ServerSubmission,
        config: &RegistryConfig,
    ) -> Vec<PackageOutcome> {
        let claim = match submission.claim() {
            Ok(claim) => claim,
            Err(e) => return Self::reject_all(submission, &e),
        };

        let checks = submission
            .packages
            .iter()
            .map(|package| self.validate(ctx, package, &claim, config));
        let results = join_all(checks).await;

        submission
            .packages
            .iter()
            .cloned()
            .zip(results)
            .map(|(package, result)| PackageOutcome { package, result })
            .collect()
    }

    fn reject_all(submission: &ServerSubmission, error: &ValidationError) -> Vec<PackageOutcome> {
        submission
            .packages
            .iter()
            .map(|package| PackageOutcome {
                package: package.clone(),
                result: Err(error.clone()),
            })
            .collect()
    }
}

/// Rejects a declared origin that differs from the one that will be queried.
///
/// OCI and MCPB identifiers name their own host, so a declared origin is ignored there.
fn check_declared_origin(
    scope: &PackageScope<'_>,
    registry: RegistryType,
    package: &PackageReference,
    base_url: Option<&str>,
) -> Result<()> {
    let Some(declared) = package.registry_base_url() else {
        return Ok(());
    };
    if !registry.has_configurable_origin() {
        return Ok(());
    }

    let matches = base_url
        .is_some_and(|resolved| resolved.trim_end_matches('/') == declared.trim_end_matches('/'));
    if matches {
        Ok(())
    } else {
        Err(scope.invalid_input(format!(
            "registry base URL '{declared}' does not match {}",
            base_url.unwrap_or("the resolved origin")
        )))
    }
}
