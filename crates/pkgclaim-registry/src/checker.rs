//! The per-registry checker contract.

use async_trait::async_trait;

use pkgclaim_core::{PackageReference, RegistryType, Result, ServerNameClaim, ValidationError};

use crate::context::ValidationContext;

/// Fetches a package's metadata from its origin and judges its ownership proof.
///
/// Each implementation handles exactly one [`RegistryType`]. Implementations
/// extract candidate proof values and defer the comparison to
/// [`pkgclaim_core::verify_ownership`].
#[async_trait]
pub trait OwnershipChecker: Send + Sync + std::fmt::Debug {
    /// The registry this checker handles.
    fn registry(&self) -> RegistryType;

    /// Checks that `package` proves ownership by `claim`.
    ///
    /// `base_url` is the resolved origin for registries with a configurable
    /// origin and `None` for self-locating ones.
    ///
    /// # Errors
    ///
    /// Returns one of the [`ValidationError`] kinds; raw transport or parse
    /// errors are never returned.
    async fn check(
        &self,
        ctx: &ValidationContext,
        package: &PackageReference,
        claim: &ServerNameClaim,
        base_url: Option<&str>,
    ) -> Result<()>;
}

/// The package a checker is working on, used to label every error it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageScope<'a> {
    /// Registry being queried.
    pub registry: RegistryType,
    /// Package identifier as claimed.
    pub package: &'a str,
}

impl<'a> PackageScope<'a> {
    /// Creates a scope.
    #[must_use]
    pub const fn new(registry: RegistryType, package: &'a str) -> Self {
        Self { registry, package }
    }

    /// Builds a [`ValidationError::PackageNotFound`].
    #[must_use]
    pub fn not_found(&self) -> ValidationError {
        ValidationError::PackageNotFound {
            registry: self.registry,
            package: self.package.to_string(),
        }
    }

    /// Builds a [`ValidationError::OriginUnreachable`].
    pub fn unreachable(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::OriginUnreachable {
            registry: self.registry,
            package: self.package.to_string(),
            reason: reason.into(),
        }
    }

    /// Builds a [`ValidationError::InvalidMetadata`].
    pub fn invalid_metadata(&self, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidMetadata {
            registry: self.registry,
            package: self.package.to_string(),
            reason: reason.into(),
        }
    }

    /// Builds a [`ValidationError::InvalidInput`] naming this package.
    pub fn invalid_input(&self, reason: impl std::fmt::Display) -> ValidationError {
        ValidationError::invalid_input(format!(
            "{} package '{}': {reason}",
            self.registry, self.package
        ))
    }

    /// Returns the resolved origin, which configurable registries require.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInput`] if no origin was resolved.
    pub fn require_base_url<'b>(&self, base_url: Option<&'b str>) -> Result<&'b str> {
        base_url.ok_or_else(|| self.invalid_input("no registry base URL resolved"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgclaim_core::ErrorKind;

    #[test]
    fn test_scope_errors_carry_package() {
        let scope = PackageScope::new(RegistryType::Pypi, "acme-foo");

        assert_eq!(scope.not_found().kind(), ErrorKind::PackageNotFound);
        assert_eq!(
            scope.unreachable("HTTP 503").to_string(),
            "pypi registry unreachable while fetching 'acme-foo': HTTP 503"
        );
        assert_eq!(
            scope.invalid_metadata("bad json").kind(),
            ErrorKind::InvalidMetadata
        );
    }

    #[test]
    fn test_require_base_url() {
        let scope = PackageScope::new(RegistryType::Npm, "foo");
        assert_eq!(
            scope.require_base_url(Some("https://npm.example.com")),
            Ok("https://npm.example.com")
        );
        let err = scope.require_base_url(None).unwrap_err();
        assert!(err.to_string().contains("npm package 'foo'"));
    }
}
