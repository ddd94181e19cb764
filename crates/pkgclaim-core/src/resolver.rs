//! Base URL resolution for configurable origins.

use crate::config::{RegistryConfig, DEFAULT_NPM_URL, DEFAULT_NUGET_URL, DEFAULT_PYPI_URL};
use crate::model::RegistryType;

/// Returns the public default origin of a registry.
///
/// `None` for registries whose package identifier names its own host.
#[must_use]
pub const fn default_base_url(registry: RegistryType) -> Option<&'static str> {
    match registry {
        RegistryType::Npm => Some(DEFAULT_NPM_URL),
        RegistryType::Pypi => Some(DEFAULT_PYPI_URL),
        RegistryType::Nuget => Some(DEFAULT_NUGET_URL),
        RegistryType::Oci | RegistryType::Mcpb => None,
    }
}

/// Resolves the origin to query for a registry.
///
/// The operator override wins when set; otherwise the public default is
/// used. OCI and MCPB resolve to `None`.
///
/// # Examples
///
/// ```
/// use pkgclaim_core::{resolve_base_url, RegistryConfig, RegistryType};
///
/// let config = RegistryConfig::default();
/// assert_eq!(
///     resolve_base_url(RegistryType::Npm, &config),
///     Some("https://registry.npmjs.org")
/// );
/// assert_eq!(resolve_base_url(RegistryType::Oci, &config), None);
/// ```
#[must_use]
pub fn resolve_base_url(registry: RegistryType, config: &RegistryConfig) -> Option<&str> {
    config
        .override_for(registry)
        .or_else(|| default_base_url(registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(
            resolve_base_url(RegistryType::Npm, &config),
            Some("https://registry.npmjs.org")
        );
        assert_eq!(
            resolve_base_url(RegistryType::Pypi, &config),
            Some("https://pypi.org")
        );
        assert_eq!(
            resolve_base_url(RegistryType::Nuget, &config),
            Some("https://api.nuget.org/v3/index.json")
        );
    }

    #[test]
    fn test_override_wins() {
        let config = RegistryConfig::builder()
            .nuget_base_url("http://localhost:5555/v3/index.json")
            .build()
            .unwrap();
        assert_eq!(
            resolve_base_url(RegistryType::Nuget, &config),
            Some("http://localhost:5555/v3/index.json")
        );
        assert_eq!(
            resolve_base_url(RegistryType::Npm, &config),
            Some(DEFAULT_NPM_URL)
        );
    }

    #[test]
    fn test_self_locating_registries() {
        let config = RegistryConfig::builder()
            .npm_base_url("https://npm.example.com")
            .build()
            .unwrap();
        assert_eq!(resolve_base_url(RegistryType::Oci, &config), None);
        assert_eq!(resolve_base_url(RegistryType::Mcpb, &config), None);
    }
}
