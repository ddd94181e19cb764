//! Registry configuration.
//!
//! A [`RegistryConfig`] is built once at process start and passed by
//! reference into every validation call. Only npm, PyPI and NuGet origins can
//! be overridden; OCI references and bundle URLs name their own host.

use url::Url;

use crate::error::ConfigError;
use crate::model::RegistryType;

/// Public npm registry root.
pub const DEFAULT_NPM_URL: &str = "https://registry.npmjs.org";

/// Public PyPI root.
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org";

/// Public NuGet V3 service index.
pub const DEFAULT_NUGET_URL: &str = "https://api.nuget.org/v3/index.json";

/// Process-wide registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    npm_base_url: Option<String>,
    pypi_base_url: Option<String>,
    nuget_base_url: Option<String>,
    enable_registry_validation: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            npm_base_url: None,
            pypi_base_url: None,
            nuget_base_url: None,
            enable_registry_validation: true,
        }
    }
}

impl RegistryConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkgclaim_core::{RegistryConfig, RegistryType};
    ///
    /// let config = RegistryConfig::builder()
    ///     .npm_base_url("https://npm.internal.example.com")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(
    ///     config.override_for(RegistryType::Npm),
    ///     Some("https://npm.internal.example.com")
    /// );
    /// ```
    #[must_use]
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }

    /// Returns the operator override for a registry, if one is set.
    #[must_use]
    pub fn override_for(&self, registry: RegistryType) -> Option<&str> {
        match registry {
            RegistryType::Npm => self.npm_base_url.as_deref(),
            RegistryType::Pypi => self.pypi_base_url.as_deref(),
            RegistryType::Nuget => self.nuget_base_url.as_deref(),
            RegistryType::Oci | RegistryType::Mcpb => None,
        }
    }

    /// Returns true if packages should be checked against their origin.
    #[must_use]
    pub const fn registry_validation_enabled(&self) -> bool {
        self.enable_registry_validation
    }
}

/// Builder for [`RegistryConfig`].
#[derive(Debug, Clone)]
pub struct RegistryConfigBuilder {
    npm_base_url: Option<String>,
    pypi_base_url: Option<String>,
    nuget_base_url: Option<String>,
    enable_registry_validation: bool,
}

impl Default for RegistryConfigBuilder {
    fn default() -> Self {
        Self {
            npm_base_url: None,
            pypi_base_url: None,
            nuget_base_url: None,
            enable_registry_validation: true,
        }
    }
}

impl RegistryConfigBuilder {
    /// Overrides the npm registry root. An empty value means the default.
    #[must_use]
    pub fn npm_base_url(mut self, url: impl Into<String>) -> Self {
        self.npm_base_url = Some(url.into());
        self
    }

    /// Overrides the PyPI root. An empty value means the default.
    #[must_use]
    pub fn pypi_base_url(mut self, url: impl Into<String>) -> Self {
        self.pypi_base_url = Some(url.into());
        self
    }

    /// Overrides the NuGet service index. An empty value means the default.
    #[must_use]
    pub fn nuget_base_url(mut self, url: impl Into<String>) -> Self {
        self.nuget_base_url = Some(url.into());
        self
    }

    /// Enables or disables origin checks.
    #[must_use]
    pub const fn enable_registry_validation(mut self, enabled: bool) -> Self {
        self.enable_registry_validation = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if an override is set but is
    /// not an absolute `http` or `https` URL with a host.
    pub fn build(self) -> Result<RegistryConfig, ConfigError> {
        Ok(RegistryConfig {
            npm_base_url: check_override(RegistryType::Npm, self.npm_base_url)?,
            pypi_base_url: check_override(RegistryType::Pypi, self.pypi_base_url)?,
            nuget_base_url: check_override(RegistryType::Nuget, self.nuget_base_url)?,
            enable_registry_validation: self.enable_registry_validation,
        })
    }
}

fn check_override(
    registry: RegistryType,
    value: Option<String>,
) -> Result<Option<String>, ConfigError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        registry,
        url: value.clone(),
        reason,
    };

    let parsed = Url::parse(&value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert!(config.registry_validation_enabled());
        for registry in RegistryType::ALL {
            assert_eq!(config.override_for(registry), None);
        }
    }

    #[test]
    fn test_builder_overrides() {
        let config = RegistryConfig::builder()
            .npm_base_url("https://npm.example.com")
            .pypi_base_url("https://pypi.example.com")
            .nuget_base_url("https://nuget.example.com/v3/index.json")
            .enable_registry_validation(false)
            .build()
            .unwrap();

        assert_eq!(
            config.override_for(RegistryType::Npm),
            Some("https://npm.example.com")
        );
        assert_eq!(
            config.override_for(RegistryType::Pypi),
            Some("https://pypi.example.com")
        );
        assert_eq!(
            config.override_for(RegistryType::Nuget),
            Some("https://nuget.example.com/v3/index.json")
        );
        assert!(!config.registry_validation_enabled());
    }

    #[test]
    fn test_empty_override_is_unset() {
        let config = RegistryConfig::builder().npm_base_url("").build().unwrap();
        assert_eq!(config.override_for(RegistryType::Npm), None);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = RegistryConfig::builder()
            .pypi_base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidBaseUrl { registry: RegistryType::Pypi, .. }
        ));
    }

    #[test]
    fn test_non_http_override_rejected() {
        let err = RegistryConfig::builder()
            .npm_base_url("ftp://npm.example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }
}
