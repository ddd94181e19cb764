//! Package references, server name claims and registry types.
//!
//! These are the inputs of a validation call. They are immutable once built
//! and are never modified by a checker.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Package registries whose ownership proofs can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    /// The npm registry.
    Npm,
    /// The Python Package Index.
    Pypi,
    /// NuGet (V3 API).
    Nuget,
    /// OCI-compatible container registries.
    Oci,
    /// MCP bundle files (`.mcpb`) hosted at a URL.
    Mcpb,
}

impl RegistryType {
    /// All recognized registry types.
    pub const ALL: [Self; 5] = [Self::Npm, Self::Pypi, Self::Nuget, Self::Oci, Self::Mcpb];

    /// Returns the wire name of this registry type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pypi => "pypi",
            Self::Nuget => "nuget",
            Self::Oci => "oci",
            Self::Mcpb => "mcpb",
        }
    }

    /// Returns true if the origin of this registry is configurable.
    ///
    /// OCI references and bundle URLs name their own host.
    #[must_use]
    pub const fn has_configurable_origin(self) -> bool {
        matches!(self, Self::Npm | Self::Pypi | Self::Nuget)
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RegistryType {
    type Err = ValidationError;

    /// Parses a wire name. Matching is exact; `"NPM"` is not `npm`.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|registry| registry.as_str() == s)
            .ok_or_else(|| ValidationError::UnsupportedRegistryType {
                registry_type: s.to_string(),
            })
    }
}

/// A package entry of a server submission.
///
/// Field names follow the `server.json` package shape, so entries can be
/// deserialized straight from a submission document.
///
/// # Examples
///
/// ```
/// use pkgclaim_core::PackageReference;
///
/// let package = PackageReference::new("npm", "@acme/mcp-server-foo").with_version("1.0.0");
/// assert_eq!(package.version.as_deref(), Some("1.0.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReference {
    /// Registry type as submitted. Kept raw so unknown values can be reported.
    pub registry_type: String,

    /// Package name, image reference or bundle URL.
    pub identifier: String,

    /// Package version, when the registry metadata is version-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Hex SHA-256 of the bundle file (MCPB only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_sha256: Option<String>,

    /// Origin the submitter says the package lives on.
    ///
    /// Informational for npm, PyPI and NuGet: it must agree with the
    /// resolved origin, which is always the one queried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_base_url: Option<String>,
}

impl PackageReference {
    /// Creates a package reference without a version.
    #[must_use]
    pub fn new(registry_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            registry_type: registry_type.into(),
            identifier: identifier.into(),
            version: None,
            file_sha256: None,
            registry_base_url: None,
        }
    }

    /// Sets the package version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the expected bundle digest.
    #[must_use]
    pub fn with_file_sha256(mut self, digest: impl Into<String>) -> Self {
        self.file_sha256 = Some(digest.into());
        self
    }

    /// Sets the declared registry origin.
    #[must_use]
    pub fn with_registry_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.registry_base_url = Some(base_url.into());
        self
    }

    /// Returns the declared registry origin if one was given and is non-empty.
    #[must_use]
    pub fn registry_base_url(&self) -> Option<&str> {
        self.registry_base_url.as_deref().filter(|u| !u.is_empty())
    }

    /// Parses the registry type.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedRegistryType`] naming the raw
    /// value if it is not recognized.
    pub fn registry(&self) -> Result<RegistryType> {
        self.registry_type.parse()
    }

    /// Returns the version if one was given and is non-empty.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }
}

/// The server name a registrant claims, checked against the ownership proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerNameClaim(String);

impl ServerNameClaim {
    /// Creates a claim.
    ///
    /// The value is kept verbatim: no trimming or case folding.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInput`] if the name is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkgclaim_core::ServerNameClaim;
    ///
    /// assert!(ServerNameClaim::new("acme/foo").is_ok());
    /// assert!(ServerNameClaim::new("").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::invalid_input("server name must not be empty"));
        }
        Ok(Self(name))
    }

    /// Returns the claimed name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerNameClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ServerNameClaim {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

/// The part of a `server.json` document that package validation needs.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSubmission {
    /// Server name claimed by the submission.
    pub name: String,

    /// Packages declared by the submission.
    #[serde(default)]
    pub packages: Vec<PackageReference>,
}

impl ServerSubmission {
    /// Parses a submission from `server.json` text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInput`] if the document is not valid
    /// JSON or lacks a `name`.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ValidationError::invalid_input(format!("malformed server.json: {e}")))
    }

    /// Returns the server name as a claim.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInput`] if the name is empty.
    pub fn claim(&self) -> Result<ServerNameClaim> {
        ServerNameClaim::new(self.name.clone())
    }
}
