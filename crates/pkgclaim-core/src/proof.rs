//! Ownership proof policy.
//!
//! A package authenticates a server name claim if and only if its own
//! published metadata, fetched from its origin, carries a proof value exactly
//! equal to the claimed name. Checkers only extract candidate values; the
//! comparison happens in [`verify_ownership`] and nowhere else.

use crate::error::{Result, ValidationError};
use crate::model::{RegistryType, ServerNameClaim};

/// Marker introducing a server name in a package README.
pub const README_MARKER: &str = "mcp-name:";

/// OCI label and annotation key carrying the server name.
pub const OCI_SERVER_NAME_LABEL: &str = "io.modelcontextprotocol.server.name";

/// npm `package.json` field carrying the server name.
pub const NPM_PROOF_FIELD: &str = "mcpName";

/// MCPB `manifest.json` field carrying the server name.
pub const MCPB_PROOF_FIELD: &str = "mcp_name";

/// The proof value(s) a checker found in package metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipProof {
    /// No proof value was published.
    Absent,
    /// Exactly one distinct value was published.
    Declared(String),
    /// Several distinct values were published.
    Conflicting(Vec<String>),
}

impl OwnershipProof {
    /// Builds a proof from candidate values.
    ///
    /// Empty candidates are ignored and identical duplicates collapse, so
    /// only distinct non-empty values decide between the variants.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkgclaim_core::OwnershipProof;
    ///
    /// assert_eq!(OwnershipProof::from_candidates(Vec::<String>::new()), OwnershipProof::Absent);
    /// assert_eq!(
    ///     OwnershipProof::from_candidates(["acme/foo", "acme/foo"]),
    ///     OwnershipProof::Declared("acme/foo".to_string())
    /// );
    /// ```
    pub fn from_candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = Vec::new();
        for candidate in candidates {
            let candidate = candidate.into();
            if !candidate.is_empty() && !values.contains(&candidate) {
                values.push(candidate);
            }
        }

        match values.len() {
            0 => Self::Absent,
            1 => Self::Declared(values.remove(0)),
            _ => Self::Conflicting(values),
        }
    }

    /// Builds a proof from an optional single field.
    #[must_use]
    pub fn from_field(value: Option<&str>) -> Self {
        Self::from_candidates(value)
    }

    fn describe(&self) -> String {
        match self {
            Self::Absent => "nothing".to_string(),
            Self::Declared(value) => format!("'{value}'"),
            Self::Conflicting(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
                format!("conflicting values {}", quoted.join(", "))
            }
        }
    }
}

/// Judges a proof against a claim.
///
/// Comparison is exact and case-sensitive. A conflicting proof never
/// authenticates, even when one of its values equals the claim.
///
/// # Errors
///
/// - [`ValidationError::ProofMissing`] when no proof was published.
/// - [`ValidationError::ProofMismatch`] when the proof differs or conflicts.
pub fn verify_ownership(
    proof: &OwnershipProof,
    claim: &ServerNameClaim,
    registry: RegistryType,
    package: &str,
) -> Result<()> {
    match proof {
        OwnershipProof::Declared(value) if value == claim.as_str() => Ok(()),
        OwnershipProof::Absent => Err(ValidationError::ProofMissing {
            registry,
            package: package.to_string(),
            hint: proof_hint(registry, claim),
        }),
        OwnershipProof::Declared(_) | OwnershipProof::Conflicting(_) => {
            Err(ValidationError::ProofMismatch {
                registry,
                package: package.to_string(),
                expected: claim.as_str().to_string(),
                found: proof.describe(),
            })
        }
    }
}

/// Tells a publisher where to declare the proof for a registry.
#[must_use]
pub fn proof_hint(registry: RegistryType, claim: &ServerNameClaim) -> String {
    match registry {
        RegistryType::Npm => format!(
            "Add \"{NPM_PROOF_FIELD}\": \"{claim}\" to package.json and publish a new version."
        ),
        RegistryType::Pypi | RegistryType::Nuget => format!(
            "Add \"{README_MARKER} {claim}\" to the package README (an HTML comment works) and publish a new version."
        ),
        RegistryType::Oci => format!(
            "Add LABEL {OCI_SERVER_NAME_LABEL}=\"{claim}\" to the Dockerfile and push a new image."
        ),
        RegistryType::Mcpb => format!(
            "Add \"{MCPB_PROOF_FIELD}\": \"{claim}\" to the bundle's manifest.json."
        ),
    }
}

/// Extracts every server name declared with [`README_MARKER`].
///
/// The value is the token following the marker on the same line, with a
/// trailing `-->` removed so the marker can sit inside an HTML comment.
///
/// # Examples
///
/// ```
/// use pkgclaim_core::proof::readme_markers;
///
/// let readme = "# Foo\n<!-- mcp-name: io.github.acme/foo -->\n";
/// assert_eq!(readme_markers(readme), vec!["io.github.acme/foo".to_string()]);
/// ```
#[must_use]
pub fn readme_markers(text: &str) -> Vec<String> {
    let mut markers = Vec::new();
    let mut rest = text;

    while let Some(pos) = rest.find(README_MARKER) {
        rest = &rest[pos + README_MARKER.len()..];
        let value = rest.trim_start_matches([' ', '\t']);
        let end = value.find(char::is_whitespace).unwrap_or(value.len());
        let token = &value[..end];
        markers.push(token.strip_suffix("-->").unwrap_or(token).to_string());
    }

    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(name: &str) -> ServerNameClaim {
        ServerNameClaim::new(name).unwrap()
    }

    #[test]
    fn test_exact_match_succeeds() {
        let proof = OwnershipProof::Declared("acme/foo".to_string());
        assert!(verify_ownership(&proof, &claim("acme/foo"), RegistryType::Npm, "pkg").is_ok());
    }

    #[test]
    fn test_case_difference_is_mismatch() {
        let proof = OwnershipProof::Declared("Acme/Foo".to_string());
        let err = verify_ownership(&proof, &claim("acme/foo"), RegistryType::Npm, "pkg")
            .unwrap_err();
        assert!(matches!(err, ValidationError::ProofMismatch { .. }));
    }

    #[test]
    fn test_whitespace_is_not_trimmed() {
        let proof = OwnershipProof::Declared("acme/foo ".to_string());
        let err = verify_ownership(&proof, &claim("acme/foo"), RegistryType::Pypi, "pkg")
            .unwrap_err();
        assert!(matches!(err, ValidationError::ProofMismatch { .. }));
    }

    #[test]
    fn test_absent_is_missing_with_hint() {
        let err = verify_ownership(
            &OwnershipProof::Absent,
            &claim("acme/foo"),
            RegistryType::Oci,
            "ghcr.io/acme/foo",
        )
        .unwrap_err();

        match err {
            ValidationError::ProofMissing { hint, .. } => {
                assert!(hint.contains("LABEL io.modelcontextprotocol.server.name=\"acme/foo\""));
            }
            other => panic!("Expected ProofMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_values_never_match() {
        let proof = OwnershipProof::from_candidates(["acme/foo", "evil/foo"]);
        let err = verify_ownership(&proof, &claim("acme/foo"), RegistryType::Nuget, "Acme.Foo")
            .unwrap_err();

        match err {
            ValidationError::ProofMismatch { found, .. } => {
                assert_eq!(found, "conflicting values 'acme/foo', 'evil/foo'");
            }
            other => panic!("Expected ProofMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_from_candidates_ignores_empty() {
        assert_eq!(
            OwnershipProof::from_candidates(["", ""]),
            OwnershipProof::Absent
        );
        assert_eq!(OwnershipProof::from_field(Some("")), OwnershipProof::Absent);
        assert_eq!(OwnershipProof::from_field(None), OwnershipProof::Absent);
    }

    #[test]
    fn test_readme_markers_plain_and_comment() {
        let readme = "\
# Foo server

mcp-name: io.github.acme/foo

<!-- mcp-name: io.github.acme/foo-->
";
        assert_eq!(
            readme_markers(readme),
            vec!["io.github.acme/foo".to_string(), "io.github.acme/foo".to_string()]
        );
    }

    #[test]
    fn test_readme_marker_without_value() {
        let readme = "mcp-name:\nio.github.acme/foo";
        assert_eq!(readme_markers(readme), vec![String::new()]);
        assert_eq!(
            OwnershipProof::from_candidates(readme_markers(readme)),
            OwnershipProof::Absent
        );
    }

    #[test]
    fn test_readme_without_marker() {
        assert!(readme_markers("# Foo\n\nA server.").is_empty());
    }

    #[test]
    fn test_hint_per_registry() {
        let name = claim("acme/foo");
        assert!(proof_hint(RegistryType::Npm, &name).contains("\"mcpName\": \"acme/foo\""));
        assert!(proof_hint(RegistryType::Pypi, &name).contains("mcp-name: acme/foo"));
        assert!(proof_hint(RegistryType::Mcpb, &name).contains("\"mcp_name\": \"acme/foo\""));
    }
}
