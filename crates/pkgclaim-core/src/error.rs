//! Error types for package-ownership validation.
//!
//! Every failure a validation call can produce is one variant of
//! [`ValidationError`]. Checkers map transport and parse failures into these
//! variants before returning, so callers only ever see this taxonomy.

use thiserror::Error;

use crate::model::RegistryType;

/// Result type alias using [`ValidationError`] as the error type.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors that can occur while validating a package ownership claim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The registry type is not one of the recognized variants.
    #[error("unsupported registry type: {registry_type}")]
    UnsupportedRegistryType {
        /// The offending registry type, as received.
        registry_type: String,
    },

    /// The caller supplied an unusable claim or package reference.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Reason the input is invalid.
        reason: String,
    },

    /// The origin registry confirmed the package does not exist.
    #[error("{registry} package '{package}' not found")]
    PackageNotFound {
        /// Registry that was queried.
        registry: RegistryType,
        /// Package identifier as claimed.
        package: String,
    },

    /// The origin could not be reached or answered with a non-success status.
    #[error("{registry} registry unreachable while fetching '{package}': {reason}")]
    OriginUnreachable {
        /// Registry that was queried.
        registry: RegistryType,
        /// Package identifier as claimed.
        package: String,
        /// Transport or status detail.
        reason: String,
    },

    /// The origin answered, but its metadata could not be interpreted.
    #[error("{registry} package '{package}' has unreadable metadata: {reason}")]
    InvalidMetadata {
        /// Registry that was queried.
        registry: RegistryType,
        /// Package identifier as claimed.
        package: String,
        /// Parse failure detail.
        reason: String,
    },

    /// The package metadata carries no ownership proof.
    #[error("{registry} package '{package}' is missing its ownership proof. {hint}")]
    ProofMissing {
        /// Registry that was queried.
        registry: RegistryType,
        /// Package identifier as claimed.
        package: String,
        /// Where the publisher should declare the proof.
        hint: String,
    },

    /// The package metadata declares a different server name.
    #[error(
        "{registry} package ownership validation failed for '{package}': expected '{expected}', found {found}"
    )]
    ProofMismatch {
        /// Registry that was queried.
        registry: RegistryType,
        /// Package identifier as claimed.
        package: String,
        /// The claimed server name.
        expected: String,
        /// Rendering of the proof value(s) actually published.
        found: String,
    },

    /// A downloaded bundle does not match its declared SHA-256 digest.
    #[error("checksum mismatch for '{package}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Bundle URL.
        package: String,
        /// Declared digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// The caller's deadline elapsed or the call was cancelled.
    #[error("validation of {registry} package '{package}' was cancelled or timed out")]
    CancelledOrTimedOut {
        /// Registry that was being queried.
        registry: RegistryType,
        /// Package identifier as claimed.
        package: String,
    },
}

/// Fieldless classification of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ValidationError::UnsupportedRegistryType`].
    UnsupportedRegistryType,
    /// See [`ValidationError::InvalidInput`].
    InvalidInput,
    /// See [`ValidationError::PackageNotFound`].
    PackageNotFound,
    /// See [`ValidationError::OriginUnreachable`].
    OriginUnreachable,
    /// See [`ValidationError::InvalidMetadata`].
    InvalidMetadata,
    /// See [`ValidationError::ProofMissing`].
    ProofMissing,
    /// See [`ValidationError::ProofMismatch`].
    ProofMismatch,
    /// See [`ValidationError::ChecksumMismatch`].
    ChecksumMismatch,
    /// See [`ValidationError::CancelledOrTimedOut`].
    CancelledOrTimedOut,
}

impl ValidationError {
    /// Creates an [`ValidationError::InvalidInput`] error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedRegistryType { .. } => ErrorKind::UnsupportedRegistryType,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::PackageNotFound { .. } => ErrorKind::PackageNotFound,
            Self::OriginUnreachable { .. } => ErrorKind::OriginUnreachable,
            Self::InvalidMetadata { .. } => ErrorKind::InvalidMetadata,
            Self::ProofMissing { .. } => ErrorKind::ProofMissing,
            Self::ProofMismatch { .. } => ErrorKind::ProofMismatch,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::CancelledOrTimedOut { .. } => ErrorKind::CancelledOrTimedOut,
        }
    }

    /// Returns true if repeating the validation later may succeed.
    ///
    /// Only transient origin failures and cancellations are retryable; every
    /// other kind means the submission itself is wrong.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::OriginUnreachable { .. } | Self::CancelledOrTimedOut { .. }
        )
    }
}

/// Errors raised while building a [`RegistryConfig`](crate::RegistryConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A base URL override is not an absolute http(s) URL.
    #[error("invalid {registry} base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// Registry the override was set for.
        registry: RegistryType,
        /// The rejected value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}
