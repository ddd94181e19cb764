//! Client construction errors and transport error classification.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building an [`OriginClient`](crate::OriginClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to read a certificate file.
    #[error("File I/O error at {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A certificate could not be parsed.
    #[error("Invalid certificate: {message}")]
    InvalidCertificate {
        /// Error message.
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {source}")]
    BuildFailed {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
}

/// Describes a transport failure for an `OriginUnreachable` message.
pub(crate) fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else if err.is_redirect() {
        format!("too many redirects: {err}")
    } else {
        format!("request failed: {err}")
    }
}
