//! HTTP client shared by all registry checkers.
//!
//! Every request goes through the caller's [`ValidationContext`], and every
//! failure is mapped into the validation error taxonomy here, so checkers
//! never see a raw `reqwest` error.

use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use pkgclaim_core::Result;

use crate::checker::PackageScope;
use crate::config::OriginClientConfig;
use crate::context::ValidationContext;
use crate::error::{describe_transport_error, ClientError};

/// Read-only HTTP client for origin registries.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct OriginClient {
    config: OriginClientConfig,
    http: reqwest::Client,
}

impl OriginClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA certificate cannot be loaded or the HTTP
    /// client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pkgclaim_registry::{OriginClient, OriginClientConfig};
    ///
    /// let client = OriginClient::new(OriginClientConfig::new())?;
    /// # Ok::<(), pkgclaim_registry::ClientError>(())
    /// ```
    pub fn new(config: OriginClientConfig) -> std::result::Result<Self, ClientError> {
        let http = Self::build_http_client(&config)?;
        Ok(Self { config, http })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &OriginClientConfig {
        &self.config
    }

    /// Starts a GET request.
    pub(crate) fn request(&self, url: &str) -> RequestBuilder {
        self.http.get(url)
    }

    /// Sends a request without interpreting its status.
    pub(crate) async fn send(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        request: RequestBuilder,
    ) -> Result<Response> {
        let request = request
            .build()
            .map_err(|e| scope.invalid_input(format!("cannot build request: {e}")))?;
        let url = request.url().clone();

        debug!(
            registry = %scope.registry,
            package = scope.package,
            url = %url,
            "Fetching from origin"
        );

        let response = ctx
            .guard(scope, self.http.execute(request))
            .await?
            .map_err(|e| scope.unreachable(describe_transport_error(&e)))?;

        debug!(url = %url, status = %response.status(), "Origin responded");
        Ok(response)
    }

    /// Fetches a package document. 404 and 410 mean the package does not exist.
    pub(crate) async fn get(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        url: &str,
        accept: &str,
    ) -> Result<Response> {
        let response = self
            .send(ctx, scope, self.request(url).header(ACCEPT, accept))
            .await?;
        package_status(scope, response)
    }

    /// Fetches an origin-level resource, such as a service index.
    ///
    /// Any non-success status means the origin is unusable, not that the
    /// package is missing.
    pub(crate) async fn get_origin_resource(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        url: &str,
        accept: &str,
    ) -> Result<Response> {
        let response = self
            .send(ctx, scope, self.request(url).header(ACCEPT, accept))
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(scope.unreachable(format!("{url} answered HTTP {}", response.status())))
        }
    }

    /// Reads and parses a JSON body.
    pub(crate) async fn read_json<T: DeserializeOwned>(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        response: Response,
    ) -> Result<T> {
        let body = ctx
            .guard(scope, response.bytes())
            .await?
            .map_err(|e| scope.unreachable(describe_transport_error(&e)))?;

        serde_json::from_slice(&body)
            .map_err(|e| scope.invalid_metadata(format!("malformed JSON document: {e}")))
    }

    /// Reads a text body.
    pub(crate) async fn read_text(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        response: Response,
    ) -> Result<String> {
        ctx.guard(scope, response.text())
            .await?
            .map_err(|e| scope.unreachable(describe_transport_error(&e)))
    }

    /// Reads a binary body of at most `limit` bytes.
    pub(crate) async fn read_bytes(
        &self,
        ctx: &ValidationContext,
        scope: &PackageScope<'_>,
        mut response: Response,
        limit: u64,
    ) -> Result<Vec<u8>> {
        let too_large = || scope.invalid_metadata(format!("file exceeds {limit} bytes"));

        if response.content_length().is_some_and(|len| len > limit) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = ctx
            .guard(scope, response.chunk())
            .await?
            .map_err(|e| scope.unreachable(describe_transport_error(&e)))?
        {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(
        config: &OriginClientConfig,
    ) -> std::result::Result<reqwest::Client, ClientError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if let Some(ref ca_cert) = config.ca_cert {
            let cert_pem = std::fs::read(ca_cert).map_err(|e| ClientError::IoError {
                path: ca_cert.clone(),
                source: e,
            })?;
            let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                ClientError::InvalidCertificate {
                    message: format!("{}: {e}", ca_cert.display()),
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| ClientError::BuildFailed { source: e })
    }
}

/// Maps a package document response status into the taxonomy.
pub(crate) fn package_status(scope: &PackageScope<'_>, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        Err(scope.not_found())
    } else {
        Err(scope.unreachable(format!("HTTP {status}")))
    }
}

/// Appends percent-encoded path segments to `base`.
///
/// A `/` inside a segment is encoded, so `@scope/name` stays one segment.
pub(crate) fn join_url(scope: &PackageScope<'_>, base: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| scope.invalid_input(format!("invalid base URL '{base}': {e}")))?;

    url.path_segments_mut()
        .map_err(|()| scope.invalid_input(format!("base URL '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgclaim_core::RegistryType;

    fn scope() -> PackageScope<'static> {
        PackageScope::new(RegistryType::Npm, "@acme/mcp-server-foo")
    }

    #[test]
    fn test_client_creation() {
        let client = OriginClient::new(OriginClientConfig::new());
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_missing_ca_cert() {
        let config = OriginClientConfig::new().with_ca_cert("/nonexistent/ca.pem");
        let err = OriginClient::new(config).unwrap_err();
        assert!(matches!(err, ClientError::IoError { .. }));
    }

    #[test]
    fn test_join_url_encodes_scoped_name() {
        let url = join_url(
            &scope(),
            "https://registry.npmjs.org",
            &["@acme/mcp-server-foo", "1.0.0"],
        )
        .unwrap();
        assert_eq!(url, "https://registry.npmjs.org/@acme%2Fmcp-server-foo/1.0.0");
    }

    #[test]
    fn test_join_url_keeps_base_path() {
        let url = join_url(&scope(), "https://mirror.example.com/npm/", &["foo", "latest"])
            .unwrap();
        assert_eq!(url, "https://mirror.example.com/npm/foo/latest");
    }

    #[test]
    fn test_join_url_rejects_garbage_base() {
        let err = join_url(&scope(), "not a url", &["foo"]).unwrap_err();
        assert!(matches!(err, pkgclaim_core::ValidationError::InvalidInput { .. }));
    }
}
