//! Configuration for the outbound origin client.

use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound on a downloaded bundle archive (50 MiB).
pub const DEFAULT_MAX_BUNDLE_BYTES: u64 = 50 * 1024 * 1024;

/// Hosts MCP bundles may be downloaded from unless configured otherwise.
pub const DEFAULT_BUNDLE_HOSTS: [&str; 2] = ["github.com", "gitlab.com"];

/// Configuration for [`OriginClient`](crate::OriginClient).
#[derive(Debug, Clone)]
pub struct OriginClientConfig {
    /// Per-request timeout. The caller's deadline still bounds the whole call.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Largest bundle archive that will be downloaded.
    pub max_bundle_bytes: u64,

    /// Extra CA certificate (PEM) trusted for private mirrors.
    pub ca_cert: Option<PathBuf>,

    /// Hosts bundle URLs may point at. Matching is exact and ignores case.
    pub allowed_bundle_hosts: Vec<String>,
}

impl Default for OriginClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginClientConfig {
    /// Creates a configuration with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkgclaim_registry::OriginClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = OriginClientConfig::new();
    /// assert_eq!(config.timeout, Duration::from_secs(30));
    /// assert!(config.user_agent.starts_with("pkgclaim/"));
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("pkgclaim/{}", env!("CARGO_PKG_VERSION")),
            max_bundle_bytes: DEFAULT_MAX_BUNDLE_BYTES,
            ca_cert: None,
            allowed_bundle_hosts: DEFAULT_BUNDLE_HOSTS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the bundle size limit.
    #[must_use]
    pub const fn with_max_bundle_bytes(mut self, max: u64) -> Self {
        self.max_bundle_bytes = max;
        self
    }

    /// Trusts an extra CA certificate.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Replaces the bundle host allow-list.
    #[must_use]
    pub fn with_allowed_bundle_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_bundle_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a host to the bundle allow-list.
    #[must_use]
    pub fn allow_bundle_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_bundle_hosts.push(host.into());
        self
    }

    /// Returns true if bundles may be downloaded from `host`.
    #[must_use]
    pub fn is_bundle_host_allowed(&self, host: &str) -> bool {
        self.allowed_bundle_hosts
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(host))
    }
}
