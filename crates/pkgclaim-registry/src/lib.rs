//! # pkgclaim Registry
//!
//! Origin registry checkers for MCP package ownership claims.
//!
//! A server that lists a package in its `server.json` must prove the package
//! is really its own: the package's published metadata has to name the
//! server. This crate fetches that metadata from the package's origin
//! registry and hands the proof to [`pkgclaim_core::verify_ownership`].
//!
//! ## Features
//!
//! - **Five registries**: npm, PyPI, NuGet, OCI images and MCP bundles
//! - **Typed failures**: not-found, unreachable and proof failures stay
//!   distinct so callers know what is worth retrying
//! - **Bounded calls**: a [`ValidationContext`] deadline or cancellation
//!   abandons in-flight requests
//! - **No retries**: transient failures are reported, never retried
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pkgclaim_core::{PackageReference, RegistryConfig, ServerNameClaim};
//! use pkgclaim_registry::{OriginClient, OriginClientConfig, PackageValidator, ValidationContext};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let validator = PackageValidator::new(OriginClient::new(OriginClientConfig::new())?);
//!     let ctx = ValidationContext::with_timeout(Duration::from_secs(10));
//!
//!     let package = PackageReference::new("pypi", "acme-mcp-foo").with_version("1.0.0");
//!     let claim = ServerNameClaim::new("io.github.acme/foo")?;
//!     validator
//!         .validate(&ctx, &package, &claim, &RegistryConfig::default())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PackageValidator                         │
//! │   registry type ──► resolve_base_url ──► OwnershipChecker   │
//! │  ┌──────┐ ┌──────┐ ┌───────┐ ┌──────┐ ┌──────┐              │
//! │  │ npm  │ │ pypi │ │ nuget │ │ oci  │ │ mcpb │              │
//! │  └──────┘ └──────┘ └───────┘ └──────┘ └──────┘              │
//! │                 OriginClient + ValidationContext            │
//! └─────────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Origin registries                        │
//! │   (npmjs.org, pypi.org, nuget.org, OCI registries, HTTPS)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod checker;
mod client;
mod config;
mod context;
mod error;
mod mcpb;
mod npm;
mod nuget;
mod oci;
mod pypi;
mod reference;
mod validator;

pub use checker::{OwnershipChecker, PackageScope};
pub use client::OriginClient;
pub use config::{OriginClientConfig, DEFAULT_BUNDLE_HOSTS, DEFAULT_MAX_BUNDLE_BYTES};
pub use context::ValidationContext;
pub use error::ClientError;
pub use mcpb::McpbChecker;
pub use npm::NpmChecker;
pub use nuget::NugetChecker;
pub use oci::{BearerChallenge, Descriptor, ImageConfig, Manifest, MediaType, OciChecker};
pub use pypi::PypiChecker;
pub use reference::ImageReference;
pub use validator::{PackageOutcome, PackageValidator};
