//! # pkgclaim Core
//!
//! Core types for validating that a package published on an external
//! registry really belongs to the MCP server that claims it.
//!
//! This crate performs no I/O. It provides:
//!
//! - [`PackageReference`], [`ServerNameClaim`] and [`RegistryType`] - the
//!   inputs of a validation call
//! - [`RegistryConfig`] - operator overrides for npm, PyPI and NuGet origins
//! - [`resolve_base_url`] - override-or-default origin resolution
//! - [`OwnershipProof`] and [`verify_ownership`] - the single exact-match rule
//!   every registry checker defers to
//! - [`ValidationError`] - the failure taxonomy
//!
//! ## Example
//!
//! ```rust
//! use pkgclaim_core::{verify_ownership, OwnershipProof, RegistryType, ServerNameClaim};
//!
//! let claim = ServerNameClaim::new("io.github.acme/foo").unwrap();
//! let proof = OwnershipProof::from_field(Some("io.github.acme/foo"));
//!
//! assert!(verify_ownership(&proof, &claim, RegistryType::Npm, "@acme/mcp-server-foo").is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod model;
pub mod proof;
pub mod resolver;


// Re-export main types at crate root
pub use config::{RegistryConfig, RegistryConfigBuilder};
pub use error::{ConfigError, ErrorKind, Result, ValidationError};
pub use model::{PackageReference, RegistryType, ServerNameClaim, ServerSubmission};
pub use proof::{verify_ownership, OwnershipProof};
pub use resolver::{default_base_url, resolve_base_url};
