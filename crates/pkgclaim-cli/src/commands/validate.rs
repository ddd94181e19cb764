//! Validate command implementation.
//!
//! Checks a single package, or every package of a `server.json`, against
//! its origin registry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use pkgclaim_core::{PackageReference, ServerSubmission};
use pkgclaim_registry::{
    OriginClient, OriginClientConfig, PackageOutcome, PackageValidator, ValidationContext,
};

use super::{OutputFormat, RegistryArgs};

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a server.json whose packages are validated against its name
    #[arg(long, conflicts_with_all = ["registry_type", "identifier", "server_name"])]
    pub server_json: Option<PathBuf>,

    /// Registry type of the package (npm, pypi, nuget, oci, mcpb)
    #[arg(long, required_unless_present = "server_json")]
    pub registry_type: Option<String>,

    /// Package identifier (name, image reference or bundle URL)
    #[arg(long, required_unless_present = "server_json")]
    pub identifier: Option<String>,

    /// Package version
    #[arg(long)]
    pub version: Option<String>,

    /// Expected SHA-256 of an MCPB bundle
    #[arg(long)]
    pub file_sha256: Option<String>,

    /// Server name the package must declare
    #[arg(long, required_unless_present = "server_json")]
    pub server_name: Option<String>,

    /// Deadline for the whole validation, in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Extra CA certificate (PEM) for private mirrors
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Additional host MCPB bundles may be downloaded from (repeatable)
    #[arg(long = "allow-bundle-host", value_name = "HOST")]
    pub allow_bundle_hosts: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Per-package result as printed in JSON output.
#[derive(Debug, Serialize)]
struct OutcomeReport<'a> {
    registry_type: &'a str,
    identifier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    retryable: bool,
}

impl<'a> From<&'a PackageOutcome> for OutcomeReport<'a> {
    fn from(outcome: &'a PackageOutcome) -> Self {
        let error = outcome.result.as_ref().err();
        Self {
            registry_type: &outcome.package.registry_type,
            identifier: &outcome.package.identifier,
            version: outcome.package.version(),
            valid: error.is_none(),
            error: error.map(ToString::to_string),
            retryable: error.is_some_and(pkgclaim_core::ValidationError::is_retryable),
        }
    }
}

/// Runs the validate command.
///
/// # Errors
///
/// Returns an error if:
/// - The submission or configuration is invalid
/// - Any package fails validation
pub async fn run(args: &ValidateArgs) -> Result<()> {
    let submission = load_submission(args)?;
    let config = args.registry.to_config()?;

    let client = OriginClient::new(client_config(args)).context("Failed to create origin client")?;
    let validator = PackageValidator::new(client);

    info!(
        server = %submission.name,
        packages = submission.packages.len(),
        timeout_secs = args.timeout,
        "Validating package ownership"
    );

    let ctx = ValidationContext::with_timeout(Duration::from_secs(args.timeout));
    let outcomes = validator
        .validate_submission(&ctx, &submission, &config)
        .await;

    match args.format {
        OutputFormat::Text => print_text(&submission, &outcomes),
        OutputFormat::Json => {
            let reports: Vec<OutcomeReport<'_>> = outcomes.iter().map(OutcomeReport::from).collect();
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_valid()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} packages failed validation", outcomes.len());
    }
    Ok(())
}

fn client_config(args: &ValidateArgs) -> OriginClientConfig {
    let mut config = OriginClientConfig::new();
    if let Some(ref ca_cert) = args.ca_cert {
        config = config.with_ca_cert(ca_cert);
    }
    for host in &args.allow_bundle_hosts {
        config = config.allow_bundle_host(host);
    }
    config
}

/// Builds the submission from a `server.json` file or the single-package flags.
fn load_submission(args: &ValidateArgs) -> Result<ServerSubmission> {
    if let Some(ref path) = args.server_json {
        return read_server_json(path);
    }

    let (Some(registry_type), Some(identifier), Some(server_name)) = (
        args.registry_type.as_ref(),
        args.identifier.as_ref(),
        args.server_name.as_ref(),
    ) else {
        anyhow::bail!("--registry-type, --identifier and --server-name are required");
    };

    let mut package = PackageReference::new(registry_type, identifier);
    if let Some(ref version) = args.version {
        package = package.with_version(version);
    }
    if let Some(ref digest) = args.file_sha256 {
        package = package.with_file_sha256(digest);
    }

    Ok(ServerSubmission {
        name: server_name.clone(),
        packages: vec![package],
    })
}

fn read_server_json(path: &Path) -> Result<ServerSubmission> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let submission = ServerSubmission::from_json(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if submission.packages.is_empty() {
        anyhow::bail!("{} declares no packages", path.display());
    }
    Ok(submission)
}

fn print_text(submission: &ServerSubmission, outcomes: &[PackageOutcome]) {
    println!("pkgclaim Ownership Validator");
    println!("============================");
    println!("Server: {}", submission.name);
    println!();

    for outcome in outcomes {
        println!("{}", render_outcome(outcome));
    }

    let valid = outcomes.iter().filter(|o| o.is_valid()).count();
    println!("\n{valid}/{} packages verified", outcomes.len());
}

/// One line per package; transient failures are marked as worth retrying.
fn render_outcome(outcome: &PackageOutcome) -> String {
    let package = &outcome.package;
    let label = match package.version() {
        Some(version) => format!("{} {}@{version}", package.registry_type, package.identifier),
        None => format!("{} {}", package.registry_type, package.identifier),
    };

    match outcome.result {
        Ok(()) => format!("✓ {label}"),
        Err(ref e) if e.is_retryable() => format!("✗ {label}: {e} (try again)"),
        Err(ref e) => format!("✗ {label}: {e}"),
    }
}
