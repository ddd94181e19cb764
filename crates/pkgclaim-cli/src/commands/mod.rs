//! CLI commands and argument parsing.

pub mod resolve;
pub mod validate;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use pkgclaim_core::RegistryConfig;

/// pkgclaim - MCP package ownership validation
#[derive(Parser)]
#[command(name = "pkgclaim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Validate package ownership against origin registries
    Validate(validate::ValidateArgs),

    /// Print the effective base URL of each registry
    Resolve(resolve::ResolveArgs),

    /// Print version information
    Version,
}

/// Registry origin settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// npm registry base URL override
    #[arg(long, env = "MCP_REGISTRY_CUSTOM_REGISTRY_NPM_URL")]
    pub npm_url: Option<String>,

    /// PyPI base URL override
    #[arg(long, env = "MCP_REGISTRY_CUSTOM_REGISTRY_PYPI_URL")]
    pub pypi_url: Option<String>,

    /// NuGet V3 service index URL override
    #[arg(long, env = "MCP_REGISTRY_CUSTOM_REGISTRY_NUGET_URL")]
    pub nuget_url: Option<String>,

    /// Check packages against their origin registries
    #[arg(
        long,
        env = "MCP_REGISTRY_ENABLE_REGISTRY_VALIDATION",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_registry_validation: bool,
}

impl RegistryArgs {
    /// Builds the registry configuration.
    pub fn to_config(&self) -> Result<RegistryConfig> {
        let mut builder =
            RegistryConfig::builder().enable_registry_validation(self.enable_registry_validation);

        if let Some(ref url) = self.npm_url {
            builder = builder.npm_base_url(url);
        }
        if let Some(ref url) = self.pypi_url {
            builder = builder.pypi_base_url(url);
        }
        if let Some(ref url) = self.nuget_url {
            builder = builder.nuget_base_url(url);
        }

        builder.build().context("Invalid registry configuration")
    }
}

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
