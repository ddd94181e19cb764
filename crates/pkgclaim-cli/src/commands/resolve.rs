//! Resolve command implementation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use pkgclaim_core::{resolve_base_url, RegistryConfig, RegistryType};

use super::{OutputFormat, RegistryArgs};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ResolvedOrigin {
    registry_type: RegistryType,
    base_url: Option<String>,
    overridden: bool,
}

/// Runs the resolve command.
///
/// # Errors
///
/// Returns an error if an override is not a valid URL.
pub fn run(args: &ResolveArgs) -> Result<()> {
    let config = args.registry.to_config()?;
    let origins = resolve_all(&config);

    match args.format {
        OutputFormat::Text => {
            for origin in &origins {
                let url = origin
                    .base_url
                    .as_deref()
                    .unwrap_or("(derived from package identifier)");
                let marker = if origin.overridden { " (override)" } else { "" };
                println!("{:<6} {url}{marker}", origin.registry_type);
            }
            if !config.registry_validation_enabled() {
                println!("\n⚠ Registry validation is disabled");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&origins)?),
    }

    Ok(())
}

fn resolve_all(config: &RegistryConfig) -> Vec<ResolvedOrigin> {
    RegistryType::ALL
        .into_iter()
        .map(|registry_type| ResolvedOrigin {
            registry_type,
            base_url: resolve_base_url(registry_type, config).map(str::to_string),
            overridden: config.override_for(registry_type).is_some(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_all_defaults() {
        let origins = resolve_all(&RegistryConfig::default());

        assert_eq!(origins.len(), 5);
        assert_eq!(
            origins[0].base_url.as_deref(),
            Some("https://registry.npmjs.org")
        );
        assert!(origins.iter().all(|o| !o.overridden));
        assert_eq!(origins[3].registry_type, RegistryType::Oci);
        assert_eq!(origins[3].base_url, None);
    }

    #[test]
    fn test_resolve_all_with_override() {
        let config = RegistryConfig::builder()
            .pypi_base_url("https://pypi.internal.example.com")
            .build()
            .unwrap();

        let pypi = resolve_all(&config)
            .into_iter()
            .find(|o| o.registry_type == RegistryType::Pypi)
            .unwrap();
        assert_eq!(
            pypi.base_url.as_deref(),
            Some("https://pypi.internal.example.com")
        );
        assert!(pypi.overridden);
    }
}
