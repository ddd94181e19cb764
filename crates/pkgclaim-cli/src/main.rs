//! pkgclaim CLI - checks that published packages belong to the MCP server claiming them.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pkgclaim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => commands::validate::run(&args).await,
        Commands::Resolve(args) => commands::resolve::run(&args),
        Commands::Version => {
            println!("pkgclaim {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
