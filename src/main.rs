//! account-gateway
//!
//! A reverse proxy that forwards the caller's account to upstream services.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                   ACCOUNT GATEWAY                    │
//!                         │                                                      │
//!     Client Request      │  ┌──────────┐   ┌───────────┐   ┌──────────────┐     │
//!     ────────────────────┼─▶│  http    │──▶│  account  │──▶│   routing    │     │
//!                         │  │  server  │   │  attach   │   │   engine     │     │
//!                         │  └──────────┘   └───────────┘   └──────┬───────┘     │
//!                         │                                        │             │
//!                         │                                        ▼             │
//!                         │                 ┌─────────────────────────────────┐  │
//!                         │                 │ filter chain (pre → route)      │  │
//!                         │                 │  forwarded-account  (order 0)   │  │
//!                         │                 │  forwarded-headers  (order 5)   │  │
//!                         │                 └───────────────┬─────────────────┘  │
//!                         │                                 │                    │
//!     Client Response     │  ┌──────────┐   ┌───────────┐   ▼                    │
//!     ◀───────────────────┼──│ response │◀──│   http    │◀──── upstream ◀────────┼──── Upstream
//!                         │  └──────────┘   │  client   │                        │     Service
//!                         │                 └───────────┘                        │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use account_gateway::config::{load_config, ProxyConfig};
use account_gateway::lifecycle::startup;
use account_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "account-gateway")]
#[command(about = "Reverse proxy that forwards the caller's account upstream", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if cli.check {
        println!("configuration ok");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("account-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        accounts = config.accounts.len(),
        header = %config.forwarded_account.header_name,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
