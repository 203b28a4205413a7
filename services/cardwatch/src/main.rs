//! Cardwatch CLI
//!
//! Command-line interface for the API documentation monitoring service.

use std::path::PathBuf;

use cardwatch::{load_config, Config};
use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cardwatch")]
#[command(about = "API documentation monitoring service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Backend base URL (overrides config file)
    #[arg(long)]
    backend_url: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(port) = args.port {
        config.dashboard.port = port;
    }
    if let Some(backend_url) = args.backend_url {
        config.backend_url = backend_url;
    }

    tracing::info!(
        "Starting cardwatch: backend {}, state dir {:?}",
        config.backend_url,
        config.state_dir
    );

    cardwatch::run(config).await?;

    Ok(())
}
