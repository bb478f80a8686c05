//! impactd - volunteer matching and verification daemon

use anyhow::Context;
use clap::Parser;
use impact_service::{EngineConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// impactd CLI
#[derive(Parser)]
#[command(name = "impactd")]
#[command(about = "Volunteer matching and verification engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "IMPACT_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "IMPACT_LISTEN_ADDR")]
    listen: Option<String>,

    /// Catalog seed file, overrides the configuration file
    #[arg(long, env = "IMPACT_SEED")]
    seed: Option<String>,

    /// Log level
    #[arg(long, env = "IMPACT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "IMPACT_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .with_context(|| format!("invalid listen address: {}", listen))?;
    }
    if let Some(seed) = cli.seed {
        config.catalog.seed_path = Some(seed);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        "starting impactd"
    );

    let server = Server::new(config).await?;
    server.run().await?;
    Ok(())
}
