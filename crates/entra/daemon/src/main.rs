//! entrad - Entra ID governance controller
//!
//! Reconciles declared application registrations (with their service
//! principals) and security groups against Microsoft Entra ID, and serves a
//! REST API for declaring them.

use anyhow::Context;
use clap::Parser;
use entra_daemon::{DaemonConfig, Server};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// entrad CLI
#[derive(Parser)]
#[command(name = "entrad")]
#[command(about = "Entra ID governance controller", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ENTRAD_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "ENTRAD_LISTEN_ADDR")]
    listen: Option<SocketAddr>,

    /// Log level
    #[arg(long, env = "ENTRAD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ENTRAD_LOG_JSON")]
    json: bool,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
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
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        DaemonConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // CLI flags win over file and environment
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    init_tracing(&config.logging.level, config.logging.json);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        cloud = ?config.graph.cloud,
        "Starting entrad"
    );

    let server = Server::new(config).context("failed to build server")?;
    server.run().await.context("server failed")?;
    Ok(())
}
