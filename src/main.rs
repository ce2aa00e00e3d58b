use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use clementine::config::Config;
use clementine::logging::init_tracing;
use clementine::server::{self, AppState};
use clementine::upstream::UpstreamClient;

#[derive(Parser, Debug)]
#[command(name = "clementine", about = "NFT market-data aggregation and scoring API")]
struct Cli {
    /// TOML config file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override server.bind_addr
    #[arg(long)]
    bind: Option<String>,
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    let _guard = init_tracing(&config.logging)?;

    info!("🍊 Clementine - NFT Market Data Service");
    info!("======================================");

    config.validate()?;
    let addr = config.bind_socket()?;

    let client = UpstreamClient::new(&config.upstream)?;
    info!(base_url = %config.upstream.base_url, max_pages = config.pagination.max_pages, "Upstream client ready");
    let state = AppState::new(Arc::new(client), config.pagination.max_pages);

    server::run(addr, state, shutdown_signal()).await?;

    info!("✅ Clementine shutdown complete");
    Ok(())
}
