//! CORS gateway binary.
//!
//! ```text
//!  Browser ──▶ http::server ──▶ http::dispatch ──┬──▶ forward::upstream ──▶ Target
//!                                    │           └──▶ streaming (HLS) ────▶ CDN
//!                                    ▼
//!                    routing::target, security::policy
//! ```

use std::path::PathBuf;

use clap::Parser;

use cors_gateway::config::{load_config, GatewayOptions};
use cors_gateway::lifecycle::{signals, startup, Shutdown};
use cors_gateway::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "cors-gateway", version, about = "CORS gateway for browser clients")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "CORS_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayOptions::default(),
    };
    if let Some(bind) = cli.bind {
        options.listener.bind_address = bind;
    }

    logging::init_logging(&options.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cors-gateway starting");
    tracing::info!(
        config = ?cli.config,
        bind_address = %options.listener.bind_address,
        whitelist = options.access.origin_whitelist.len(),
        blacklist = options.access.origin_blacklist.len(),
        rate_limit = options.rate_limit.enabled,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    startup::start(options, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
