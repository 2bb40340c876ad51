//! leadgate — request security and delivery backend.
//!
//! # Architecture Overview
//!
//! ```text
//! POST /api/lead | /api/contact
//!     → origin gate → CSRF pair → bounded body parse
//!     → schema validation → rate limiter (Redis, local fallback)
//!     → mail dispatch (HTTP provider, SMTP fallback, per-attempt timeout)
//!     → signed download grant cookie
//!     → deterministic security headers
//!
//! GET /api/download/{kind}  — grant-gated asset
//! GET /health               — liveness
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use leadgate::config::loader::load_config;
use leadgate::observability::{logging, metrics};
use leadgate::{AppConfig, HttpServer};

#[derive(Parser, Debug)]
#[command(name = "leadgate", about = "Lead-capture security and delivery backend")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            tracing::warn!("No config file given; running with defaults");
            AppConfig::default()
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        shared_store = config.rate_limit.redis_url.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
