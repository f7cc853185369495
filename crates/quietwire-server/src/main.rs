//! Quietwire relay server binary.
//!
//! # Usage
//!
//! ```bash
//! quietwire-server --bind 0.0.0.0:9000
//! quietwire-server --bind 0.0.0.0:9000 --heartbeat-secs 15 --log-level debug
//! ```

use std::time::Duration;

use clap::Parser;
use quietwire_server::{Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Quietwire relay server
#[derive(Parser, Debug)]
#[command(name = "quietwire-server")]
#[command(about = "End-to-end encrypted message relay")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:9000")]
    bind: String,

    /// Seconds between heartbeat pings
    #[arg(long, default_value = "30")]
    heartbeat_secs: u64,

    /// Maximum raw frame size in bytes
    #[arg(long, default_value = "131072")]
    max_frame_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Quietwire relay starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerConfig {
        bind_address: args.bind,
        heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
        max_frame_bytes: args.max_frame_bytes,
        ..ServerConfig::default()
    };

    let server = Server::bind(config).await?;

    tracing::info!("Relay listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
