//! connscope: reports the transport a client's request arrived on.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                      CONNSCOPE                       │
//!                        │                                                      │
//!     Client Request     │  ┌──────────┐   ┌──────────┐   ┌──────────────────┐  │
//!     ───────────────────┼─▶│   net    │──▶│   http   │──▶│      probe       │  │
//!                        │  │ acceptor │   │ handler  │   │ acquire/extract  │  │
//!                        │  └──────────┘   └──────────┘   └────────┬─────────┘  │
//!                        │                                         │            │
//!     JSON report        │                 ┌──────────┐            │            │
//!     ◀──────────────────┼─────────────────│  report  │◀───────────┘            │
//!                        │                 └──────────┘                         │
//!                        │                                                      │
//!                        │  ┌────────────────────────────────────────────────┐  │
//!                        │  │ config │ observability │ lifecycle             │  │
//!                        │  └────────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use connscope::config::load_config;
use connscope::lifecycle::startup;
use connscope::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "connscope", version, about = "Connection introspection service")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    init_logging(&config.observability);

    tracing::info!("connscope v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        strategy = %config.probe.strategy,
        mss_fallback = config.probe.mss_fallback,
        "Configuration loaded"
    );

    startup::run(config).await?;
    Ok(())
}
