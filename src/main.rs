//! Warden server binary.
//!
//! ```text
//!     Client / front proxy
//!            │
//!            ▼
//!   ┌──────────────────┐    ┌──────────────┐    ┌───────────────────────┐
//!   │  http (context,  │───▶│ rules index  │───▶│ rule: authn → authz → │
//!   │  request id)     │    │ (ArcSwap)    │    │ mutators / on_error   │
//!   └──────────────────┘    └──────▲───────┘    └───────────┬───────────┘
//!            ▲                     │ publish                │
//!            │               ┌─────┴──────┐                 ▼
//!            │               │ reconciler │◀── events ── providers (file)
//!            │               └────────────┘
//!            └──── decision (200 + headers) / proxied response / error
//! ```

use std::path::PathBuf;

use clap::Parser;

use warden::config::load_config;
use warden::lifecycle::{self, signals, Shutdown};
use warden::observability::logging;

#[derive(Parser)]
#[command(name = "warden", version, about = "Identity-aware access decision engine")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "WARDEN_CONFIG", default_value = "warden.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        bind_address = %config.serve.bind_address,
        "warden starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    lifecycle::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
