//! media-relay server binary
//!
//! Configuration comes from the environment (see [`media_relay::config`]);
//! log verbosity from `RUST_LOG` (default `info`).

use media_relay::{Config, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bind = %config.server.bind_address,
        temp_dir = %config.download.temp_dir.display(),
        max_concurrent = ?config.download.max_concurrent_downloads,
        "Starting media-relay"
    );

    run_with_shutdown(config).await?;
    Ok(())
}
