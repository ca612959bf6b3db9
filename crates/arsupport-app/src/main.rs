use std::time::Instant;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;

/// Used when `RUST_LOG` is unset: our crates at info, dependencies at warn.
const DEFAULT_FILTER: &str = "warn,arsupport_app=info,arsupport_peer=info,arsupport_replay=info";

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG=arsupport_protocol=debug shows every decoded message,
    // arsupport_replay=trace every placed point.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    info!("arsupport-demo {} starting", env!("CARGO_PKG_VERSION"));
    let started = Instant::now();

    let result = app::run().await;
    match &result {
        Ok(()) => info!("Session replayed in {:.2?}", started.elapsed()),
        Err(e) => error!("Demo aborted after {:.2?}: {:#}", started.elapsed(), e),
    }
    result
}
