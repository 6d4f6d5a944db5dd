//! # Roomcast Server
//!
//! Room-scoped realtime message relay.
//!
//! ## Running
//!
//! ```bash
//! roomcast
//!
//! # Override the listen address
//! ROOMCAST_PORT=8080 ROOMCAST_HOST=0.0.0.0 roomcast
//! ```

mod config;
mod handlers;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing first so config failures are visible
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roomcast_server=debug,roomcast_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load()?;

    tracing::info!("Roomcast starting on {}:{}", config.host, config.port);

    // Metric descriptions before anything records
    metrics::init_metrics();

    handlers::run_server(config).await?;

    Ok(())
}
