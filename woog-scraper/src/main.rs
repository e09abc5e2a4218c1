//! Woog Scraper
//!
//! Reads the current water temperature of the large Woog from the sensor
//! gateway and stores it in the woog backend.
//!
//! Architecture:
//! - Configuration: explicit struct built from the CronJob's environment
//! - Feed: XML parsing of the gateway document
//! - Scraper: fetch, parse, upload
//!
//! Runs once per CronJob firing. Any failure exits with status 1 so the
//! Job records it.

mod config;
mod error;
mod feed;
mod scraper;

use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::scraper::Scraper;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "woog_scraper=debug,woog_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Scrape failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: feed_url={}, backend_url={}, lake={}",
        config.feed_url, config.backend_url, config.lake_uuid
    );

    Scraper::new(&config).run().await?;
    Ok(())
}
