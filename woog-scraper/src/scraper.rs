//! Scrape run
//!
//! One invocation fetches the feed, extracts the reading and stores it.
//! Nothing is retried; the CronJob schedules the next attempt.

use chrono::{Local, TimeZone};
use reqwest::Client;
use tracing::{debug, info};
use woog_client::BackendClient;
use woog_core::domain::reading::WaterReading;

use crate::config::Config;
use crate::error::ScrapeError;
use crate::feed::parse_reading;

pub struct Scraper {
    client: Client,
    feed_url: String,
    backend: BackendClient,
    lake_uuid: String,
    api_key: String,
}

impl Scraper {
    pub fn new(config: &Config) -> Self {
        let client = Client::new();
        let backend = BackendClient::with_client(config.backend_url.clone(), client.clone())
            .with_temperature_path(config.backend_path.clone());

        Self {
            client,
            feed_url: config.feed_url.clone(),
            backend,
            lake_uuid: config.lake_uuid.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Fetches the raw feed document
    pub async fn fetch_feed(&self) -> Result<String, ScrapeError> {
        debug!("Requesting {}", self.feed_url);

        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| ScrapeError::Fetch(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch(format!("gateway responded with {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Fetch(e.without_url().to_string()))?;
        debug!("{}", body);

        Ok(body)
    }

    /// Stores a reading for the configured lake
    pub async fn upload(&self, reading: &WaterReading) -> Result<(), ScrapeError> {
        self.backend
            .put_temperature(&self.lake_uuid, &self.api_key, reading)
            .await
            .map_err(|source| ScrapeError::Upload {
                url: self.backend.temperature_url(&self.lake_uuid),
                source,
            })
    }

    /// Runs one scrape with times rendered in the host's local zone
    pub async fn run(&self) -> Result<WaterReading, ScrapeError> {
        self.run_in(&Local).await
    }

    /// Runs one scrape with times rendered in `tz`
    pub async fn run_in<Tz: TimeZone>(&self, tz: &Tz) -> Result<WaterReading, ScrapeError> {
        let body = self.fetch_feed().await?;
        let reading = parse_reading(&body, tz)?;
        debug!("Parsed reading: {:?}", reading);

        self.upload(&reading).await?;
        info!(
            "Stored {} °C at {} for lake {}",
            reading.temperature, reading.time, self.lake_uuid
        );

        Ok(reading)
    }
}
