//! Woog backend endpoints

use reqwest::Client;
use tracing::debug;
use woog_core::domain::reading::WaterReading;

use crate::error::Result;
use crate::{handle_empty_response, join_url};

/// Path of the temperature endpoint, `{}` is replaced with the lake UUID
pub const DEFAULT_TEMPERATURE_PATH: &str = "lake/{}/temperature";

/// Header carrying the backend API key
const API_KEY_HEADER: &str = "X-ApiKey";

/// HTTP client for the woog backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// Base URL of the backend (e.g., "https://api.woog.life")
    base_url: String,
    /// Temperature path template
    temperature_path: String,
    client: Client,
}

impl BackendClient {
    /// Create a new backend client using the default temperature path
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new backend client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature_path: DEFAULT_TEMPERATURE_PATH.to_string(),
            client,
        }
    }

    /// Overrides the temperature path template
    pub fn with_temperature_path(mut self, path: impl Into<String>) -> Self {
        self.temperature_path = path.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the temperature endpoint for a lake
    pub fn temperature_url(&self, lake_uuid: &str) -> String {
        let path = self.temperature_path.replacen("{}", lake_uuid, 1);
        join_url(&self.base_url, &path)
    }

    /// Stores a water reading for a lake
    ///
    /// # Arguments
    /// * `lake_uuid` - The lake the reading belongs to
    /// * `api_key` - Backend API key, sent in the `X-ApiKey` header
    /// * `reading` - The measurement to store
    pub async fn put_temperature(
        &self,
        lake_uuid: &str,
        api_key: &str,
        reading: &WaterReading,
    ) -> Result<()> {
        let url = self.temperature_url(lake_uuid);
        debug!("Sending {:?} to {}", reading, url);

        let response = self
            .client
            .put(&url)
            .header(API_KEY_HEADER, api_key)
            .json(reading)
            .send()
            .await?;

        debug!("Backend responded with status {}", response.status());
        handle_empty_response(response).await
    }
}
