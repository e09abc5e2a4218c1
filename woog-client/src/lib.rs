//! Woog HTTP Clients
//!
//! Type-safe HTTP clients for the two remote APIs the woog tools talk to:
//! - The woog backend, which stores lake temperatures (used by the scraper job)
//! - The Telegram Bot API, which delivers release failure alerts
//!
//! # Example
//!
//! ```no_run
//! use woog_client::BackendClient;
//! use woog_core::domain::reading::WaterReading;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), woog_client::ClientError> {
//!     let client = BackendClient::new("https://api.woog.life");
//!     let reading = WaterReading {
//!         temperature: 21.5,
//!         time: "2021-06-01T12:00:00".to_string(),
//!     };
//!
//!     client.put_temperature("lake-uuid", "api-key", &reading).await?;
//!     Ok(())
//! }
//! ```

mod backend;
pub mod error;
mod telegram;

// Re-export commonly used types
pub use backend::{BackendClient, DEFAULT_TEMPERATURE_PATH};
pub use error::{ClientError, Result};
pub use telegram::{DEFAULT_TELEGRAM_URL, SentMessage, TelegramClient};

use serde::de::DeserializeOwned;

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response whose body is not needed
async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}

/// Joins a base URL and a path with exactly one slash between them
fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
