//! Scrape error taxonomy

use thiserror::Error;
use woog_client::ClientError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{0} not defined in environment")]
    MissingVariable(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The feed could not be retrieved
    #[error("couldn't retrieve feed: {0}")]
    Fetch(String),

    #[error("feed is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("{0} not present in feed")]
    MissingElement(&'static str),

    #[error("temperature value '{0}' is not a number")]
    InvalidTemperature(String),

    #[error("timestamp '{0}' is not a valid millisecond epoch")]
    InvalidTimestamp(String),

    /// The backend did not store the reading
    #[error("failed to put reading to {url}: {source}")]
    Upload {
        url: String,
        #[source]
        source: ClientError,
    },
}
