//! Scraper configuration
//!
//! Built once at process start from the environment the CronJob injects
//! through `envFrom` (the `apikey` secret and the `lake-uuids` and
//! `scraper-config` config maps). Nothing else reads the environment.

use std::collections::HashMap;
use woog_client::DEFAULT_TEMPERATURE_PATH;

use crate::error::ScrapeError;

/// Sensor gateway serving the large Woog's XML feed
pub const DEFAULT_FEED_URL: &str = "https://woog.iot.service.itrm.de/?accesstoken=LQ8MXn";

/// Public woog backend
pub const DEFAULT_BACKEND_URL: &str = "https://api.woog.life";

/// Scraper configuration
#[derive(Clone)]
pub struct Config {
    /// XML feed with the current water temperature
    pub feed_url: String,

    /// Backend base URL (e.g., "https://api.woog.life")
    pub backend_url: String,

    /// Temperature path template, `{}` is replaced with the lake UUID
    pub backend_path: String,

    /// Lake the readings are stored for
    pub lake_uuid: String,

    /// Backend API key
    pub api_key: String,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - LARGE_WOOG_UUID (required)
    /// - API_KEY (required)
    /// - WOOG_TEMPERATURE_URL (optional, default: the sensor gateway)
    /// - BACKEND_URL (optional, default: https://api.woog.life)
    /// - BACKEND_PATH (optional, default: lake/{}/temperature)
    pub fn from_env() -> Result<Self, ScrapeError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Creates configuration from an explicit variable map
    ///
    /// Empty values count as unset.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ScrapeError> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let lake_uuid = get("LARGE_WOOG_UUID")
            .ok_or(ScrapeError::MissingVariable("LARGE_WOOG_UUID"))?;
        let api_key = get("API_KEY").ok_or(ScrapeError::MissingVariable("API_KEY"))?;

        Ok(Self {
            feed_url: get("WOOG_TEMPERATURE_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            backend_url: get("BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            backend_path: get("BACKEND_PATH")
                .unwrap_or_else(|| DEFAULT_TEMPERATURE_PATH.to_string()),
            lake_uuid,
            api_key,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ScrapeError> {
        for (name, url) in [
            ("WOOG_TEMPERATURE_URL", &self.feed_url),
            ("BACKEND_URL", &self.backend_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ScrapeError::InvalidConfig(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        if !self.backend_path.contains("{}") {
            return Err(ScrapeError::InvalidConfig(
                "BACKEND_PATH must contain {} for the lake UUID".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed_url", &self.feed_url)
            .field("backend_url", &self.backend_url)
            .field("backend_path", &self.backend_path)
            .field("lake_uuid", &self.lake_uuid)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[
            ("LARGE_WOOG_UUID", "69c8438b"),
            ("API_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.backend_url, "https://api.woog.life");
        assert_eq!(config.backend_path, "lake/{}/temperature");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("LARGE_WOOG_UUID", "69c8438b"),
            ("API_KEY", "secret"),
            ("BACKEND_URL", "http://backend.wooglife.svc"),
            ("BACKEND_PATH", "v2/lake/{}/temperature"),
            ("WOOG_TEMPERATURE_URL", "http://feed.local/"),
        ]))
        .unwrap();

        assert_eq!(config.backend_url, "http://backend.wooglife.svc");
        assert_eq!(config.backend_path, "v2/lake/{}/temperature");
        assert_eq!(config.feed_url, "http://feed.local/");
    }

    #[test]
    fn test_required_variables() {
        let err = Config::from_vars(vars(&[("API_KEY", "secret")])).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingVariable("LARGE_WOOG_UUID")));

        let err = Config::from_vars(vars(&[("LARGE_WOOG_UUID", "69c8438b")])).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingVariable("API_KEY")));

        // Empty counts as missing
        let err = Config::from_vars(vars(&[("LARGE_WOOG_UUID", "x"), ("API_KEY", "")]))
            .unwrap_err();
        assert!(matches!(err, ScrapeError::MissingVariable("API_KEY")));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::from_vars(vars(&[
            ("LARGE_WOOG_UUID", "69c8438b"),
            ("API_KEY", "secret"),
        ]))
        .unwrap();

        config.backend_url = "api.woog.life".to_string();
        assert!(config.validate().is_err());

        config.backend_url = DEFAULT_BACKEND_URL.to_string();
        config.backend_path = "lake/temperature".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = Config::from_vars(vars(&[
            ("LARGE_WOOG_UUID", "69c8438b"),
            ("API_KEY", "secret"),
        ]))
        .unwrap();
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
