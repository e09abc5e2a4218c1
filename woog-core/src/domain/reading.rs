//! Water reading domain types

use chrono::{DateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// A lake temperature measurement as the backend stores it
///
/// Serialized as the body of the temperature upload:
/// `{"temperature": 21.3, "time": "2021-06-01T12:00:00"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterReading {
    pub temperature: f64,
    /// ISO-8601 local time without offset
    pub time: String,
}

impl WaterReading {
    /// Builds a reading from a millisecond epoch timestamp rendered in `tz`
    ///
    /// Returns None when the timestamp is outside the representable range.
    pub fn from_epoch_millis<Tz: TimeZone>(temperature: f64, millis: i64, tz: &Tz) -> Option<Self> {
        let utc = DateTime::from_timestamp_millis(millis)?;
        let local = utc.with_timezone(tz).naive_local();

        // Fraction as microseconds, omitted entirely when zero
        let format = if local.nanosecond() == 0 {
            "%Y-%m-%dT%H:%M:%S"
        } else {
            "%Y-%m-%dT%H:%M:%S%.6f"
        };

        Some(Self {
            temperature,
            time: local.format(format).to_string(),
        })
    }
}
