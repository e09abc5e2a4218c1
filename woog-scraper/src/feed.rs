//! Sensor feed parsing
//!
//! The gateway answers with an XML document holding one element per sensor.
//! Only the first `Water_Temperature` element is read:
//!
//! ```xml
//! <Water_Temperature>
//!   <value>21.5</value>
//!   <ts>1622548800000</ts>
//! </Water_Temperature>
//! ```

use chrono::TimeZone;
use roxmltree::{Document, Node};
use woog_core::domain::reading::WaterReading;

use crate::error::ScrapeError;

const WATER_TEMPERATURE: &str = "Water_Temperature";
const VALUE: &str = "value";
const TIMESTAMP: &str = "ts";

/// Extracts the water reading from a feed document, rendering its time in `tz`
pub fn parse_reading<Tz: TimeZone>(xml: &str, tz: &Tz) -> Result<WaterReading, ScrapeError> {
    let document = Document::parse(xml)?;

    let element = find(document.root(), WATER_TEMPERATURE)
        .ok_or(ScrapeError::MissingElement(WATER_TEMPERATURE))?;

    let value = child_text(element, VALUE).ok_or(ScrapeError::MissingElement(VALUE))?;
    let temperature: f64 = value
        .parse()
        .ok()
        .filter(|t: &f64| t.is_finite())
        .ok_or_else(|| ScrapeError::InvalidTemperature(value.to_string()))?;

    let ts = child_text(element, TIMESTAMP).ok_or(ScrapeError::MissingElement(TIMESTAMP))?;
    let millis: i64 = ts
        .parse()
        .map_err(|_| ScrapeError::InvalidTimestamp(ts.to_string()))?;

    WaterReading::from_epoch_millis(temperature, millis, tz)
        .ok_or_else(|| ScrapeError::InvalidTimestamp(ts.to_string()))
}

/// First element named `name` below `node`, in document order
fn find<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text<'a>(element: Node<'a, '_>, name: &str) -> Option<&'a str> {
    find(element, name).map(|n| n.text().unwrap_or("").trim())
}
