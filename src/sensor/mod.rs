//! Sensor readings pulled from the hub's log output
//!
//! The hub prints lines such as `temperature=23.41 humidity=56.02` under the
//! `SENSOR` log tag. [`LogSource`] fetches a window of that output,
//! [`parse_reading`] extracts the numbers and [`fetch_reading`] ties the two
//! together with a bounded number of retries.

mod fetch;
mod source;

pub use fetch::{RetryPolicy, fetch_reading};
pub use source::{AdbLogcat, AdbSensorFile, LogSource};

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

const TEMPERATURE_KEY: &str = "temperature=";
const HUMIDITY_KEY: &str = "humidity=";

/// One temperature/humidity sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorReading {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Temperature: {:.2}°C | Humidity: {:.2}%",
            self.temperature, self.humidity
        )
    }
}

/// Find the first `temperature=<n> humidity=<n>` pair in captured log text.
///
/// Numbers are runs of ASCII digits and dots, with at least one whitespace
/// character between the two fields. A newline counts, so the two-line file
/// format written by the robot matches as well. Returns `Ok(None)` when no
/// pair is present and `Err` when the first pair does not parse (`1.2.3`).
pub fn parse_reading(text: &str) -> Result<Option<SensorReading>> {
    let Some((temperature, humidity)) = text
        .match_indices(TEMPERATURE_KEY)
        .find_map(|(idx, _)| match_fields(&text[idx + TEMPERATURE_KEY.len()..]))
    else {
        return Ok(None);
    };

    let parse = |field: &str, value: &str| {
        value
            .parse::<f64>()
            .map_err(|e| Error::SensorParse(format!("{field}={value}: {e}")))
    };

    Ok(Some(SensorReading {
        temperature: parse("temperature", temperature)?,
        humidity: parse("humidity", humidity)?,
    }))
}

/// Match `<number><ws>+humidity=<number>` at the start of `rest`.
fn match_fields(rest: &str) -> Option<(&str, &str)> {
    let temperature = number_prefix(rest)?;
    let after = &rest[temperature.len()..];

    let gap: usize = after
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    if gap == 0 {
        return None;
    }

    let humidity = number_prefix(after[gap..].strip_prefix(HUMIDITY_KEY)?)?;
    Some((temperature, humidity))
}

fn number_prefix(s: &str) -> Option<&str> {
    let len = s
        .bytes()
        .take_while(|b| b.is_ascii_digit() || *b == b'.')
        .count();
    (len > 0).then(|| &s[..len])
}
