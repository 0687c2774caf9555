//! Check-in URL templates and the outcome of reporting a reading

mod client;

pub use client::CheckinClient;

use crate::sensor::SensorReading;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status reported when the server's JSON has no `status` field
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Literal tokens replaced in the scanned URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholders {
    /// Replaced by the team name
    pub team: String,
    /// Replaced by the temperature, two decimals
    pub temperature: String,
    /// Replaced by the humidity, two decimals
    pub humidity: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            team: "YOUR_TEAM".to_string(),
            temperature: "FILL_HERE".to_string(),
            humidity: "FILL_THERE".to_string(),
        }
    }
}

/// URL read from the QR code, still containing placeholder tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Wrap a scanned payload. No validation happens here.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The template text as scanned
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the payload carries nothing but whitespace
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Tokens from `placeholders` that never occur in the template.
    ///
    /// A missing token is not fatal: the check-in is still sent, just with
    /// whatever the template contained.
    pub fn missing_placeholders<'a>(&self, placeholders: &'a Placeholders) -> Vec<&'a str> {
        [
            &placeholders.team,
            &placeholders.temperature,
            &placeholders.humidity,
        ]
        .into_iter()
        .filter(|token| !self.0.contains(token.as_str()))
        .map(String::as_str)
        .collect()
    }

    /// Substitute team, temperature and humidity, in that order.
    ///
    /// Every occurrence of each token is replaced. Readings are written with
    /// exactly two decimals.
    pub fn resolve(
        &self,
        placeholders: &Placeholders,
        team: &str,
        reading: &SensorReading,
    ) -> String {
        self.0
            .replace(&placeholders.team, team)
            .replace(
                &placeholders.temperature,
                &format!("{:.2}", reading.temperature),
            )
            .replace(&placeholders.humidity, &format!("{:.2}", reading.humidity))
    }
}

/// What the scoring server said about a check-in that got a 2xx response
#[derive(Debug, Clone, PartialEq)]
pub enum CheckinOutcome {
    /// The body was JSON
    Structured {
        /// `status` field of the body, or [`UNKNOWN_STATUS`]
        status: String,
        /// Full parsed body
        body: Value,
    },
    /// The body was not JSON; only its first characters are kept
    Unstructured {
        /// Leading characters of the body
        excerpt: String,
    },
}

impl CheckinOutcome {
    /// Classify a successful response body
    pub fn from_body(text: &str, excerpt_chars: usize) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(body) => {
                let status = match body.get("status") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => UNKNOWN_STATUS.to_string(),
                };
                CheckinOutcome::Structured { status, body }
            }
            Err(_) => CheckinOutcome::Unstructured {
                excerpt: excerpt(text, excerpt_chars),
            },
        }
    }
}

/// First `max_chars` characters of `text`, never splitting a character
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
