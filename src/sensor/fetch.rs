//! Bounded retry around a [`LogSource`]

use crate::sensor::{LogSource, SensorReading, parse_reading};
use std::time::Duration;

/// How hard to try before giving up on the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of fetches, including the first one
    pub max_attempts: u32,
    /// Pause between two consecutive fetches
    pub retry_delay: Duration,
    /// Upper bound on a single fetch
    pub command_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(300),
            command_timeout: Duration::from_secs(2),
        }
    }
}

/// Poll `source` until a reading shows up or `policy.max_attempts` run out.
///
/// The hub prints sensor lines with some lag, so an empty window right after
/// start-up is normal. Every failure (adb error, timeout, no match, bad
/// number) is logged and costs one attempt. Returns `None` once all attempts
/// are used up.
pub async fn fetch_reading(source: &dyn LogSource, policy: &RetryPolicy) -> Option<SensorReading> {
    for attempt in 1..=policy.max_attempts {
        match tokio::time::timeout(policy.command_timeout, source.fetch()).await {
            Ok(Ok(text)) => match parse_reading(&text) {
                Ok(Some(reading)) => {
                    tracing::info!(attempt, %reading, "Sensor reading found");
                    return Some(reading);
                }
                Ok(None) => tracing::debug!(attempt, "No sensor line in log window"),
                Err(err) => tracing::warn!(attempt, "Error reading sensor: {err}"),
            },
            Ok(Err(err)) => tracing::warn!(attempt, "Error reading sensor: {err}"),
            Err(_) => tracing::warn!(
                attempt,
                timeout_ms = policy.command_timeout.as_millis() as u64,
                "Timed out waiting for {}",
                source.describe()
            ),
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    tracing::warn!(
        attempts = policy.max_attempts,
        "No sensor reading from {}",
        source.describe()
    );
    None
}
