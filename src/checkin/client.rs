//! HTTP client for the scoring endpoint

use crate::checkin::CheckinOutcome;
use crate::config::CheckinOptions;
use crate::error::{Error, Result};
use reqwest::header::USER_AGENT;
use std::time::Duration;

/// Sends a single GET per check-in. Nothing is retried.
#[derive(Debug, Clone)]
pub struct CheckinClient {
    http: reqwest::Client,
    user_agent: String,
    excerpt_chars: usize,
}

impl CheckinClient {
    /// Build the client from the `[checkin]` options
    pub fn new(options: &CheckinOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            user_agent: options.user_agent.clone(),
            excerpt_chars: options.excerpt_chars,
        })
    }

    /// GET `url` and classify the response.
    ///
    /// Connection failures, timeouts and non-2xx statuses are returned as
    /// [`Error::Transport`]; the body of a failed response is never read.
    pub async fn send(&self, url: &str) -> Result<CheckinOutcome> {
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, bytes = body.len(), "Check-in response received");

        Ok(CheckinOutcome::from_body(&body, self.excerpt_chars))
    }
}
