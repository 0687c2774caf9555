//! Sensor fetch and check-in, run in order after a template has been scanned

use crate::checkin::{CheckinClient, CheckinOutcome, Placeholders, UrlTemplate};
use crate::error::Error;
use crate::sensor::{LogSource, RetryPolicy, SensorReading, fetch_reading};

/// Milestones reported while a run makes progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress<'a> {
    /// Sensor polling is about to start
    FetchingReading,
    /// A reading was found
    Reading(&'a SensorReading),
    /// The resolved URL is about to be requested
    Sending(&'a str),
}

/// How a run ended. Every variant is a normal end of the program.
#[derive(Debug)]
pub enum RunOutcome {
    /// No template was scanned; nothing else ran
    NoTemplate,
    /// The sensor never produced a reading; no request was sent
    NoReading,
    /// The request failed in transport or returned a non-2xx status
    CheckinFailed {
        /// Resolved URL
        url: String,
        /// Reading that was sent
        reading: SensorReading,
        /// What went wrong
        error: Error,
    },
    /// The server answered with a 2xx status
    CheckedIn {
        /// Resolved URL
        url: String,
        /// Reading that was sent
        reading: SensorReading,
        /// Parsed or excerpted response
        outcome: CheckinOutcome,
    },
}

/// Everything needed to turn a template into a check-in
#[derive(Debug, Clone)]
pub struct CheckinRun {
    /// Value substituted for the team placeholder
    pub team: String,
    /// Tokens to substitute
    pub placeholders: Placeholders,
    /// Sensor retry budget
    pub retry: RetryPolicy,
    /// HTTP client for the scoring endpoint
    pub client: CheckinClient,
}

impl CheckinRun {
    /// Fetch a reading and report it against `template`.
    ///
    /// Each stage only starts when the previous one produced something.
    /// `on_progress` is called as stages complete.
    pub async fn run<F>(
        &self,
        template: Option<UrlTemplate>,
        log_source: &dyn LogSource,
        mut on_progress: F,
    ) -> RunOutcome
    where
        F: FnMut(Progress<'_>),
    {
        // An empty payload counts as no scan at all.
        let Some(template) = template.filter(|t| !t.is_empty()) else {
            return RunOutcome::NoTemplate;
        };

        let missing = template.missing_placeholders(&self.placeholders);
        if !missing.is_empty() {
            tracing::warn!(
                ?missing,
                template = template.as_str(),
                "Check-in URL lacks placeholders; sending it anyway"
            );
        }

        on_progress(Progress::FetchingReading);
        let Some(reading) = fetch_reading(log_source, &self.retry).await else {
            return RunOutcome::NoReading;
        };
        on_progress(Progress::Reading(&reading));

        let url = template.resolve(&self.placeholders, &self.team, &reading);
        on_progress(Progress::Sending(&url));

        match self.client.send(&url).await {
            Ok(outcome) => RunOutcome::CheckedIn {
                url,
                reading,
                outcome,
            },
            Err(error) => RunOutcome::CheckinFailed {
                url,
                reading,
                error,
            },
        }
    }
}
