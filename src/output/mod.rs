//! Helpers for rendering the check-in report

use crate::checkin::CheckinOutcome;
use crate::sensor::SensorReading;
use serde_json::{Value, json};

/// Combined structured and human-readable representation of one run's result
#[derive(Debug, Clone)]
pub struct RenderedReport {
    /// Structured JSON representation suitable for scripting
    pub json: Value,
    /// Human-readable lines for terminal presentation
    pub human: Vec<String>,
}

/// Stage at which a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the QR code
    Scan,
    /// Polling the sensor log
    Sensor,
    /// Sending the check-in
    Checkin,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Sensor => "sensor",
            Stage::Checkin => "checkin",
        }
    }
}

/// Render a completed check-in.
pub fn render_checkin(
    url: &str,
    reading: &SensorReading,
    outcome: &CheckinOutcome,
) -> RenderedReport {
    let mut human = Vec::new();

    let response = match outcome {
        CheckinOutcome::Structured { status, body } => {
            human.push(format!("Server response: {body}"));
            human.push(format!("Status: {status}"));
            json!({ "status": status, "body": body })
        }
        CheckinOutcome::Unstructured { excerpt } => {
            human.push("Server did not return valid JSON:".to_string());
            human.push(excerpt.clone());
            json!({ "status": Value::Null, "raw_excerpt": excerpt })
        }
    };

    RenderedReport {
        json: json!({
            "ok": true,
            "url": url,
            "reading": reading,
            "response": response,
        }),
        human,
    }
}

/// Render a run that stopped at `stage`.
pub fn render_failure(stage: Stage, message: &str) -> RenderedReport {
    RenderedReport {
        json: json!({
            "ok": false,
            "stage": stage.label(),
            "error": message,
        }),
        human: vec![message.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> SensorReading {
        SensorReading {
            temperature: 23.4,
            humidity: 56.78,
        }
    }

    #[test]
    fn structured_report() {
        let outcome = CheckinOutcome::Structured {
            status: "OK".to_string(),
            body: json!({"status": "OK"}),
        };
        let report = render_checkin("http://h/Meeral/23.40/56.78", &reading(), &outcome);

        assert_eq!(report.human, [r#"Server response: {"status":"OK"}"#, "Status: OK"]);
        assert_eq!(report.json["response"]["status"], "OK");
        assert_eq!(report.json["reading"]["humidity"], 56.78);
    }

    #[test]
    fn unstructured_report() {
        let outcome = CheckinOutcome::Unstructured {
            excerpt: "<html>busy</html>".to_string(),
        };
        let report = render_checkin("http://h", &reading(), &outcome);

        assert_eq!(report.human[0], "Server did not return valid JSON:");
        assert_eq!(report.json["response"]["raw_excerpt"], "<html>busy</html>");
        assert!(report.json["response"]["status"].is_null());
    }

    #[test]
    fn failure_report() {
        let report = render_failure(Stage::Sensor, "no reading");
        assert_eq!(report.json["ok"], false);
        assert_eq!(report.json["stage"], "sensor");
    }
}
