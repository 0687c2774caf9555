//! qrcheckin entrypoint

#[cfg(not(feature = "camera"))]
compile_error!("qrcheckin requires the `camera` feature");

use anyhow::Context;
use clap::Parser;
use qrcheckin::output::{RenderedReport, Stage, render_checkin, render_failure};
use qrcheckin::{
    Camera, CheckinClient, CheckinConfig, CheckinRun, Progress, QrScanner, RunOutcome,
    StopSignal, UrlTemplate, camera, logging,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "qrcheckin",
    version,
    about = "Scan a check-in QR code and report the hub's latest sensor reading"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to qrcheckin.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override camera by name (takes precedence over config file)
    #[arg(long, value_name = "NAME")]
    device: Option<String>,

    /// Override camera by index (/dev/videoN)
    #[arg(long, value_name = "INDEX")]
    device_index: Option<usize>,

    /// Team name substituted into the check-in URL
    #[arg(long, value_name = "NAME")]
    team: Option<String>,

    /// Use this URL template instead of scanning a QR code
    #[arg(long, value_name = "URL")]
    template: Option<String>,

    /// Print the final report as JSON instead of human-readable text
    #[arg(long)]
    json: bool,

    /// List detected cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

struct Console {
    json: bool,
}

impl Console {
    /// Progress lines are suppressed in JSON mode so stdout stays parseable
    fn progress(&self, line: &str) {
        if !self.json {
            println!("{line}");
        }
    }

    fn report(&self, rendered: &RenderedReport) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&rendered.json)?);
        } else {
            for line in &rendered.human {
                println!("{line}");
            }
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_cameras {
        list_cameras();
        return Ok(());
    }

    let mut config = CheckinConfig::load(cli.config.as_deref())?;

    if let Some(ref name) = cli.device {
        config.camera.device_name = Some(name.clone());
        config.camera.device_index = None;
    }

    if let Some(index) = cli.device_index {
        config.camera.device_index = Some(index);
        config.camera.device_name = None;
    }

    if let Some(ref team) = cli.team {
        config.checkin.team_name = team.clone();
    }

    config.validate()?;
    logging::init(&config.logging)?;

    let console = Console { json: cli.json };

    let template = match cli.template {
        Some(url) => Some(url),
        None => scan_template(&config, &console).await,
    };
    let template = template.map(UrlTemplate::new).filter(|t| !t.is_empty());

    let run = CheckinRun {
        team: config.checkin.team_name.clone(),
        placeholders: config.checkin.placeholders.clone(),
        retry: config.sensor.retry_policy(),
        client: CheckinClient::new(&config.checkin).context("building HTTP client")?,
    };
    let log_source = config.sensor.log_source();
    info!(source = %log_source.describe(), retry = ?run.retry, "Sensor source ready");

    let outcome = run
        .run(template, log_source.as_ref(), |progress| match progress {
            Progress::FetchingReading => console.progress("Reading sensor data from hub..."),
            Progress::Reading(reading) => console.progress(&reading.to_string()),
            Progress::Sending(url) => console.progress(&format!("→ Sending: {url}")),
        })
        .await;

    let rendered = match &outcome {
        RunOutcome::NoTemplate => render_failure(Stage::Scan, "No QR detected, exiting."),
        RunOutcome::NoReading => render_failure(
            Stage::Sensor,
            "Could not read sensor data from hub after retries.",
        ),
        RunOutcome::CheckinFailed { error, .. } => {
            render_failure(Stage::Checkin, &error.to_string())
        }
        RunOutcome::CheckedIn {
            url,
            reading,
            outcome,
        } => render_checkin(url, reading, outcome),
    };
    console.report(&rendered)?;

    // Every stage failure is reported above; the exit status stays 0.
    Ok(())
}

/// Run the camera stage. Failures are printed and turn into "no template".
async fn scan_template(config: &CheckinConfig, console: &Console) -> Option<String> {
    let camera = match config.camera_config().and_then(Camera::open) {
        Ok(camera) => camera,
        Err(err) => {
            tracing::error!("Failed to open camera: {err}");
            console.progress(&format!("Camera error: {err}"));
            return None;
        }
    };

    let stop = StopSignal::new();
    let ctrl_c = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.trigger();
            }
        })
    };

    console.progress("Show the QR code to the webcam (Ctrl+C to cancel)...");
    let scanner = QrScanner::new(config.camera.poll_interval());
    let scanned = scanner.acquire(camera, &stop).await;
    ctrl_c.abort();

    match scanned {
        Ok(Some(url)) => {
            console.progress(&format!("QR detected:\n{url}"));
            Some(url)
        }
        Ok(None) => None,
        Err(err) => {
            tracing::error!("QR scan failed: {err}");
            console.progress(&format!("QR scan failed: {err}"));
            None
        }
    }
}

fn list_cameras() {
    match camera::list_devices() {
        Ok(devices) => {
            println!("Discovered cameras:");
            for dev in devices {
                println!("  [{}] {} ({})", dev.index, dev.name, dev.path);
            }
        }
        Err(err) => println!("{err}"),
    }
}
