//! qrcheckin - report a sensor reading to a URL scanned from a QR code
//!
//! A field check-in happens in three steps:
//!
//! - **Scan**: read frames from a webcam until a QR code yields the check-in
//!   URL template ([`scan`], [`camera`], [`qr`])
//! - **Sense**: poll the hub's log over `adb` for the latest
//!   `temperature=… humidity=…` line, with a small retry budget ([`sensor`])
//! - **Report**: fill the template and send one GET ([`checkin`])
//!
//! [`pipeline::CheckinRun`] runs the last two steps in order once a template
//! is known.
//!
//! # Example
//!
//! ```no_run
//! use qrcheckin::{CheckinConfig, QrScanner, StopSignal, camera::Camera};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CheckinConfig::load(None)?;
//!     let camera = Camera::open(config.camera_config()?)?;
//!
//!     let scanner = QrScanner::new(config.camera.poll_interval());
//!     if let Some(url) = scanner.acquire(camera, &StopSignal::new()).await? {
//!         println!("Scanned: {url}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod checkin;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod qr;
pub mod scan;
pub mod sensor;

#[cfg(feature = "camera")]
#[cfg_attr(docsrs, doc(cfg(feature = "camera")))]
pub mod camera;

// Re-exports for convenience
pub use error::{Error, Result};

#[cfg(feature = "camera")]
pub use camera::{Camera, CameraConfig, CameraDevice};

pub use checkin::{CheckinClient, CheckinOutcome, Placeholders, UrlTemplate};
pub use config::{
    CameraOptions, CheckinConfig, CheckinOptions, LogRotation, LoggingOptions, SensorOptions,
    SensorSource,
};
pub use pipeline::{CheckinRun, Progress, RunOutcome};
pub use qr::{QrDecoder, QrPayload};
pub use scan::{FrameSource, QrScanner, StopSignal};
pub use sensor::{LogSource, RetryPolicy, SensorReading};
