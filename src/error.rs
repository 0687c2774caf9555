//! Error types for check-in operations

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scanning, sensor polling and check-in dispatch
#[derive(Error, Debug)]
pub enum Error {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(String),

    /// Camera device not found
    #[error("Camera device not found: {0}")]
    CameraNotFound(String),

    /// Failed to capture frame from camera
    #[error("Frame capture failed: {0}")]
    FrameCapture(String),

    /// The device log facility could not be queried
    #[error("Log source error: {0}")]
    LogSource(String),

    /// A sensor line matched but its values were not valid numbers
    #[error("Malformed sensor reading: {0}")]
    SensorParse(String),

    /// Network, timeout or non-success status on the check-in request
    #[error("HTTP error: {0}")]
    Transport(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

// V4L errors are converted manually in camera module

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
