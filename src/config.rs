//! Runtime configuration handling
//!
//! Values come from, in increasing priority: built-in defaults, a TOML/YAML
//! file, `QRCHECKIN_*` environment variables, then command line flags (applied
//! by the binary).

use crate::camera::{CameraConfig, PixelFormat};
use crate::checkin::Placeholders;
use crate::error::{Error, Result};
use crate::sensor::{AdbLogcat, AdbSensorFile, LogSource, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinConfig {
    /// Camera used to read the QR code
    pub camera: CameraOptions,
    /// Where and how persistently to look for sensor readings
    pub sensor: SensorOptions,
    /// Check-in request settings
    pub checkin: CheckinOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl CheckinConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrcheckin.toml / qrcheckin.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrcheckin.toml", "qrcheckin.yaml", "qrcheckin.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrcheckin");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.camera.apply_env_overrides();
        self.sensor.apply_env_overrides();
        self.checkin.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// Reject settings that would make a run pointless or misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.sensor.max_attempts == 0 {
            return Err(Error::Config("sensor.max_attempts must be at least 1".into()));
        }
        if self.sensor.lines == 0 {
            return Err(Error::Config("sensor.lines must be at least 1".into()));
        }
        for (name, value) in [
            ("camera.poll_interval_ms", self.camera.poll_interval_ms),
            ("camera.capture_timeout_ms", self.camera.capture_timeout_ms.unwrap_or(1)),
            ("sensor.command_timeout_ms", self.sensor.command_timeout_ms),
            ("checkin.timeout_secs", self.checkin.timeout_secs),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.checkin.team_name.trim().is_empty() {
            return Err(Error::Config("checkin.team_name must not be empty".into()));
        }
        let placeholders = &self.checkin.placeholders;
        for (name, token) in [
            ("team", &placeholders.team),
            ("temperature", &placeholders.temperature),
            ("humidity", &placeholders.humidity),
        ] {
            if token.is_empty() {
                return Err(Error::Config(format!(
                    "checkin.placeholders.{name} must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// Produce a fully resolved camera configuration ready to open the V4L2 device.
    pub fn camera_config(&self) -> Result<CameraConfig> {
        self.camera.to_camera_config()
    }
}

/// User-friendly camera overrides that are merged on top of `CameraConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Override for the numeric camera index (e.g. `/dev/video2`).
    pub device_index: Option<usize>,
    /// Override for the camera name substring match.
    pub device_name: Option<String>,
    /// Override for desired frame width in pixels.
    pub width: Option<u32>,
    /// Override for desired frame height in pixels.
    pub height: Option<u32>,
    /// Override for desired frames per second.
    pub fps: Option<u32>,
    /// Override for pixel format string (mjpeg/yuyv/rgb24).
    pub format: Option<String>,
    /// Override for number of V4L2 buffers to allocate.
    pub buffer_count: Option<u32>,
    /// Override for the per-frame capture timeout in milliseconds.
    pub capture_timeout_ms: Option<u64>,
    /// Pause between frames that carry no usable QR code, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            device_index: None,
            device_name: None,
            width: None,
            height: None,
            fps: None,
            format: None,
            buffer_count: None,
            capture_timeout_ms: None,
            poll_interval_ms: 30,
        }
    }
}

impl CameraOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("QRCHECKIN_CAMERA_DEVICE") {
            self.device_name = Some(name);
            self.device_index = None;
        }
        if let Ok(index) = env::var("QRCHECKIN_CAMERA_INDEX") {
            if let Ok(parsed) = index.parse::<usize>() {
                self.device_index = Some(parsed);
                self.device_name = None;
            }
        }
        if let Ok(width) = env::var("QRCHECKIN_CAMERA_WIDTH") {
            self.width = width.parse::<u32>().ok();
        }
        if let Ok(height) = env::var("QRCHECKIN_CAMERA_HEIGHT") {
            self.height = height.parse::<u32>().ok();
        }
        if let Ok(fps) = env::var("QRCHECKIN_CAMERA_FPS") {
            self.fps = fps.parse::<u32>().ok();
        }
        if let Ok(format) = env::var("QRCHECKIN_CAMERA_FORMAT") {
            self.format = Some(format);
        }
    }

    /// Merge overrides onto the default camera configuration.
    pub fn to_camera_config(&self) -> Result<CameraConfig> {
        let mut config = CameraConfig::default();

        if let Some(name) = &self.device_name {
            config.device_name = Some(name.clone());
            config.device_index = None;
        }

        if let Some(index) = self.device_index {
            config.device_index = Some(index);
            if self.device_name.is_none() {
                config.device_name = None;
            }
        }

        if let Some(width) = self.width {
            config.width = width;
        }

        if let Some(height) = self.height {
            config.height = height;
        }

        if let Some(fps) = self.fps {
            config.fps = fps.max(1);
        }

        if let Some(timeout) = self.capture_timeout_ms {
            config.capture_timeout_ms = timeout;
        }

        if let Some(format) = &self.format {
            config.format = PixelFormat::parse(format).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown pixel format '{}'. Use mjpeg, yuyv, or rgb24",
                    format
                ))
            })?;
        }

        if let Some(buffers) = self.buffer_count {
            config.buffer_count = buffers.max(2);
        }

        Ok(config)
    }

    /// Pause between frames as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Which device-side facility carries the readings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorSource {
    /// Tail of `adb logcat`, filtered by tag
    #[default]
    Logcat,
    /// A file on the device read with `adb shell cat`
    File,
}

impl SensorSource {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "logcat" => Some(Self::Logcat),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Sensor polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorOptions {
    /// Where readings are read from
    pub source: SensorSource,
    /// adb executable
    pub adb_path: PathBuf,
    /// Device serial when more than one device is attached
    pub serial: Option<String>,
    /// Log tag the hub prints readings under
    pub tag: String,
    /// How many log entries to request per attempt
    pub lines: usize,
    /// Device file for the `file` source
    pub file_path: String,
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Time limit on one adb invocation, in milliseconds
    pub command_timeout_ms: u64,
}

impl Default for SensorOptions {
    fn default() -> Self {
        Self {
            source: SensorSource::Logcat,
            adb_path: PathBuf::from("adb"),
            serial: None,
            tag: "SENSOR".to_string(),
            lines: 5,
            file_path: "/sdcard/sensor_data.txt".to_string(),
            max_attempts: 5,
            retry_delay_ms: 300,
            command_timeout_ms: 2000,
        }
    }
}

impl SensorOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(source) = env::var("QRCHECKIN_SENSOR_SOURCE") {
            if let Some(parsed) = SensorSource::parse(&source) {
                self.source = parsed;
            }
        }
        if let Ok(adb) = env::var("QRCHECKIN_ADB") {
            self.adb_path = PathBuf::from(adb);
        }
        if let Ok(serial) = env::var("ANDROID_SERIAL") {
            if !serial.trim().is_empty() {
                self.serial = Some(serial);
            }
        }
        if let Ok(tag) = env::var("QRCHECKIN_SENSOR_TAG") {
            self.tag = tag;
        }
        if let Ok(attempts) = env::var("QRCHECKIN_SENSOR_ATTEMPTS") {
            if let Ok(parsed) = attempts.parse::<u32>() {
                self.max_attempts = parsed;
            }
        }
    }

    /// Retry budget for [`fetch_reading`](crate::sensor::fetch_reading)
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            command_timeout: Duration::from_millis(self.command_timeout_ms),
        }
    }

    /// Build the configured log source
    pub fn log_source(&self) -> Box<dyn LogSource> {
        match self.source {
            SensorSource::Logcat => Box::new(AdbLogcat {
                adb_path: self.adb_path.clone(),
                serial: self.serial.clone(),
                lines: self.lines,
                tag: self.tag.clone(),
            }),
            SensorSource::File => Box::new(AdbSensorFile {
                adb_path: self.adb_path.clone(),
                serial: self.serial.clone(),
                path: self.file_path.clone(),
            }),
        }
    }
}

/// Check-in request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinOptions {
    /// Name substituted for the team placeholder
    pub team_name: String,
    /// `User-Agent` header sent with the request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Characters of a non-JSON body to show
    pub excerpt_chars: usize,
    /// Tokens replaced in the scanned URL
    pub placeholders: Placeholders,
}

impl Default for CheckinOptions {
    fn default() -> Self {
        Self {
            team_name: "Meeral".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timeout_secs: 5,
            excerpt_chars: 200,
            placeholders: Placeholders::default(),
        }
    }
}

impl CheckinOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(team) = env::var("QRCHECKIN_TEAM") {
            self.team_name = team;
        }
        if let Ok(timeout) = env::var("QRCHECKIN_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.timeout_secs = parsed.max(1);
            }
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRCHECKIN_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in terminal logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRCHECKIN_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("QRCHECKIN_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("QRCHECKIN_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("QRCHECKIN_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn defaults_match_field_setup() {
        let config = CheckinConfig::default();
        assert_eq!(config.checkin.team_name, "Meeral");
        assert_eq!(config.checkin.user_agent, "Mozilla/5.0");
        assert_eq!(config.checkin.timeout_secs, 5);
        assert_eq!(config.sensor.tag, "SENSOR");
        assert_eq!(config.sensor.lines, 5);
        assert_eq!(
            config.sensor.retry_policy(),
            RetryPolicy::default(),
            "sensor defaults should match the retry policy defaults"
        );
        assert_eq!(config.camera_config().unwrap().device_index, Some(0));
        assert_eq!(config.camera_config().unwrap().capture_timeout_ms, 1000);
        config.validate().unwrap();
    }

    #[test]
    fn loads_toml_file() {
        let file = write_config(
            ".toml",
            r#"
[camera]
device_index = 2
format = "yuyv"
poll_interval_ms = 50
capture_timeout_ms = 250

[sensor]
source = "file"
serial = "HUB01"
max_attempts = 8
retry_delay_ms = 100

[checkin]
team_name = "Orion"

[checkin.placeholders]
team = "{team}"
"#,
        );

        let config = CheckinConfig::from_file(file.path()).unwrap();

        let camera = config.camera_config().unwrap();
        assert_eq!(camera.device_index, Some(2));
        assert_eq!(camera.format, PixelFormat::Yuyv);
        assert_eq!(camera.capture_timeout_ms, 250);
        assert_eq!(config.camera.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.sensor.source, SensorSource::File);
        assert_eq!(config.sensor.serial.as_deref(), Some("HUB01"));
        assert_eq!(config.sensor.retry_policy().max_attempts, 8);
        assert_eq!(config.sensor.tag, "SENSOR");
        assert_eq!(config.checkin.team_name, "Orion");
        assert_eq!(config.checkin.placeholders.team, "{team}");
        assert_eq!(config.checkin.placeholders.temperature, "FILL_HERE");
    }

    #[test]
    fn loads_yaml_file() {
        let file = write_config(
            ".yaml",
            "checkin:\n  team_name: Vega\n  timeout_secs: 9\n\
             logging:\n  level: debug\n  rotation: daily\n",
        );

        let config = CheckinConfig::from_file(file.path()).unwrap();

        assert_eq!(config.checkin.team_name, "Vega");
        assert_eq!(config.checkin.timeout_secs, 9);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotation, Some(LogRotation::Daily));
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = write_config(".ini", "team_name = x");
        assert!(matches!(
            CheckinConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_unknown_pixel_format() {
        let options = CameraOptions {
            format: Some("h264".to_string()),
            ..Default::default()
        };
        assert!(options.to_camera_config().is_err());
    }

    #[test]
    fn validation_catches_empty_placeholder() {
        let mut config = CheckinConfig::default();
        config.checkin.placeholders.humidity.clear();
        assert!(config.validate().is_err());

        let mut config = CheckinConfig::default();
        config.sensor.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_durations() {
        let mut config = CheckinConfig::default();
        config.camera.poll_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::Config(msg)) if msg.contains("poll_interval_ms")
        ));

        let mut config = CheckinConfig::default();
        config.sensor.command_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CheckinConfig::default();
        config.camera.capture_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        let file = write_config(".toml", "[checkin]\ntimeout_secs = 0\n");
        let config = CheckinConfig::from_file(file.path()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_source_follows_config() {
        let mut options = SensorOptions::default();
        assert!(options.log_source().describe().contains("logcat"));

        options.source = SensorSource::File;
        assert!(options.log_source().describe().contains("/sdcard/sensor_data.txt"));
    }
}
