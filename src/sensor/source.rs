//! Log sources backed by the `adb` command line tool

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Somewhere sensor log text can be fetched from.
///
/// Implementations do not impose their own time limit; the caller wraps
/// [`fetch`](LogSource::fetch) in a timeout and drops the future when it
/// expires.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Capture a window of log output
    async fn fetch(&self) -> Result<String>;

    /// Short human-readable description used in logs
    fn describe(&self) -> String;
}

/// `adb logcat -t <lines> -s <tag>`: the tail of the device log filtered to one tag
#[derive(Debug, Clone)]
pub struct AdbLogcat {
    /// Path or name of the adb executable
    pub adb_path: PathBuf,
    /// Device serial passed as `adb -s`, for hosts with several devices attached
    pub serial: Option<String>,
    /// Number of log entries to request
    pub lines: usize,
    /// Log tag to filter on
    pub tag: String,
}

impl AdbLogcat {
    /// Arguments passed to adb, after the executable name
    pub fn args(&self) -> Vec<String> {
        let mut args = serial_args(self.serial.as_deref());
        args.extend([
            "logcat".to_string(),
            "-t".to_string(),
            self.lines.to_string(),
            "-s".to_string(),
            self.tag.clone(),
        ]);
        args
    }
}

#[async_trait]
impl LogSource for AdbLogcat {
    async fn fetch(&self) -> Result<String> {
        run_adb(&self.adb_path, &self.args()).await
    }

    fn describe(&self) -> String {
        format!("adb logcat (tag {}, last {} entries)", self.tag, self.lines)
    }
}

/// `adb shell cat <path>`: the sensor file the robot op-mode rewrites every cycle
#[derive(Debug, Clone)]
pub struct AdbSensorFile {
    /// Path or name of the adb executable
    pub adb_path: PathBuf,
    /// Device serial passed as `adb -s`
    pub serial: Option<String>,
    /// File on the device, e.g. `/sdcard/sensor_data.txt`
    pub path: String,
}

impl AdbSensorFile {
    /// Arguments passed to adb, after the executable name
    pub fn args(&self) -> Vec<String> {
        let mut args = serial_args(self.serial.as_deref());
        args.extend(["shell".to_string(), "cat".to_string(), self.path.clone()]);
        args
    }
}

#[async_trait]
impl LogSource for AdbSensorFile {
    async fn fetch(&self) -> Result<String> {
        run_adb(&self.adb_path, &self.args()).await
    }

    fn describe(&self) -> String {
        format!("adb shell cat {}", self.path)
    }
}

fn serial_args(serial: Option<&str>) -> Vec<String> {
    match serial {
        Some(serial) => vec!["-s".to_string(), serial.to_string()],
        None => Vec::new(),
    }
}

/// Run adb and return whatever it printed on stdout.
///
/// The exit status is not checked: a failing adb prints nothing useful on
/// stdout, which the parser then reports as "no reading".
async fn run_adb(adb_path: &Path, args: &[String]) -> Result<String> {
    tracing::trace!(adb = %adb_path.display(), ?args, "Running adb");

    let output = Command::new(adb_path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::LogSource(format!("Failed to run {}: {e}", adb_path.display())))?;

    if !output.stderr.is_empty() {
        tracing::debug!(
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "adb wrote to stderr"
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
