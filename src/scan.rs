//! QR acquisition loop
//!
//! Pulls frames from a [`FrameSource`] until one of them carries a QR code with
//! UTF-8 text, or until the [`StopSignal`] is raised. The source is taken by
//! value so the camera is closed on every way out of the loop.

use crate::error::Result;
use crate::qr::QrDecoder;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Anything that can hand out camera frames.
#[async_trait(?Send)]
pub trait FrameSource {
    /// Produce the next frame.
    ///
    /// `Ok(None)` means no frame was ready this time and the caller should just
    /// try again. `Err` means the source is unusable.
    async fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

/// Cooperative cancellation flag shared between the scan loop and whoever asks it to stop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this signal to stop
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`trigger`](Self::trigger) has been called on any clone
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scans frames for the check-in URL template
#[derive(Debug)]
pub struct QrScanner {
    decoder: QrDecoder,
    poll_interval: Duration,
}

impl QrScanner {
    /// Create a scanner that waits `poll_interval` between frames without a usable code
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            decoder: QrDecoder::new(),
            poll_interval,
        }
    }

    /// Block until a QR payload is read or `stop` is triggered.
    ///
    /// Returns `Ok(None)` on cancellation. There is no timeout.
    pub async fn acquire<S: FrameSource>(
        &self,
        mut source: S,
        stop: &StopSignal,
    ) -> Result<Option<String>> {
        let mut frames: u64 = 0;

        loop {
            if stop.is_triggered() {
                tracing::info!(frames, "QR scan cancelled");
                return Ok(None);
            }

            if let Some(frame) = source.next_frame().await? {
                frames += 1;
                for payload in self.decoder.decode_all(&frame) {
                    match payload.as_str() {
                        Some(text) => {
                            tracing::info!(frames, length = text.len(), "QR code detected");
                            return Ok(Some(text.to_owned()));
                        }
                        None => tracing::warn!(
                            bytes = payload.as_bytes().len(),
                            "Ignoring QR code that is not UTF-8 text"
                        ),
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
