//! Camera device implementation

use crate::camera::config::PixelFormat;
use crate::camera::{CameraConfig, find_device_by_name, list_devices};
use crate::error::{Error, Result};
use crate::scan::FrameSource;
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer};
use serde::{Deserialize, Serialize};
use std::mem;
use std::time::Duration;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Information about a camera device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Device index (e.g., 0 for /dev/video0)
    pub index: usize,
    /// Device path (e.g., "/dev/video0")
    pub path: String,
    /// Device name as reported by the driver
    pub name: String,
    /// Driver name
    pub driver: String,
    /// Bus information
    pub bus_info: String,
}

/// Open camera handle. Dropping it stops streaming and closes the device.
pub struct Camera {
    /// Memory-mapped V4L2 stream. Declared before `_device` so it is dropped first.
    stream: MmapStream<'static>,
    _device: Box<Device>,
    config: CameraConfig,
    info: CameraDevice,
}

impl Camera {
    /// Open a camera with the given configuration
    pub fn open(config: CameraConfig) -> Result<Self> {
        let device_info = if let Some(ref name) = config.device_name {
            find_device_by_name(name)?
        } else if let Some(index) = config.device_index {
            list_devices()?
                .into_iter()
                .find(|d| d.index == index)
                .ok_or_else(|| {
                    Error::CameraNotFound(format!("Device /dev/video{} not found", index))
                })?
        } else {
            list_devices()?
                .into_iter()
                .next()
                .ok_or_else(|| Error::CameraNotFound("No cameras available".to_string()))?
        };

        tracing::info!(
            "Opening camera: {} at {}",
            device_info.name,
            device_info.path
        );

        let dev = Device::new(device_info.index)
            .map_err(|e| Error::Camera(format!("Failed to open device: {}", e)))?;

        let mut fmt = dev
            .format()
            .map_err(|e| Error::Camera(format!("Failed to get format: {}", e)))?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = config.format.to_fourcc();
        let fmt = dev
            .set_format(&fmt)
            .map_err(|e| Error::Camera(format!("Failed to set format: {}", e)))?;

        let mut params = dev
            .params()
            .map_err(|e| Error::Camera(format!("Failed to get params: {}", e)))?;
        params.interval = v4l::Fraction::new(1, config.fps.max(1));
        dev.set_params(&params)
            .map_err(|e| Error::Camera(format!("Failed to set params: {}", e)))?;

        // The driver may have picked a different size than requested.
        let mut config = config;
        config.width = fmt.width;
        config.height = fmt.height;

        tracing::info!(
            "Camera configured: {}x{} @ {} fps ({})",
            fmt.width,
            fmt.height,
            config.fps,
            String::from_utf8_lossy(&fmt.fourcc.repr)
        );

        // SAFETY: the boxed device lives in the same struct as the stream and is dropped after it.
        let device = Box::new(dev);
        let static_device: &'static Device =
            unsafe { mem::transmute::<&Device, &'static Device>(device.as_ref()) };

        let mut stream =
            MmapStream::with_buffers(static_device, Type::VideoCapture, config.buffer_count.max(2))
                .map_err(|e| Error::FrameCapture(format!("Failed to create stream: {}", e)))?;
        // A stalled device must not pin the runtime thread, or Ctrl+C is never seen.
        stream.set_timeout(Duration::from_millis(config.capture_timeout_ms.max(1)));

        Ok(Self {
            stream,
            _device: device,
            config,
            info: device_info,
        })
    }

    /// Get camera device information
    pub fn info(&self) -> &CameraDevice {
        &self.info
    }

    /// Capture and decode a single frame.
    ///
    /// Blocks the calling thread for at most `capture_timeout_ms`; a device
    /// that delivers nothing in that window yields a `FrameCapture` error.
    pub fn capture_frame(&mut self) -> Result<DynamicImage> {
        let (buf, _meta) = self
            .stream
            .next()
            .map_err(|e| Error::FrameCapture(format!("Failed to capture: {}", e)))?;

        decode_frame(&self.config, buf)
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        tracing::debug!("Releasing camera {}", self.info.path);
    }
}

#[async_trait(?Send)]
impl FrameSource for Camera {
    async fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        match self.capture_frame() {
            Ok(frame) => Ok(Some(frame)),
            Err(err) => {
                tracing::debug!("Skipping frame: {err}");
                Ok(None)
            }
        }
    }
}

fn decode_frame(config: &CameraConfig, buf: &[u8]) -> Result<DynamicImage> {
    match config.format {
        PixelFormat::Mjpeg => image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
            .map_err(|e| Error::Image(format!("MJPEG decode failed: {}", e))),
        PixelFormat::Yuyv => yuyv_to_luma(config.width, config.height, buf),
        PixelFormat::Rgb24 => {
            ImageBuffer::from_raw(config.width, config.height, buf.to_vec())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| Error::Image("Short RGB24 frame".to_string()))
        }
    }
}

/// QR detection only needs luminance, so YUYV frames keep their Y samples and drop chroma.
fn yuyv_to_luma(width: u32, height: u32, yuyv: &[u8]) -> Result<DynamicImage> {
    let pixels = width as usize * height as usize;
    if yuyv.len() < pixels * 2 {
        return Err(Error::Image(format!(
            "Short YUYV frame: {} bytes for {}x{}",
            yuyv.len(),
            width,
            height
        )));
    }

    let luma: Vec<u8> = yuyv[..pixels * 2].iter().step_by(2).copied().collect();

    ImageBuffer::from_raw(width, height, luma)
        .map(DynamicImage::ImageLuma8)
        .ok_or_else(|| Error::Image("Failed to build luma image from YUYV".to_string()))
}
