//! QR code decoder using rqrr

use crate::qr::QrPayload;
use image::{DynamicImage, GrayImage};

/// QR code decoder
#[derive(Debug, Default)]
pub struct QrDecoder {}

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self {}
    }

    /// Decode every QR code visible in a frame.
    ///
    /// Grids that are detected but fail to decode are logged and left out, so
    /// an empty result simply means "nothing usable in this frame".
    pub fn decode_all(&self, img: &DynamicImage) -> Vec<QrPayload> {
        self.decode_gray(img.to_luma8())
    }

    /// Decode every QR code in a grayscale image
    pub fn decode_gray(&self, img: GrayImage) -> Vec<QrPayload> {
        let mut prepared = rqrr::PreparedImage::prepare(img);
        let mut payloads = Vec::new();

        for grid in prepared.detect_grids() {
            // decode_to keeps the raw bytes even when they are not UTF-8
            let mut content = Vec::new();
            match grid.decode_to(&mut content) {
                Ok(meta) => {
                    tracing::debug!(
                        "Decoded QR: version={:?}, ecc_level={:?}, length={}",
                        meta.version,
                        meta.ecc_level,
                        content.len()
                    );
                    payloads.push(QrPayload::from_bytes(content));
                }
                Err(e) => tracing::warn!("Failed to decode one QR code: {:?}", e),
            }
        }

        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use qrcode::QrCode;

    fn render(text: &str) -> DynamicImage {
        let code = QrCode::new(text.as_bytes()).unwrap();
        DynamicImage::ImageLuma8(code.render::<Luma<u8>>().min_dimensions(400, 400).build())
    }

    #[test]
    fn test_decodes_checkin_url() {
        let url = "https://scoring.example.org/checkin/YOUR_TEAM/FILL_HERE/FILL_THERE";
        let payloads = QrDecoder::new().decode_all(&render(url));

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].as_str(), Some(url));
    }

    #[test]
    fn test_blank_frame_has_no_payloads() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(320, 240, Luma([255])));
        assert!(QrDecoder::new().decode_all(&blank).is_empty());
    }
}
