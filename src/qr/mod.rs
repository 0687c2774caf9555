//! QR code decoding
//!
//! Turns camera frames into zero or more [`QrPayload`]s. The check-in flow
//! only cares about the first payload that is valid UTF-8 text.

mod decoder;

pub use decoder::QrDecoder;

use serde::{Deserialize, Serialize};

/// A decoded QR code payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// The raw decoded data
    pub data: Vec<u8>,
    /// String representation if valid UTF-8
    pub text: Option<String>,
}

impl QrPayload {
    /// Create a new QR payload from raw bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let text = std::str::from_utf8(&data).ok().map(str::to_owned);
        Self { data, text }
    }

    /// Get the payload as a string, if valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_payload_text() {
        let payload = QrPayload::from_bytes(b"https://example.org/YOUR_TEAM".to_vec());
        assert_eq!(payload.as_str(), Some("https://example.org/YOUR_TEAM"));
    }

    #[test]
    fn test_qr_payload_binary() {
        let payload = QrPayload::from_bytes(vec![0xFF, 0xFE]);
        assert!(payload.as_str().is_none());
        assert_eq!(payload.as_bytes(), &[0xFF, 0xFE]);
    }
}
