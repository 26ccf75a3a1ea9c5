//! QR code encoding and decoding
//!
//! Encoding turns a payload string into a PNG data URL using the configured
//! [`RenderOptions`](crate::config::RenderOptions). Decoding reads a symbol
//! back out of an image, which is how generated codes are verified.

mod decoder;
mod encoder;

pub use decoder::QrDecoder;
pub use encoder::{Encoder, PngEncoder, encode_png, render_symbol};

use crate::data_url::DataUrl;
use serde::{Deserialize, Serialize};

/// A rendered QR code ready for display or download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrImage {
    /// The PNG as a `data:image/png;base64,...` URL
    pub data_url: DataUrl,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Symbol version (1-40) chosen by the encoder
    pub version: i16,
    /// Length in bytes of the encoded payload
    pub payload_len: usize,
}

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
        let text = String::from_utf8(data.clone()).ok();
        Self { data, text }
    }

    /// Create a new QR payload from a string
    pub fn from_string(s: String) -> Self {
        Self {
            data: s.as_bytes().to_vec(),
            text: Some(s),
        }
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
