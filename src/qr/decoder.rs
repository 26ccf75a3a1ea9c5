//! QR code decoder using rqrr

use crate::data_url::DataUrl;
use crate::error::{Error, Result};
use crate::qr::QrPayload;
use image::{DynamicImage, GrayImage};
use std::path::Path;

/// QR code decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self
    }

    /// Decode a QR code from an image
    pub fn decode(&self, img: &DynamicImage) -> Result<QrPayload> {
        self.decode_gray(img.to_luma8())
    }

    /// Decode a QR code from a grayscale image
    pub fn decode_gray(&self, img: GrayImage) -> Result<QrPayload> {
        let mut prepared = rqrr::PreparedImage::prepare(img);
        let grids = prepared.detect_grids();

        let grid = grids.first().ok_or(Error::NoQrCodeFound)?;

        match grid.decode() {
            Ok((meta, content)) => {
                tracing::debug!(
                    "Decoded QR: version={:?}, ecc_level={:?}, length={}",
                    meta.version,
                    meta.ecc_level,
                    content.len()
                );

                Ok(QrPayload::from_bytes(content.into_bytes()))
            }
            Err(e) => Err(Error::QrDecode(format!("Decode failed: {:?}", e))),
        }
    }

    /// Decode a QR code from an image carried in a data URL
    pub fn decode_data_url(&self, url: &DataUrl) -> Result<QrPayload> {
        let bytes = url.decode_bytes()?;
        let img = image::load_from_memory(&bytes)?;
        self.decode(&img)
    }

    /// Decode a QR code from an image file, or from a text file holding a data URL
    pub fn decode_file(&self, path: &Path) -> Result<QrPayload> {
        let bytes = std::fs::read(path)?;
        if bytes.starts_with(b"data:") {
            let text = String::from_utf8(bytes)
                .map_err(|e| Error::InvalidDataUrl(format!("not UTF-8: {e}")))?;
            return self.decode_data_url(&DataUrl::parse(&text)?);
        }

        let img = image::load_from_memory(&bytes)?;
        self.decode(&img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderOptions;
    use crate::qr::encode_png;

    #[test]
    fn blank_image_has_no_code() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, image::Luma([255])));
        assert!(matches!(
            QrDecoder::new().decode(&blank),
            Err(Error::NoQrCodeFound)
        ));
    }

    #[test]
    fn decodes_png_file_and_data_url_file() {
        let image = encode_png("Hello", &RenderOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let png_path = dir.path().join("qrcode.png");
        std::fs::write(&png_path, image.data_url.decode_bytes().unwrap()).unwrap();
        let url_path = dir.path().join("qrcode.txt");
        std::fs::write(&url_path, format!("{}\n", image.data_url)).unwrap();

        let decoder = QrDecoder::new();
        assert_eq!(decoder.decode_file(&png_path).unwrap().as_str(), Some("Hello"));
        assert_eq!(decoder.decode_file(&url_path).unwrap().as_str(), Some("Hello"));
    }
}
