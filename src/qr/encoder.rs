//! QR code encoder

use crate::config::RenderOptions;
use crate::data_url::DataUrl;
use crate::error::GenerationFailure;
use crate::qr::QrImage;
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use qrcode::types::QrError;
use qrcode::{Color, QrCode, Version};
use std::io::Cursor;

/// Pixels per module when the requested width cannot hold the symbol
const FALLBACK_SCALE: u32 = 4;

/// Turns a payload string into a rendered image.
///
/// The widget only sees this trait, so tests and embedders can swap in
/// their own encoder.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode `data` using the given visual parameters.
    async fn encode(
        &self,
        data: &str,
        options: &RenderOptions,
    ) -> std::result::Result<QrImage, GenerationFailure>;
}

/// Default encoder: `qrcode` symbol, `image` PNG, base64 data URL
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

impl PngEncoder {
    /// Create a new PNG encoder
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Encoder for PngEncoder {
    async fn encode(
        &self,
        data: &str,
        options: &RenderOptions,
    ) -> std::result::Result<QrImage, GenerationFailure> {
        let data = data.to_owned();
        let options = options.clone();
        tokio::task::spawn_blocking(move || encode_png(&data, &options))
            .await
            .map_err(|e| GenerationFailure::Encoding(format!("encoder task failed: {e}")))?
    }
}

/// Build the symbol for `data` and render it to a PNG data URL.
pub fn encode_png(
    data: &str,
    options: &RenderOptions,
) -> std::result::Result<QrImage, GenerationFailure> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), options.ec_level.into())
        .map_err(|e| match e {
            QrError::DataTooLong => GenerationFailure::CapacityExceeded { len: data.len() },
            other => GenerationFailure::Encoding(other.to_string()),
        })?;

    let image = render_symbol(&code, options);
    let (width, height) = image.dimensions();

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| GenerationFailure::Encoding(format!("PNG encoding failed: {e}")))?;

    let version = match code.version() {
        Version::Normal(v) | Version::Micro(v) => v,
    };

    tracing::debug!(
        version,
        width,
        payload_len = data.len(),
        png_bytes = png.len(),
        "Rendered QR code"
    );

    Ok(QrImage {
        data_url: DataUrl::png(&png),
        width,
        height,
        version,
        payload_len: data.len(),
    })
}

/// Rasterise a symbol with its margin to `options.width` pixels square.
///
/// The scale is fractional: every pixel takes the colour of the module
/// underneath it. If the width cannot fit one pixel per module (margin
/// included) the image is drawn at a fixed scale instead.
pub fn render_symbol(code: &QrCode, options: &RenderOptions) -> RgbaImage {
    let modules = code.width() as u32;
    let total = modules + options.margin * 2;
    let size = if options.width >= total {
        options.width
    } else {
        total * FALLBACK_SCALE
    };
    let scale = f64::from(size) / f64::from(total);
    let margin_px = f64::from(options.margin) * scale;
    let symbol_end = margin_px + f64::from(modules) * scale;

    let colors = code.to_colors();
    let dark = Rgba(options.dark.to_rgba());
    let light = Rgba(options.light.to_rgba());

    RgbaImage::from_fn(size, size, |x, y| {
        let (px, py) = (f64::from(x), f64::from(y));
        if px < margin_px || py < margin_px || px >= symbol_end || py >= symbol_end {
            return light;
        }
        let mx = (((px - margin_px) / scale) as u32).min(modules - 1);
        let my = (((py - margin_px) / scale) as u32).min(modules - 1);
        match colors[(my * modules + mx) as usize] {
            Color::Dark => dark,
            Color::Light => light,
        }
    })
}
