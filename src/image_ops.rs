//! Image processing operations: fitting, flattening and encoding.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::ValueEnum;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use crate::error::{FpError, Result};

/// JPEG quality used for exports (0.92 on a 0-1 scale).
pub const JPEG_QUALITY: u8 = 92;

/// Strategy for fitting an image into a box.
#[derive(
    Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResizeStrategy {
    /// Fit within the box, maintain aspect ratio (transparent bars).
    Fit,
    /// Fill the box, maintain aspect ratio (may crop).
    #[default]
    Fill,
    /// Stretch to fill (may distort).
    Stretch,
}

/// Resize `img` to exactly `width` x `height` according to `strategy`.
#[must_use]
pub fn resize_into(img: &RgbaImage, width: u32, height: u32, strategy: ResizeStrategy) -> RgbaImage {
    let filter = imageops::FilterType::Triangle;
    let dynamic = image::DynamicImage::ImageRgba8(img.clone());

    match strategy {
        ResizeStrategy::Fit => {
            let resized = dynamic.resize(width, height, filter).to_rgba8();
            let mut canvas = RgbaImage::new(width, height);
            let (rw, rh) = resized.dimensions();
            let x = (width.saturating_sub(rw)) / 2;
            let y = (height.saturating_sub(rh)) / 2;
            imageops::overlay(&mut canvas, &resized, x.into(), y.into());
            canvas
        }
        ResizeStrategy::Fill => dynamic.resize_to_fill(width, height, filter).to_rgba8(),
        ResizeStrategy::Stretch => imageops::resize(img, width, height, filter),
    }
}

/// Composite `img` over an opaque `background`, dropping alpha.
#[must_use]
pub fn flatten(img: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (x, y, px) in img.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *px;
        let a = u16::from(a);
        let mix = |fg: u8, bg: u8| -> u8 {
            ((u16::from(fg) * a + u16::from(bg) * (255 - a) + 127) / 255) as u8
        };
        out.put_pixel(
            x,
            y,
            Rgb([
                mix(r, background.0[0]),
                mix(g, background.0[1]),
                mix(b, background.0[2]),
            ]),
        );
    }
    out
}

/// Lossless PNG with alpha.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(Cursor::new(&mut buf))
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| FpError::Encoding(format!("PNG: {e}")))?;
    Ok(buf)
}

/// Lossy JPEG; transparent pixels are composited onto white first.
pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let flat = flatten(img, Rgb([255, 255, 255]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality.clamp(1, 100))
        .write_image(flat.as_raw(), flat.width(), flat.height(), ExtendedColorType::Rgb8)
        .map_err(|e| FpError::Encoding(format!("JPEG: {e}")))?;
    Ok(buf)
}

/// `data:` URL for `bytes`.
#[must_use]
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL into its MIME type and payload.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| FpError::Encoding("not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FpError::Encoding("data URL has no payload".to_string()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| FpError::Encoding("only base64 data URLs are supported".to_string()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| FpError::Encoding(format!("data URL payload: {e}")))?;
    Ok((mime.to_string(), bytes))
}
