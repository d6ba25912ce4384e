//! Built-in box rasterizer.
//!
//! Paints element backgrounds, local images and text into an RGBA canvas.
//! Text is drawn as greeked glyph cells (one filled cell per character) with
//! advance widths that depend on the resolved font family, which is enough
//! for layout-faithful previews and export tests without a font stack.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::{Pixel, Rgba, RgbaImage, imageops};
use tracing::{debug, instrument, trace, warn};

use super::{CaptureOptions, RasterImage, Rasterizer};
use crate::document::{Document, ElementId, Rect, TRANSPARENT};
use crate::error::{CaptureErrorKind, FpError, Result};
use crate::image_ops::{decode_data_url, resize_into};

/// Largest canvas side in device pixels.
pub const MAX_CANVAS_SIDE: u32 = 16_384;
/// Largest canvas area in device pixels.
pub const MAX_CANVAS_AREA: u64 = 268_435_456;

const LINE_HEIGHT: f32 = 1.3;

/// Rasterizer painting element boxes without an external engine.
#[derive(Debug, Clone, Default)]
pub struct BoxRasterizer {
    /// Directory relative image paths resolve against.
    base_dir: Option<PathBuf>,
}

impl BoxRasterizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative image sources against `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn load_image(&self, src: &str, options: &CaptureOptions<'_>) -> Result<RgbaImage> {
        if src.starts_with("http://") || src.starts_with("https://") {
            if !options.use_cors && !options.allow_taint {
                return Err(FpError::capture(
                    CaptureErrorKind::CrossOrigin,
                    format!("cross-origin image {src} blocked without CORS"),
                ));
            }
            return Err(FpError::capture(
                CaptureErrorKind::Network,
                format!("remote image {src} cannot be fetched; use a local file"),
            ));
        }

        if src.starts_with("data:") {
            let (_, bytes) = decode_data_url(src)?;
            let img = image::load_from_memory(&bytes).map_err(|e| {
                FpError::capture(CaptureErrorKind::Other, format!("bad inline image: {e}"))
            })?;
            return Ok(img.to_rgba8());
        }

        let path = Path::new(src);
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };

        load_file(path, options.image_timeout)
    }
}

/// Decode `path` on a loader thread, giving up after `timeout`.
///
/// A stalled read leaves the loader thread parked; the capture moves on.
fn load_file(path: PathBuf, timeout: Duration) -> Result<RgbaImage> {
    let (tx, rx) = mpsc::channel();
    let worker_path = path.clone();
    thread::Builder::new()
        .name("flashpost-image-load".to_string())
        .spawn(move || {
            let _ = tx.send(image::open(&worker_path).map(|img| img.to_rgba8()));
        })
        .map_err(|e| {
            FpError::capture(
                CaptureErrorKind::Other,
                format!("could not start image loader: {e}"),
            )
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(img)) => Ok(img),
        Ok(Err(e)) => Err(FpError::capture(
            CaptureErrorKind::Network,
            format!("failed to load image {}: {e}", path.display()),
        )),
        Err(RecvTimeoutError::Timeout) => {
            warn!(path = %path.display(), "Image load timed out");
            Err(FpError::capture(
                CaptureErrorKind::Timeout,
                format!(
                    "image {} exceeded the {} ms load timeout",
                    path.display(),
                    timeout.as_millis()
                ),
            ))
        }
        Err(RecvTimeoutError::Disconnected) => Err(FpError::capture(
            CaptureErrorKind::Other,
            format!("image loader for {} exited without a result", path.display()),
        )),
    }
}

impl Rasterizer for BoxRasterizer {
    fn name(&self) -> &str {
        "box"
    }

    #[instrument(skip(self, document, options), fields(scale = options.scale))]
    fn capture(
        &self,
        document: &Document,
        target: ElementId,
        options: &CaptureOptions<'_>,
    ) -> Result<RasterImage> {
        if !options.scale.is_finite() || options.scale <= 0.0 {
            return Err(FpError::capture(
                CaptureErrorKind::Other,
                format!("invalid scale {}", options.scale),
            ));
        }

        let (width, height) = options.canvas_size();
        if width == 0 || height == 0 {
            return Err(FpError::capture(
                CaptureErrorKind::EmptyImage,
                format!("canvas would be {width}x{height}"),
            ));
        }
        if width > MAX_CANVAS_SIDE
            || height > MAX_CANVAS_SIDE
            || u64::from(width) * u64::from(height) > MAX_CANVAS_AREA
        {
            return Err(FpError::capture(
                CaptureErrorKind::Memory,
                format!("canvas {width}x{height} exceeds the pixel budget"),
            ));
        }

        let mut clone = document.clone_subtree(target).ok_or_else(|| {
            FpError::capture(CaptureErrorKind::Other, format!("element {target:?} vanished"))
        })?;
        if let Some(hook) = options.on_clone {
            hook(document, &mut clone);
        }

        let fill = options.background.unwrap_or(TRANSPARENT);
        let mut canvas = RgbaImage::from_pixel(width, height, fill);
        let cloned = &clone.document;

        for id in clone.elements() {
            if !cloned.is_rendered(id) || !cloned.is_visible(id) {
                trace!(?id, "Skipping hidden element");
                continue;
            }
            let (Some(element), Some(rect)) = (cloned.get(id), cloned.absolute_rect(id)) else {
                continue;
            };
            let rect = scale_rect(rect, options.scale);

            if let Some(bg) = element.style.background {
                fill_rect(&mut canvas, rect, bg);
            }

            if let Some(src) = &element.image {
                let img = self.load_image(src, options)?;
                let w = rect.width.round().max(1.0) as u32;
                let h = rect.height.round().max(1.0) as u32;
                let fit = element.style.object_fit.unwrap_or_default();
                let resized = resize_into(&img, w, h, fit);
                imageops::overlay(
                    &mut canvas,
                    &resized,
                    rect.x.round() as i64,
                    rect.y.round() as i64,
                );
            }

            if let Some(text) = &element.text {
                let font = cloned.resolved_font_family(id);
                let size = cloned.resolved_font_size(id) * options.scale;
                let color = cloned.resolved_color(id);
                paint_text(&mut canvas, rect, text, &font, size, color);
            }
        }

        let raster = RasterImage::new(canvas);
        if raster.is_empty() {
            warn!("Capture produced an empty raster");
            return Err(FpError::capture(
                CaptureErrorKind::EmptyImage,
                "capture produced an empty raster",
            ));
        }
        debug!(width = raster.width(), height = raster.height(), "Captured element");
        Ok(raster)
    }
}

fn scale_rect(rect: Rect, scale: f32) -> Rect {
    Rect::new(
        rect.x * scale,
        rect.y * scale,
        rect.width * scale,
        rect.height * scale,
    )
}

/// Source-over fill of `rect`, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    if color.0[3] == 0 {
        return;
    }
    let x0 = rect.x.max(0.0).round() as u32;
    let y0 = rect.y.max(0.0).round() as u32;
    let x1 = ((rect.x + rect.width).round().max(0.0) as u32).min(canvas.width());
    let y1 = ((rect.y + rect.height).round().max(0.0) as u32).min(canvas.height());
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.get_pixel_mut(x, y).blend(&color);
        }
    }
}

/// Advance width per character as a fraction of the font size.
fn advance_ratio(font_family: &str) -> f32 {
    let family = font_family.to_ascii_lowercase();
    if family.contains("mono") || family.contains("courier") {
        0.6
    } else if family.contains("serif") && !family.contains("sans") {
        0.5
    } else {
        0.55
    }
}

/// Greeked text: wraps on whitespace and clips to the element box.
fn paint_text(
    canvas: &mut RgbaImage,
    rect: Rect,
    text: &str,
    font_family: &str,
    size: f32,
    color: Rgba<u8>,
) {
    if size <= 0.0 || rect.width <= 0.0 {
        return;
    }
    let advance = size * advance_ratio(font_family);
    let line_height = size * LINE_HEIGHT;
    let per_line = ((rect.width / advance).floor() as usize).max(1);

    let mut line = 0usize;
    for paragraph in text.lines() {
        let mut column = 0usize;
        for word in paragraph.split_whitespace() {
            let len = word.chars().count();
            if column > 0 && column + 1 + len > per_line {
                line += 1;
                column = 0;
            } else if column > 0 {
                column += 1;
            }
            for _ in word.chars() {
                if column >= per_line {
                    line += 1;
                    column = 0;
                }
                let top = rect.y + line as f32 * line_height + (line_height - size) / 2.0;
                if top + size > rect.y + rect.height {
                    return;
                }
                let cell = Rect::new(
                    rect.x + column as f32 * advance + advance * 0.1,
                    top + size * 0.3,
                    advance * 0.8,
                    size * 0.7,
                );
                fill_rect(canvas, cell, color);
                column += 1;
            }
        }
        line += 1;
    }
}
