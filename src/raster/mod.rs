//! Rasterization capability: turn an element subtree into pixels.
//!
//! The exporter talks to a [`Rasterizer`] only through this trait, so the
//! built-in [`BoxRasterizer`] can be swapped for another engine, and tests
//! use [`mock::MockRasterizer`].

mod boxes;
pub mod mock;

pub use boxes::{BoxRasterizer, MAX_CANVAS_AREA, MAX_CANVAS_SIDE};

use std::fmt;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use crate::document::{ClonedSubtree, Document, ElementId};
use crate::error::Result;

/// Hook run on the cloned subtree before painting.
///
/// Receives the source document and the clone.
pub type CloneHook = dyn Fn(&Document, &mut ClonedSubtree) + Send + Sync;

/// Options for a single capture.
pub struct CaptureOptions<'a> {
    /// Canvas fill before painting; `None` leaves it transparent.
    pub background: Option<Rgba<u8>>,
    /// Device pixel ratio applied to `width`/`height`.
    pub scale: f32,
    /// Capture width in CSS pixels.
    pub width: u32,
    /// Capture height in CSS pixels.
    pub height: u32,
    /// Load cross-origin images with CORS.
    pub use_cors: bool,
    /// Allow cross-origin images to taint the canvas.
    pub allow_taint: bool,
    /// Per-image load budget.
    pub image_timeout: Duration,
    pub on_clone: Option<&'a CloneHook>,
}

impl Default for CaptureOptions<'_> {
    fn default() -> Self {
        Self {
            background: None,
            scale: 1.0,
            width: 100,
            height: 100,
            use_cors: true,
            allow_taint: false,
            image_timeout: Duration::from_secs(15),
            on_clone: None,
        }
    }
}

impl fmt::Debug for CaptureOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOptions")
            .field("background", &self.background)
            .field("scale", &self.scale)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("use_cors", &self.use_cors)
            .field("allow_taint", &self.allow_taint)
            .field("image_timeout", &self.image_timeout)
            .field("on_clone", &self.on_clone.is_some())
            .finish()
    }
}

impl CaptureOptions<'_> {
    /// Output canvas size in device pixels.
    #[must_use]
    pub fn canvas_size(&self) -> (u32, u32) {
        let scaled = |v: u32| (v as f32 * self.scale).round().max(0.0) as u32;
        (scaled(self.width), scaled(self.height))
    }
}

/// Pixels produced by a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    #[must_use]
    pub const fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }
}

/// Element-to-pixels engine.
pub trait Rasterizer: Send + Sync {
    /// Engine name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Render `target` and its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`FpError::Rasterization`](crate::error::FpError::Rasterization)
    /// tagged with the failure kind.
    fn capture(
        &self,
        document: &Document,
        target: ElementId,
        options: &CaptureOptions<'_>,
    ) -> Result<RasterImage>;
}
