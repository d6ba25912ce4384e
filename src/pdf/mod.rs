//! PDF assembly capability.
//!
//! The exporter creates a one-page document sized to the slide, places the
//! captured raster full-bleed, and hands the finished bytes to the download
//! sink. [`PdfWriter`] is the built-in backend.

mod writer;

pub use writer::PdfWriter;

use image::RgbaImage;
use serde::Serialize;

use crate::error::Result;

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Landscape iff `width > height`.
    #[must_use]
    pub const fn for_size(width: u32, height: u32) -> Self {
        if width > height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

/// Unit for page size and placement values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// CSS pixel (1/96 in).
    Px,
    /// PostScript point (1/72 in).
    Pt,
}

impl Unit {
    /// Points per unit.
    #[must_use]
    pub const fn to_points(self) -> f32 {
        match self {
            Self::Px => 0.75,
            Self::Pt => 1.0,
        }
    }
}

/// Options for a new document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PdfOptions {
    pub orientation: Orientation,
    pub unit: Unit,
    /// Page width and height in `unit`.
    pub page_size: (f32, f32),
    /// Deflate content and image streams.
    pub compress: bool,
}

impl PdfOptions {
    /// Page size after applying `orientation`: the longer side is horizontal
    /// for landscape and vertical for portrait.
    #[must_use]
    pub fn oriented_page_size(&self) -> (f32, f32) {
        let (w, h) = self.page_size;
        let swap = match self.orientation {
            Orientation::Landscape => w < h,
            Orientation::Portrait => w > h,
        };
        if swap { (h, w) } else { (w, h) }
    }
}

/// Where an image goes on the page, in document units from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ImagePlacement {
    /// Cover the whole page.
    #[must_use]
    pub const fn full_page(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }
}

/// Document factory.
pub trait PdfBackend: Send + Sync {
    fn name(&self) -> &str;

    fn create_document(&self, options: &PdfOptions) -> Box<dyn PdfDocument>;
}

/// A single-page document under construction.
pub trait PdfDocument: Send {
    fn options(&self) -> &PdfOptions;

    fn orientation(&self) -> Orientation {
        self.options().orientation
    }

    /// Page size in document units, after orientation.
    fn page_size(&self) -> (f32, f32) {
        self.options().oriented_page_size()
    }

    /// Place an RGBA image; alpha becomes a soft mask.
    fn add_image(&mut self, image: &RgbaImage, placement: ImagePlacement) -> Result<()>;

    /// Serialize the document.
    fn finish(self: Box<Self>) -> Result<Vec<u8>>;
}
