//! Minimal PDF 1.4 writer: one page, raster images with soft masks.

use std::fmt::Write as _;
use std::io::Write as _;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbaImage;
use tracing::{debug, trace};

use super::{ImagePlacement, PdfBackend, PdfDocument, PdfOptions};
use crate::error::{FpError, Result};

const PRODUCER: &str = "FlashPost";

/// Built-in PDF backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfWriter;

impl PdfWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PdfBackend for PdfWriter {
    fn name(&self) -> &str {
        "flashpost-pdf"
    }

    fn create_document(&self, options: &PdfOptions) -> Box<dyn PdfDocument> {
        Box::new(SinglePageDocument {
            options: *options,
            images: Vec::new(),
        })
    }
}

struct PlacedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
    placement: ImagePlacement,
}

struct SinglePageDocument {
    options: PdfOptions,
    images: Vec<PlacedImage>,
}

impl PdfDocument for SinglePageDocument {
    fn options(&self) -> &PdfOptions {
        &self.options
    }

    fn add_image(&mut self, image: &RgbaImage, placement: ImagePlacement) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FpError::Encoding("cannot embed an empty image".to_string()));
        }

        let pixels = image.as_raw();
        let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(pixels.len() / 4);
        for px in pixels.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        let has_alpha = alpha.iter().any(|a| *a != 255);

        trace!(
            width = image.width(),
            height = image.height(),
            has_alpha,
            "Embedding image"
        );
        self.images.push(PlacedImage {
            width: image.width(),
            height: image.height(),
            rgb,
            alpha: has_alpha.then_some(alpha),
            placement,
        });
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let k = self.options.unit.to_points();
        let (page_w, page_h) = self.options.oriented_page_size();
        let (page_w, page_h) = (page_w * k, page_h * k);
        let compress = self.options.compress;

        let mut out = ObjectWriter::new();

        // Fixed object numbers: 1 catalog, 2 pages, 3 page, 4 contents,
        // 5 info, then two per image (XObject, optional SMask).
        let first_image = 6;
        let image_obj = |i: usize| first_image + i * 2;

        let mut content = String::new();
        let mut resources = String::new();
        for (i, img) in self.images.iter().enumerate() {
            let p = img.placement;
            let w = p.width * k;
            let h = p.height * k;
            let x = p.x * k;
            let y = page_h - (p.y * k + h);
            let _ = writeln!(
                content,
                "q {} 0 0 {} {} {} cm /Im{i} Do Q",
                num(w),
                num(h),
                num(x),
                num(y)
            );
            let _ = write!(resources, "/Im{i} {} 0 R ", image_obj(i));
        }

        out.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
        out.object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
        out.object(
            3,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /XObject << {}>> >> /Contents 4 0 R >>",
                num(page_w),
                num(page_h),
                resources
            )
            .as_bytes(),
        );
        out.stream(4, "", content.as_bytes(), compress)?;
        out.object(5, format!("<< /Producer ({PRODUCER}) >>").as_bytes());

        for (i, img) in self.images.iter().enumerate() {
            let obj = image_obj(i);
            let smask = img
                .alpha
                .as_ref()
                .map(|_| format!(" /SMask {} 0 R", obj + 1))
                .unwrap_or_default();
            out.stream(
                obj,
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8{smask}",
                    img.width, img.height
                ),
                &img.rgb,
                compress,
            )?;
            if let Some(alpha) = &img.alpha {
                out.stream(
                    obj + 1,
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceGray /BitsPerComponent 8",
                        img.width, img.height
                    ),
                    alpha,
                    compress,
                )?;
            }
        }

        let bytes = out.finish(1, 5);
        debug!(
            bytes = bytes.len(),
            images = self.images.len(),
            "Serialized PDF"
        );
        Ok(bytes)
    }
}

/// Tracks byte offsets while appending numbered objects.
struct ObjectWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, number: usize, body: &[u8]) {
        self.offsets.push((number, self.buf.len()));
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, number: usize, dict: &str, data: &[u8], compress: bool) -> Result<()> {
        let (data, filter) = if compress {
            (deflate(data)?, " /Filter /FlateDecode")
        } else {
            (data.to_vec(), "")
        };
        let mut body = format!("<< {dict}{filter} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\nendstream");
        self.object(number, &body);
        Ok(())
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let size = self.offsets.last().map_or(1, |(n, _)| n + 1);
        let xref_at = self.buf.len();

        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        let mut next = 1;
        for (number, offset) in &self.offsets {
            while next < *number {
                xref.push_str("0000000000 65535 f \n");
                next += 1;
            }
            let _ = writeln!(xref, "{offset:010} 00000 n ");
            next += 1;
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {size} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| FpError::Encoding(format!("deflate: {e}")))?;
    encoder
        .finish()
        .map_err(|e| FpError::Encoding(format!("deflate: {e}")))
}

/// Compact number formatting for PDF operands.
fn num(v: f32) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
