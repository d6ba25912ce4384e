//! Mock rasterizer for unit and integration testing.
//!
//! Records every capture together with the state of the document at the
//! moment of capture, and supports scripted failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use flashpost::error::{CaptureErrorKind, FpError};
//! use flashpost::raster::mock::MockRasterizer;
//!
//! let mock = MockRasterizer::new();
//! mock.fail_on_call(2, FpError::capture(CaptureErrorKind::CrossOrigin, "CORS error"));
//!
//! // ... run exports ...
//!
//! assert_eq!(mock.capture_count(), 5);
//! assert!(mock.captures().iter().all(|c| c.chrome_hidden));
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tracing::{debug, trace};

use super::{CaptureOptions, RasterImage, Rasterizer};
use crate::chrome::CHROME_SELECTORS;
use crate::document::{Document, ElementId};
use crate::error::{CaptureErrorKind, FpError, Result};

/// Fill used when the capture has no background.
pub const MOCK_FILL: Rgba<u8> = Rgba([40, 80, 160, 128]);

/// One recorded capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    pub target: ElementId,
    pub scale: f32,
    pub width: u32,
    pub height: u32,
    pub background: Option<Rgba<u8>>,
    pub use_cors: bool,
    pub allow_taint: bool,
    pub image_timeout: Duration,
    /// Every chrome element was hidden when the capture ran.
    pub chrome_hidden: bool,
    /// Inline font families of the cloned elements after the clone hook ran.
    pub cloned_fonts: Vec<Option<String>>,
}

/// Mock rasterizer for testing without painting.
#[derive(Debug, Default)]
pub struct MockRasterizer {
    records: Mutex<Vec<CaptureRecord>>,
    error_injection: Mutex<Option<FpError>>,
    failing_calls: Mutex<HashMap<usize, FpError>>,
    fail_always: Mutex<Option<CaptureErrorKind>>,
    calls: Mutex<usize>,
}

impl MockRasterizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next capture with `error`.
    pub fn inject_error(&self, error: FpError) {
        *self.error_injection.lock().unwrap() = Some(error);
    }

    /// Fail the `n`-th capture (1-based) with `error`.
    pub fn fail_on_call(&self, n: usize, error: FpError) {
        self.failing_calls.lock().unwrap().insert(n, error);
    }

    /// Fail every capture with `kind`.
    pub fn fail_always(&self, kind: CaptureErrorKind) {
        *self.fail_always.lock().unwrap() = Some(kind);
    }

    /// Recorded captures, including failed ones.
    #[must_use]
    pub fn captures(&self) -> Vec<CaptureRecord> {
        self.records.lock().unwrap().clone()
    }

    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Most recent capture.
    #[must_use]
    pub fn last_capture(&self) -> Option<CaptureRecord> {
        self.records.lock().unwrap().last().cloned()
    }

    fn scripted_failure(&self, call: usize) -> Option<FpError> {
        if let Some(error) = self.error_injection.lock().unwrap().take() {
            return Some(error);
        }
        if let Some(error) = self.failing_calls.lock().unwrap().remove(&call) {
            return Some(error);
        }
        self.fail_always
            .lock()
            .unwrap()
            .map(|kind| FpError::capture(kind, "mock capture failure"))
    }
}

fn chrome_hidden(document: &Document) -> bool {
    CHROME_SELECTORS
        .iter()
        .flat_map(|selector| document.query_all(selector))
        .all(|id| !document.is_rendered(id))
}

impl Rasterizer for MockRasterizer {
    fn name(&self) -> &str {
        "mock"
    }

    fn capture(
        &self,
        document: &Document,
        target: ElementId,
        options: &CaptureOptions<'_>,
    ) -> Result<RasterImage> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };

        let cloned_fonts = document
            .clone_subtree(target)
            .map(|mut clone| {
                if let Some(hook) = options.on_clone {
                    hook(document, &mut clone);
                }
                clone
                    .elements()
                    .into_iter()
                    .map(|id| {
                        clone
                            .document
                            .get(id)
                            .and_then(|e| e.style.font_family.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let record = CaptureRecord {
            target,
            scale: options.scale,
            width: options.width,
            height: options.height,
            background: options.background,
            use_cors: options.use_cors,
            allow_taint: options.allow_taint,
            image_timeout: options.image_timeout,
            chrome_hidden: chrome_hidden(document),
            cloned_fonts,
        };
        trace!(?record, call, "Recording capture");
        self.records.lock().unwrap().push(record);

        if let Some(error) = self.scripted_failure(call) {
            debug!(call, %error, "Mock capture failing");
            return Err(error);
        }

        let (width, height) = options.canvas_size();
        let fill = options.background.unwrap_or(MOCK_FILL);
        Ok(RasterImage::new(RgbaImage::from_pixel(width, height, fill)))
    }
}
