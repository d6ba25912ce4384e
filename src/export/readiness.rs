//! Pre-export checks and the diagnostic smoke test.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{ExportFormat, Exporter};
use crate::document::{Document, Element, Rect, Style, WHITE};
use crate::raster::CaptureOptions;
use crate::slides::{SLIDE_CONTAINER_SELECTOR, SlideStore};

const PROBE_SIZE: u32 = 100;

/// Whether an export could start right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub issues: Vec<String>,
}

/// Result of rasterizing a throwaway probe element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SmokeTest {
    Passed { width: u32, height: u32 },
    Failed { error: String },
    /// No rasterizer to test.
    Skipped,
}

/// Full diagnosis: readiness for every format plus the smoke test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rasterizer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_backend: Option<String>,
    pub slide_count: usize,
    pub readiness: ReadinessReport,
    pub smoke_test: SmokeTest,
}

impl Diagnosis {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.readiness.ready && matches!(self.smoke_test, SmokeTest::Passed { .. })
    }
}

impl Exporter {
    /// List what would stop an export in `format`, in check order.
    #[must_use]
    pub fn check_export_readiness(
        &self,
        store: &dyn SlideStore,
        format: ExportFormat,
    ) -> ReadinessReport {
        let mut issues = Vec::new();
        if self.rasterizer.is_none() {
            issues.push("Rasterizer not available".to_string());
        }
        if format == ExportFormat::Pdf && self.pdf.is_none() {
            issues.push("PDF engine not available".to_string());
        }
        if store.slides().is_empty() {
            issues.push("No slides to export".to_string());
        }
        if store.document().query(SLIDE_CONTAINER_SELECTOR).is_none() {
            issues.push(format!("Slide container ({SLIDE_CONTAINER_SELECTOR}) not found"));
        }
        ReadinessReport {
            ready: issues.is_empty(),
            issues,
        }
    }

    /// Readiness for PDF (the strictest format) plus a probe capture.
    ///
    /// The probe lives in a scratch document, so slide content is never
    /// touched.
    #[instrument(skip(self, store))]
    pub fn diagnose_export_issues(&self, store: &dyn SlideStore) -> Diagnosis {
        let readiness = self.check_export_readiness(store, ExportFormat::Pdf);
        for issue in &readiness.issues {
            warn!(issue, "Export readiness issue");
        }

        let smoke_test = self.run_smoke_test();
        info!(?smoke_test, ready = readiness.ready, "Export diagnosis complete");

        Diagnosis {
            rasterizer: self.rasterizer.as_ref().map(|r| r.name().to_string()),
            pdf_backend: self.pdf.as_ref().map(|p| p.name().to_string()),
            slide_count: store.slides().len(),
            readiness,
            smoke_test,
        }
    }

    fn run_smoke_test(&self) -> SmokeTest {
        let Some(rasterizer) = &self.rasterizer else {
            return SmokeTest::Skipped;
        };

        let mut scratch = Document::new();
        let root = scratch.root();
        let Some(probe) = scratch.append(
            root,
            Element::new("div")
                .with_id("export-probe")
                .with_style(Style::new().background(WHITE))
                .with_rect(Rect::sized(PROBE_SIZE as f32, PROBE_SIZE as f32))
                .with_text("Test"),
        ) else {
            return SmokeTest::Failed {
                error: "could not build probe element".to_string(),
            };
        };

        let options = CaptureOptions {
            background: Some(WHITE),
            scale: 1.0,
            width: PROBE_SIZE,
            height: PROBE_SIZE,
            image_timeout: self.timings.image_timeout,
            ..CaptureOptions::default()
        };
        let result = match rasterizer.capture(&scratch, probe, &options) {
            Ok(image) if !image.is_empty() => SmokeTest::Passed {
                width: image.width(),
                height: image.height(),
            },
            Ok(image) => SmokeTest::Failed {
                error: format!("probe rendered {}x{}", image.width(), image.height()),
            },
            Err(err) => SmokeTest::Failed {
                error: err.to_string(),
            },
        };
        scratch.remove(probe);
        result
    }
}
