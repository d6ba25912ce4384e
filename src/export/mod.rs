//! Slide export orchestration.
//!
//! [`Exporter`] turns the active slide into a PNG, JPEG or PDF file: it hides
//! the carousel chrome, waits for layout to settle, rasterizes the slide
//! container, restores the chrome, encodes, and hands the result to the
//! download sink. Failures are mapped to user diagnostics by error kind and
//! offer one retry with degraded settings.
//!
//! Batch export and the readiness/diagnosis checks live in submodules but
//! share the same [`Exporter`].

mod batch;
mod readiness;

pub use batch::{BatchReport, SlideFailure};
pub use readiness::{Diagnosis, ReadinessReport, SmokeTest};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::chrome::ChromeGuard;
use crate::document::{ClonedSubtree, Document, ElementId, WHITE};
use crate::download::{DownloadSink, ExportedArtifact};
use crate::error::{CaptureErrorKind, Dependency, FpError, Result};
use crate::image_ops::{JPEG_QUALITY, encode_jpeg, encode_png};
use crate::notify::{Notifier, Severity, StatCounter};
use crate::pdf::{ImagePlacement, Orientation, PdfBackend, PdfOptions, Unit};
use crate::raster::{CaptureOptions, CloneHook, Rasterizer};
use crate::slides::{SLIDE_CONTAINER_SELECTOR, SlideStore};

/// Upper bound on the device pixel ratio handed to the rasterizer.
pub const MAX_SCALE: f32 = 3.0;
/// Width and height used by the degraded retry.
pub const DEGRADED_SIZE: u32 = 720;

const RETRY_QUESTION: &str = "Export failed. Retry with lower quality settings?";

/// Output file format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    #[value(alias = "jpg")]
    #[serde(alias = "jpg")]
    Jpeg,
    Pdf,
}

impl ExportFormat {
    /// File suffix including the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
            Self::Pdf => ".pdf",
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Pdf => "PDF",
        })
    }
}

/// Format plus output geometry for one export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    /// Output width in CSS pixels.
    pub width: u32,
    /// Output height in CSS pixels.
    pub height: u32,
    /// Requested device pixel ratio.
    pub scale: f32,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self::new(ExportFormat::Png, 1080, 1080, 2.0)
    }
}

impl ExportRequest {
    #[must_use]
    pub const fn new(format: ExportFormat, width: u32, height: u32, scale: f32) -> Self {
        Self {
            format,
            width,
            height,
            scale,
        }
    }

    /// Reject zero dimensions and non-positive or non-finite scales.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FpError::InvalidRequest(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(FpError::InvalidRequest(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Scale handed to the rasterizer, capped at [`MAX_SCALE`].
    #[must_use]
    pub fn effective_scale(&self) -> f32 {
        self.scale.min(MAX_SCALE)
    }

    /// Same format at scale 1 and [`DEGRADED_SIZE`] square.
    #[must_use]
    pub const fn degraded(&self) -> Self {
        Self::new(self.format, DEGRADED_SIZE, DEGRADED_SIZE, 1.0)
    }
}

/// Delays the export pipeline waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTimings {
    /// After hiding chrome, before capture.
    pub settle: Duration,
    /// After switching slides in a batch.
    pub render_settle: Duration,
    /// Between batch slides.
    pub between_slides: Duration,
    /// Before offering the degraded retry.
    pub retry_prompt: Duration,
    /// Per-image load budget passed to the rasterizer.
    pub image_timeout: Duration,
}

impl Default for ExportTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(300),
            render_settle: Duration::from_millis(500),
            between_slides: Duration::from_millis(300),
            retry_prompt: Duration::from_millis(500),
            image_timeout: Duration::from_secs(15),
        }
    }
}

impl ExportTimings {
    /// No waiting at all; the image timeout keeps its default.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            render_settle: Duration::ZERO,
            between_slides: Duration::ZERO,
            retry_prompt: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// File name for slide `index` (zero-based) exported at `at`.
///
/// `flashpost_slide_3_2026-10-19T08-15-02.png`
#[must_use]
pub fn export_filename(index: usize, format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "flashpost_slide_{}_{}{}",
        index + 1,
        at.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

/// Copy every cloned element's computed font family onto its inline style.
///
/// Cloning detaches the slide from the page-level styles it inherited;
/// inlining keeps the rendered text in the fonts the user sees.
pub fn inline_resolved_fonts(source: &Document, clone: &mut ClonedSubtree) {
    for id in clone.elements() {
        let Some(origin) = clone.origin_of(id) else {
            continue;
        };
        let family = source.resolved_font_family(origin);
        if let Some(element) = clone.document.get_mut(id) {
            element.style.font_family = Some(family);
        }
    }
}

/// Result of a delivered single-slide export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    /// One-based slide number.
    pub slide: usize,
    pub filename: String,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    /// Encoded size in bytes.
    pub size: usize,
    /// Produced by the degraded retry.
    pub degraded: bool,
}

/// Export orchestrator.
///
/// Admits one export at a time; an overlapping call fails with
/// [`FpError::ExportInProgress`] before touching the document.
pub struct Exporter {
    rasterizer: Option<Arc<dyn Rasterizer>>,
    pdf: Option<Arc<dyn PdfBackend>>,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn DownloadSink>,
    timings: ExportTimings,
    busy: AtomicBool,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("rasterizer", &self.rasterizer.as_ref().map(|r| r.name().to_string()))
            .field("pdf", &self.pdf.as_ref().map(|p| p.name().to_string()))
            .field("timings", &self.timings)
            .field("busy", &self.busy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Clears the busy flag when an export ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Exporter {
    /// Exporter with no rasterizer or PDF backend registered.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, sink: Arc<dyn DownloadSink>) -> Self {
        Self {
            rasterizer: None,
            pdf: None,
            notifier,
            sink,
            timings: ExportTimings::default(),
            busy: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    #[must_use]
    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf = Some(backend);
        self
    }

    #[must_use]
    pub const fn with_timings(mut self, timings: ExportTimings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub const fn timings(&self) -> &ExportTimings {
        &self.timings
    }

    /// True while an export is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard<'_>> {
        if self.busy.swap(true, Ordering::AcqRel) {
            warn!("Rejecting overlapping export");
            return Err(FpError::ExportInProgress);
        }
        Ok(BusyGuard(&self.busy))
    }

    /// Export the active slide, offering one degraded retry on failure.
    #[instrument(skip(self, store), fields(slide = store.active_index() + 1))]
    pub async fn export_single_slide(
        &self,
        store: &mut dyn SlideStore,
        request: &ExportRequest,
    ) -> Result<ExportOutcome> {
        let _busy = self.begin()?;

        let err = match self.export_with_loading(store, request).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) => err,
        };
        error!(error = %err, kind = ?err.kind(), "Export failed");
        self.notifier.show_toast(err.diagnostic(), Severity::Error);

        sleep(self.timings.retry_prompt).await;
        if !self.notifier.confirm(RETRY_QUESTION) {
            debug!("Degraded retry declined");
            return Err(err);
        }

        let degraded = request.degraded();
        info!(?degraded, "Retrying with degraded settings");
        match self.export_with_loading(store, &degraded).await {
            Ok(outcome) => Ok(ExportOutcome {
                degraded: true,
                ..outcome
            }),
            Err(retry_err) => {
                error!(error = %retry_err, "Degraded retry failed");
                self.notifier.show_toast(
                    &format!("Retry failed. {}", retry_err.diagnostic()),
                    Severity::Error,
                );
                Err(retry_err)
            }
        }
    }

    async fn export_with_loading(
        &self,
        store: &mut dyn SlideStore,
        request: &ExportRequest,
    ) -> Result<ExportOutcome> {
        let result: Result<ExportOutcome> = async {
            let (rasterizer, target) = self.preflight(store, request)?;
            self.notifier.show_loading(
                true,
                Some(&format!(
                    "Exporting slide {} as {}...",
                    store.active_index() + 1,
                    request.format
                )),
            );
            let artifact = self.produce(store, rasterizer.as_ref(), target, request).await?;
            Ok(Self::outcome(store.active_index(), request, &artifact))
        }
        .await;
        self.notifier.show_loading(false, None);

        if let Ok(outcome) = &result {
            self.notifier.show_toast(
                &format!("Slide {} exported as {}", outcome.slide, outcome.format),
                Severity::Success,
            );
            self.notifier.update_stats(StatCounter::Exports);
        }
        result
    }

    /// Export the active slide once: no loading indicator, toasts or retry.
    pub(crate) async fn export_once(
        &self,
        store: &mut dyn SlideStore,
        request: &ExportRequest,
    ) -> Result<ExportOutcome> {
        let (rasterizer, target) = self.preflight(store, request)?;
        let artifact = self.produce(store, rasterizer.as_ref(), target, request).await?;
        Ok(Self::outcome(store.active_index(), request, &artifact))
    }

    fn outcome(
        index: usize,
        request: &ExportRequest,
        artifact: &ExportedArtifact,
    ) -> ExportOutcome {
        ExportOutcome {
            slide: index + 1,
            filename: artifact.filename.clone(),
            format: request.format,
            width: request.width,
            height: request.height,
            size: artifact.bytes.len(),
            degraded: false,
        }
    }

    /// Checks that must pass before anything on screen changes.
    fn preflight(
        &self,
        store: &dyn SlideStore,
        request: &ExportRequest,
    ) -> Result<(Arc<dyn Rasterizer>, ElementId)> {
        let rasterizer = self
            .rasterizer
            .clone()
            .ok_or(FpError::DependencyMissing {
                dependency: Dependency::Rasterizer,
            })?;
        if request.format == ExportFormat::Pdf && self.pdf.is_none() {
            return Err(FpError::DependencyMissing {
                dependency: Dependency::PdfEngine,
            });
        }
        let target = store
            .document()
            .query(SLIDE_CONTAINER_SELECTOR)
            .ok_or_else(|| FpError::ElementNotFound {
                selector: SLIDE_CONTAINER_SELECTOR.to_string(),
            })?;
        request.validate()?;
        Ok((rasterizer, target))
    }

    /// Hide chrome, capture, restore, encode, deliver.
    #[instrument(skip(self, store, rasterizer), fields(engine = rasterizer.name()))]
    async fn produce(
        &self,
        store: &mut dyn SlideStore,
        rasterizer: &dyn Rasterizer,
        target: ElementId,
        request: &ExportRequest,
    ) -> Result<ExportedArtifact> {
        let hook: &CloneHook = &inline_resolved_fonts;
        let options = CaptureOptions {
            background: (request.format == ExportFormat::Jpeg).then_some(WHITE),
            scale: request.effective_scale(),
            width: request.width,
            height: request.height,
            use_cors: true,
            allow_taint: false,
            image_timeout: self.timings.image_timeout,
            on_clone: Some(hook),
        };
        let filename = export_filename(store.active_index(), request.format, Utc::now());

        let captured = {
            let guard = ChromeGuard::hide(store.document_mut());
            debug!(hidden = guard.saved().len(), "Chrome hidden");
            sleep(self.timings.settle).await;
            rasterizer.capture(guard.document(), target, &options)
        };
        let image = captured?;
        if image.is_empty() {
            return Err(FpError::capture(
                CaptureErrorKind::EmptyImage,
                format!("capture produced {}x{}", image.width(), image.height()),
            ));
        }
        debug!(width = image.width(), height = image.height(), "Captured slide");

        let pixels = image.into_pixels();
        let bytes = match request.format {
            ExportFormat::Png => encode_png(&pixels)?,
            ExportFormat::Jpeg => encode_jpeg(&pixels, JPEG_QUALITY)?,
            ExportFormat::Pdf => self.assemble_pdf(&pixels, request)?,
        };
        let artifact = ExportedArtifact {
            filename,
            format: request.format,
            bytes,
        };

        match request.format {
            ExportFormat::Pdf => self.sink.save_document(&artifact.filename, &artifact.bytes)?,
            ExportFormat::Png | ExportFormat::Jpeg => self.sink.download(&artifact)?,
        }
        info!(filename = %artifact.filename, size = artifact.bytes.len(), "Slide exported");
        Ok(artifact)
    }

    fn assemble_pdf(&self, pixels: &RgbaImage, request: &ExportRequest) -> Result<Vec<u8>> {
        let backend = self.pdf.as_ref().ok_or(FpError::DependencyMissing {
            dependency: Dependency::PdfEngine,
        })?;
        let (w, h) = (request.width as f32, request.height as f32);
        let mut doc = backend.create_document(&PdfOptions {
            orientation: Orientation::for_size(request.width, request.height),
            unit: Unit::Px,
            page_size: (w, h),
            compress: true,
        });
        let (page_w, page_h) = doc.page_size();
        doc.add_image(pixels, ImagePlacement::full_page(page_w, page_h))?;
        doc.finish()
    }
}
