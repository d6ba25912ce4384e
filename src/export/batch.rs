//! Sequential export of every slide in the store.

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::{ExportOutcome, ExportRequest, Exporter};
use crate::error::{ErrorKind, FpError, Result};
use crate::notify::{Severity, StatCounter};
use crate::slides::SlideStore;

/// One slide that did not export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideFailure {
    /// One-based slide number.
    pub slide: usize,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of [`Exporter::export_all_slides`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<SlideFailure>,
    pub exported: Vec<ExportOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// `"{succeeded}/{total} slides exported"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{}/{} slides exported", self.succeeded, self.total)
    }
}

/// Progress for slide `index` of `total`: spread over 10..=90.
fn batch_progress(index: usize, total: usize) -> u8 {
    let fraction = index as f64 / total as f64;
    ((fraction * 80.0).round() as u8).saturating_add(10)
}

impl Exporter {
    /// Export every slide in order, then restore the slide that was active.
    ///
    /// Per-slide failures are reported and skipped; the batch itself only
    /// fails when it cannot start.
    #[instrument(skip(self, store), fields(total = store.slides().len()))]
    pub async fn export_all_slides(
        &self,
        store: &mut dyn SlideStore,
        request: &ExportRequest,
    ) -> Result<BatchReport> {
        let _busy = self.begin()?;

        let total = store.slides().len();
        if total == 0 {
            self.notifier
                .show_toast("There are no slides to export", Severity::Error);
            return Err(FpError::NoSlides);
        }
        request.validate()?;

        let original = store.active_index();
        let mut report = BatchReport {
            total,
            succeeded: 0,
            failed: Vec::new(),
            exported: Vec::new(),
        };
        info!(total, format = %request.format, "Starting batch export");

        for index in 0..total {
            match self.export_slide_at(store, index, total, request).await {
                Ok(outcome) => {
                    report.succeeded += 1;
                    self.notifier.update_stats(StatCounter::Exports);
                    report.exported.push(outcome);
                }
                Err(err) => {
                    warn!(slide = index + 1, error = %err, "Slide export failed");
                    self.notifier.show_toast(
                        &format!("Slide {} failed: {}", index + 1, err.diagnostic()),
                        Severity::Warning,
                    );
                    report.failed.push(SlideFailure {
                        slide: index + 1,
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
            sleep(self.timings.between_slides).await;
        }

        self.restore_active(store, original);
        self.notifier.update_progress(100, "Export complete");

        if report.succeeded == 0 {
            self.notifier.show_toast(
                &format!("No slides were exported ({})", report.summary()),
                Severity::Error,
            );
        } else {
            self.notifier.show_toast(&report.summary(), Severity::Success);
        }
        info!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Batch export finished"
        );
        Ok(report)
    }

    async fn export_slide_at(
        &self,
        store: &mut dyn SlideStore,
        index: usize,
        total: usize,
        request: &ExportRequest,
    ) -> Result<ExportOutcome> {
        store.set_active(index)?;
        store.render()?;
        self.notifier.update_progress(
            batch_progress(index, total),
            &format!("Exporting slide {} of {total}", index + 1),
        );
        sleep(self.timings.render_settle).await;
        self.export_once(store, request).await
    }

    fn restore_active(&self, store: &mut dyn SlideStore, original: usize) {
        let restored = store.set_active(original).and_then(|()| store.render());
        match restored {
            Ok(()) => debug!(slide = original + 1, "Restored active slide"),
            Err(err) => {
                warn!(slide = original + 1, error = %err, "Could not restore active slide");
                self.notifier.show_toast(
                    &format!("Could not return to slide {}", original + 1),
                    Severity::Warning,
                );
            }
        }
    }
}
