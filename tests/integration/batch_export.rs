//! Batch export of every slide.

use flashpost::download::DeliveryPath;
use flashpost::error::{CaptureErrorKind, ErrorKind, FpError};
use flashpost::export::{ExportFormat, ExportRequest};
use flashpost::notify::{Severity, StatCounter};
use flashpost::slides::SlideStore;

use crate::common::{CountingStore, Harness, chrome_state, init_test_logging, store};

fn request() -> ExportRequest {
    ExportRequest::new(ExportFormat::Png, 120, 120, 1.0)
}

#[tokio::test]
async fn test_third_of_five_failing() {
    init_test_logging();
    let h = Harness::new();
    h.rasterizer
        .fail_on_call(3, FpError::capture(CaptureErrorKind::CrossOrigin, "tainted canvas"));
    let mut store = CountingStore::new(store(5, 120, 120));
    store.set_active(1).unwrap();
    store.switches.clear();

    let report = h.exporter.export_all_slides(&mut store, &request()).await.unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.summary(), "4/5 slides exported");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].slide, 3);
    assert_eq!(
        report.failed[0].kind,
        ErrorKind::Rasterization(CaptureErrorKind::CrossOrigin)
    );
    let slides: Vec<usize> = report.exported.iter().map(|o| o.slide).collect();
    assert_eq!(slides, vec![1, 2, 4, 5]);

    let warnings = h.notifier.toasts(Severity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Slide 3 failed:"));
    assert!(warnings[0].contains("cross-origin"));
    assert_eq!(
        h.notifier.toasts(Severity::Success).last().map(String::as_str),
        Some("4/5 slides exported")
    );

    // Five switches, then back to the slide that was active.
    assert_eq!(store.switches, vec![0, 1, 2, 3, 4, 1]);
    assert_eq!(store.active_index(), 1);
    assert_eq!(h.sink.delivered().len(), 4);
    assert_eq!(h.notifier.stats_count(StatCounter::Exports), 4);
    assert!(h.notifier.prompts().is_empty());
}

#[tokio::test]
async fn test_all_failing_still_restores() {
    let h = Harness::new();
    h.rasterizer.fail_always(CaptureErrorKind::Network);
    let mut store = CountingStore::new(store(3, 120, 120));
    store.set_active(2).unwrap();
    store.switches.clear();

    let report = h.exporter.export_all_slides(&mut store, &request()).await.unwrap();

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed.len(), 3);
    assert!(!report.is_success());
    assert_eq!(store.switches, vec![0, 1, 2, 2]);
    assert_eq!(store.active_index(), 2);
    assert_eq!(
        h.notifier.toasts(Severity::Error),
        vec!["No slides were exported (0/3 slides exported)"]
    );
    assert!(h.notifier.toasts(Severity::Success).is_empty());
    assert_eq!(h.notifier.progress().last(), Some(&100));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100() {
    let h = Harness::new();
    let mut store = store(4, 120, 120);

    h.exporter.export_all_slides(&mut store, &request()).await.unwrap();

    let progress = h.notifier.progress();
    assert_eq!(progress, vec![10, 30, 50, 70, 100]);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.iter().filter(|p| **p == 100).count(), 1);
}

#[tokio::test]
async fn test_every_capture_hides_chrome() {
    let h = Harness::new();
    let mut store = store(3, 120, 120);
    let before = chrome_state(store.document());

    h.exporter.export_all_slides(&mut store, &request()).await.unwrap();

    let captures = h.rasterizer.captures();
    assert_eq!(captures.len(), 3);
    assert!(captures.iter().all(|c| c.chrome_hidden));
    assert_eq!(chrome_state(store.document()), before);
}

#[tokio::test]
async fn test_batch_pdf_uses_document_path() {
    let h = Harness::new();
    let mut store = store(2, 120, 120);
    let request = ExportRequest::new(ExportFormat::Pdf, 120, 120, 1.0);

    let report = h.exporter.export_all_slides(&mut store, &request).await.unwrap();

    assert!(report.is_success());
    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|d| d.path == DeliveryPath::Document));
    assert!(delivered[0].filename.starts_with("flashpost_slide_1_"));
    assert!(delivered[1].filename.starts_with("flashpost_slide_2_"));
}

#[tokio::test]
async fn test_empty_deck_fails_before_switching() {
    let h = Harness::new();
    let mut store = CountingStore::new(store(0, 120, 120));

    let err = h
        .exporter
        .export_all_slides(&mut store, &request())
        .await
        .unwrap_err();

    assert!(matches!(err, FpError::NoSlides));
    assert!(store.switches.is_empty());
    assert_eq!(h.notifier.toasts(Severity::Error).len(), 1);
    assert!(h.notifier.progress().is_empty());
}

#[tokio::test]
async fn test_invalid_request_fails_before_switching() {
    let h = Harness::new();
    let mut store = CountingStore::new(store(2, 120, 120));

    let err = h
        .exporter
        .export_all_slides(&mut store, &ExportRequest::new(ExportFormat::Png, 120, 120, 0.0))
        .await
        .unwrap_err();

    assert!(matches!(err, FpError::InvalidRequest(_)));
    assert!(store.switches.is_empty());
    assert_eq!(h.rasterizer.capture_count(), 0);
}
