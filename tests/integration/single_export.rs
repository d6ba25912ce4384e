//! Single-slide export through the mock collaborators.

use std::time::Duration;

use flashpost::document::WHITE;
use flashpost::download::DeliveryPath;
use flashpost::error::{CaptureErrorKind, Dependency, FpError};
use flashpost::export::{ExportFormat, ExportRequest, ExportTimings};
use flashpost::notify::{Severity, StatCounter};
use flashpost::raster::mock::MOCK_FILL;
use flashpost::slides::SlideStore;

use crate::common::{Harness, chrome_state, init_test_logging, store};

const RETRY_QUESTION: &str = "Export failed. Retry with lower quality settings?";

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

#[tokio::test]
async fn test_png_export_delivers_one_artifact() {
    init_test_logging();
    let h = Harness::new();
    let mut store = store(3, 1080, 1080);
    store.set_active(2).unwrap();
    store.render().unwrap();
    let before = chrome_state(store.document());
    assert!(!before.is_empty());

    let outcome = h
        .exporter
        .export_single_slide(&mut store, &ExportRequest::default())
        .await
        .unwrap();

    assert_eq!(outcome.slide, 3);
    assert!(!outcome.degraded);
    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].path, DeliveryPath::Download);
    assert!(delivered[0].filename.starts_with("flashpost_slide_3_"));
    assert!(delivered[0].filename.ends_with(".png"));

    assert_eq!(h.notifier.toasts(Severity::Success), vec!["Slide 3 exported as PNG"]);
    assert_eq!(h.notifier.stats_count(StatCounter::Exports), 1);
    assert!(h.notifier.loading_cleared());
    assert!(h.notifier.prompts().is_empty());

    let capture = h.rasterizer.last_capture().unwrap();
    assert!(capture.chrome_hidden);
    assert!(capture.use_cors);
    assert_eq!(capture.background, None);
    assert_eq!(capture.image_timeout, Duration::from_secs(15));
    assert_eq!(chrome_state(store.document()), before);
}

#[tokio::test]
async fn test_loading_message_names_slide_and_format() {
    let h = Harness::new();
    let mut store = store(2, 300, 300);
    let request = ExportRequest::new(ExportFormat::Jpeg, 300, 300, 1.0);
    h.exporter.export_single_slide(&mut store, &request).await.unwrap();

    let first = h.notifier.events().into_iter().next().unwrap();
    assert_eq!(
        first,
        flashpost::notify::mock::NotifyEvent::Loading {
            active: true,
            message: Some("Exporting slide 1 as JPEG...".to_string()),
        }
    );
}

#[tokio::test]
async fn test_png_keeps_transparency() {
    let h = Harness::new();
    let mut store = store(1, 100, 100);
    let request = ExportRequest::new(ExportFormat::Png, 100, 100, 1.0);
    h.exporter.export_single_slide(&mut store, &request).await.unwrap();

    let bytes = &h.sink.delivered()[0].bytes;
    let decoded = image::load_from_memory(bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (100, 100));
    assert_eq!(*decoded.get_pixel(0, 0), MOCK_FILL);
}

#[tokio::test]
async fn test_jpeg_renders_on_white() {
    let h = Harness::new();
    let mut store = store(1, 64, 64);
    let request = ExportRequest::new(ExportFormat::Jpeg, 64, 64, 1.0);
    h.exporter.export_single_slide(&mut store, &request).await.unwrap();

    assert_eq!(h.rasterizer.last_capture().unwrap().background, Some(WHITE));
    let delivered = &h.sink.delivered()[0];
    assert!(delivered.filename.ends_with(".jpg"));
    let decoded = image::load_from_memory(&delivered.bytes).unwrap().to_rgb8();
    assert!(decoded.pixels().all(|p| p.0.iter().all(|c| *c >= 250)));
}

#[tokio::test]
async fn test_scale_never_exceeds_three() {
    let h = Harness::new();
    let mut store = store(1, 50, 50);
    let request = ExportRequest::new(ExportFormat::Png, 50, 50, 5.0);
    h.exporter.export_single_slide(&mut store, &request).await.unwrap();

    let capture = h.rasterizer.last_capture().unwrap();
    assert!((capture.scale - 3.0).abs() < f32::EPSILON);
    let decoded = image::load_from_memory(&h.sink.delivered()[0].bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (150, 150));
}

#[tokio::test]
async fn test_pdf_goes_to_document_path() {
    let h = Harness::new();
    let mut store = store(1, 1080, 1080);
    let request = ExportRequest::new(ExportFormat::Pdf, 1080, 1080, 1.0);
    h.exporter.export_single_slide(&mut store, &request).await.unwrap();

    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].path, DeliveryPath::Document);
    assert!(delivered[0].filename.ends_with(".pdf"));
    assert!(delivered[0].bytes.starts_with(b"%PDF-1.4"));
    assert!(contains(&delivered[0].bytes, "/MediaBox [0 0 810 810]"));
    // Transparency survives as a soft mask.
    assert_eq!(h.rasterizer.last_capture().unwrap().background, None);
    assert!(contains(&delivered[0].bytes, "/SMask"));
}

#[tokio::test]
async fn test_wide_pdf_is_landscape_sized() {
    let h = Harness::new();
    let mut store = store(1, 1920, 1080);
    let request = ExportRequest::new(ExportFormat::Pdf, 1920, 1080, 1.0);
    h.exporter.export_single_slide(&mut store, &request).await.unwrap();

    let bytes = &h.sink.delivered()[0].bytes;
    assert!(contains(bytes, "/MediaBox [0 0 1440 810]"));
}

#[tokio::test]
async fn test_clone_hook_inlines_fonts() {
    let h = Harness::new();
    let mut store = store(1, 200, 200);
    h.exporter
        .export_single_slide(&mut store, &ExportRequest::new(ExportFormat::Png, 200, 200, 1.0))
        .await
        .unwrap();

    let capture = h.rasterizer.last_capture().unwrap();
    assert!(!capture.cloned_fonts.is_empty());
    assert!(capture.cloned_fonts.iter().all(Option::is_some));
    assert_eq!(capture.cloned_fonts[0].as_deref(), Some("Inter, sans-serif"));
}

#[tokio::test]
async fn test_failure_restores_chrome_and_prompts_once() {
    let h = Harness::new();
    h.rasterizer.fail_always(CaptureErrorKind::Memory);
    let mut store = store(2, 400, 400);
    let before = chrome_state(store.document());

    let err = h
        .exporter
        .export_single_slide(&mut store, &ExportRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FpError::Rasterization {
            kind: CaptureErrorKind::Memory,
            ..
        }
    ));
    assert_eq!(chrome_state(store.document()), before);
    assert!(h.notifier.loading_cleared());
    assert_eq!(h.notifier.prompts(), vec![RETRY_QUESTION]);
    assert_eq!(h.notifier.toasts(Severity::Error), vec![err.diagnostic()]);
    // Declined, so only the first attempt ran.
    assert_eq!(h.rasterizer.capture_count(), 1);
    assert!(h.sink.delivered().is_empty());
    assert_eq!(h.notifier.stats_count(StatCounter::Exports), 0);
}

#[tokio::test]
async fn test_accepted_retry_uses_degraded_settings() {
    let h = Harness::new();
    h.rasterizer
        .fail_on_call(1, FpError::capture(CaptureErrorKind::Network, "image 404"));
    h.notifier.answer_next(true);
    let mut store = store(1, 1080, 1350);
    let request = ExportRequest::new(ExportFormat::Jpeg, 1080, 1350, 2.0);

    let outcome = h.exporter.export_single_slide(&mut store, &request).await.unwrap();

    assert!(outcome.degraded);
    assert_eq!((outcome.width, outcome.height), (720, 720));
    assert_eq!(outcome.format, ExportFormat::Jpeg);
    let captures = h.rasterizer.captures();
    assert_eq!(captures.len(), 2);
    assert!((captures[1].scale - 1.0).abs() < f32::EPSILON);
    assert_eq!((captures[1].width, captures[1].height), (720, 720));
    assert_eq!(h.sink.delivered().len(), 1);
    assert_eq!(h.notifier.stats_count(StatCounter::Exports), 1);
}

#[tokio::test]
async fn test_failed_retry_reports_and_stops() {
    let h = Harness::new();
    h.rasterizer.fail_always(CaptureErrorKind::Timeout);
    h.notifier.answer_next(true);
    let mut store = store(1, 100, 100);

    let err = h
        .exporter
        .export_single_slide(&mut store, &ExportRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FpError::Rasterization { .. }));
    let errors = h.notifier.toasts(Severity::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors[1].starts_with("Retry failed."));
    assert_eq!(h.notifier.prompts().len(), 1);
    assert_eq!(h.rasterizer.capture_count(), 2);
}

#[tokio::test]
async fn test_missing_rasterizer_changes_nothing() {
    let h = Harness::without_engines();
    let mut store = store(1, 100, 100);
    let before = chrome_state(store.document());

    let err = h
        .exporter
        .export_single_slide(&mut store, &ExportRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FpError::DependencyMissing {
            dependency: Dependency::Rasterizer
        }
    ));
    assert_eq!(chrome_state(store.document()), before);
    assert!(h.notifier.toasts(Severity::Error)[0].contains("rendering engine"));
}

#[tokio::test]
async fn test_pdf_without_backend() {
    use std::sync::Arc;

    use flashpost::download::MemorySink;
    use flashpost::export::Exporter;
    use flashpost::notify::mock::RecordingNotifier;
    use flashpost::raster::mock::MockRasterizer;

    let rasterizer = Arc::new(MockRasterizer::new());
    let exporter = Exporter::new(Arc::new(RecordingNotifier::new()), Arc::new(MemorySink::new()))
        .with_rasterizer(rasterizer.clone())
        .with_timings(ExportTimings::immediate());
    let mut store = store(1, 100, 100);

    let err = exporter
        .export_single_slide(&mut store, &ExportRequest::new(ExportFormat::Pdf, 100, 100, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FpError::DependencyMissing {
            dependency: Dependency::PdfEngine
        }
    ));
    assert_eq!(rasterizer.capture_count(), 0);

    // PNG still works with the same exporter.
    exporter
        .export_single_slide(&mut store, &ExportRequest::new(ExportFormat::Png, 100, 100, 1.0))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_container_is_element_not_found() {
    let h = Harness::new();
    let mut store = store(0, 100, 100);

    let err = h
        .exporter
        .export_single_slide(&mut store, &ExportRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FpError::ElementNotFound { ref selector } if selector == "#slide-container"));
    assert_eq!(h.rasterizer.capture_count(), 0);
}

#[tokio::test]
async fn test_invalid_request_rejected_before_capture() {
    let h = Harness::new();
    let mut store = store(1, 100, 100);
    let err = h
        .exporter
        .export_single_slide(&mut store, &ExportRequest::new(ExportFormat::Png, 0, 100, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, FpError::InvalidRequest(_)));
    assert_eq!(h.rasterizer.capture_count(), 0);
}

#[tokio::test]
async fn test_download_failure_is_reported() {
    let h = Harness::new();
    h.sink.fail_next();
    let mut store = store(1, 100, 100);
    let before = chrome_state(store.document());

    let err = h
        .exporter
        .export_single_slide(&mut store, &ExportRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FpError::DownloadFailed { .. }));
    assert_eq!(chrome_state(store.document()), before);
    assert_eq!(h.notifier.stats_count(StatCounter::Exports), 0);
}

#[tokio::test]
async fn test_overlapping_export_rejected() {
    let h = Harness::new();
    let exporter = h.exporter.with_timings(ExportTimings {
        settle: Duration::from_millis(50),
        ..ExportTimings::immediate()
    });
    let mut first = store(1, 100, 100);
    let mut second = store(1, 100, 100);
    let second_before = chrome_state(second.document());
    let request = ExportRequest::new(ExportFormat::Png, 100, 100, 1.0);

    let (a, b) = tokio::join!(
        exporter.export_single_slide(&mut first, &request),
        exporter.export_single_slide(&mut second, &request),
    );

    assert!(a.is_ok());
    assert!(matches!(b, Err(FpError::ExportInProgress)));
    assert_eq!(chrome_state(second.document()), second_before);
    assert_eq!(h.rasterizer.capture_count(), 1);
    assert!(!exporter.is_busy());
}
