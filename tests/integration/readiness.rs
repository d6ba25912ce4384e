//! Readiness checks and diagnosis.

use flashpost::error::CaptureErrorKind;
use flashpost::export::{ExportFormat, SmokeTest};
use flashpost::slides::SlideStore;

use crate::common::{Harness, chrome_state, store};

#[test]
fn test_ready_with_engines_and_slides() {
    let h = Harness::new();
    let store = store(2, 100, 100);
    for format in [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Pdf] {
        let report = h.exporter.check_export_readiness(&store, format);
        assert!(report.ready, "{format}: {:?}", report.issues);
        assert!(report.issues.is_empty());
    }
}

#[test]
fn test_issues_listed_in_order() {
    let h = Harness::without_engines();
    let store = store(0, 100, 100);

    let report = h.exporter.check_export_readiness(&store, ExportFormat::Pdf);
    assert!(!report.ready);
    assert_eq!(
        report.issues,
        vec![
            "Rasterizer not available",
            "PDF engine not available",
            "No slides to export",
            "Slide container (#slide-container) not found",
        ]
    );

    // The PDF engine only matters for PDF.
    let report = h.exporter.check_export_readiness(&store, ExportFormat::Png);
    assert_eq!(report.issues.len(), 3);
    assert!(!report.issues.iter().any(|i| i.contains("PDF")));
}

#[test]
fn test_diagnosis_probe_leaves_slides_alone() {
    let h = Harness::new();
    let store = store(3, 100, 100);
    let before = chrome_state(store.document());
    let elements = store.document().descendants(store.document().root()).len();

    let diagnosis = h.exporter.diagnose_export_issues(&store);

    assert!(diagnosis.is_healthy());
    assert_eq!(
        diagnosis.smoke_test,
        SmokeTest::Passed {
            width: 100,
            height: 100
        }
    );
    assert_eq!(diagnosis.rasterizer.as_deref(), Some("mock"));
    assert_eq!(diagnosis.slide_count, 3);
    assert_eq!(h.rasterizer.capture_count(), 1);
    assert_eq!(chrome_state(store.document()), before);
    assert_eq!(
        store.document().descendants(store.document().root()).len(),
        elements
    );
    assert!(store.document().query("#export-probe").is_none());
}

#[test]
fn test_diagnosis_reports_failed_probe() {
    let h = Harness::new();
    h.rasterizer.fail_always(CaptureErrorKind::Memory);
    let store = store(1, 100, 100);

    let diagnosis = h.exporter.diagnose_export_issues(&store);

    assert!(diagnosis.readiness.ready);
    assert!(matches!(diagnosis.smoke_test, SmokeTest::Failed { .. }));
    assert!(!diagnosis.is_healthy());
}

#[test]
fn test_diagnosis_without_engines_skips_probe() {
    let h = Harness::without_engines();
    let store = store(1, 100, 100);

    let diagnosis = h.exporter.diagnose_export_issues(&store);

    assert_eq!(diagnosis.smoke_test, SmokeTest::Skipped);
    assert!(diagnosis.rasterizer.is_none());
    assert!(diagnosis.pdf_backend.is_none());
    assert_eq!(diagnosis.readiness.issues.len(), 2);

    let json = serde_json::to_value(&diagnosis).unwrap();
    assert_eq!(json["smoke_test"]["status"], "skipped");
    assert!(json.get("rasterizer").is_none());
}
