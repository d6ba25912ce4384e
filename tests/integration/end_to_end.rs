//! Deck file to files on disk with the built-in rasterizer, PDF writer and
//! file downloader.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use flashpost::config::load_deck;
use flashpost::download::FileDownloader;
use flashpost::error::{CaptureErrorKind, FpError};
use flashpost::export::{ExportFormat, ExportRequest, ExportTimings, Exporter};
use flashpost::notify::Severity;
use flashpost::notify::mock::RecordingNotifier;
use flashpost::pdf::PdfWriter;
use flashpost::raster::BoxRasterizer;
use flashpost::slides::{DeckStore, SlideStore};
use image::Rgba;

use crate::common::fixtures::DeckDir;

fn exporter(out: &Path) -> (Exporter, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let exporter = Exporter::new(notifier.clone(), Arc::new(FileDownloader::new(out)))
        .with_rasterizer(Arc::new(BoxRasterizer::new()))
        .with_pdf_backend(Arc::new(PdfWriter::new()))
        .with_timings(ExportTimings::immediate());
    (exporter, notifier)
}

fn sorted_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_batch_png_writes_every_slide() {
    let deck_dir = DeckDir::yaml();
    let out = deck_dir.path().join("out");
    let mut store = DeckStore::new(load_deck(deck_dir.deck_path()).unwrap()).unwrap();
    let (exporter, notifier) = exporter(&out);

    let report = exporter
        .export_all_slides(&mut store, &ExportRequest::new(ExportFormat::Png, 200, 200, 2.0))
        .await
        .unwrap();

    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(notifier.toasts(Severity::Success), vec!["3/3 slides exported"]);

    let files = sorted_files(&out);
    assert_eq!(files.len(), 3);
    for (i, name) in files.iter().enumerate() {
        assert!(name.starts_with(&format!("flashpost_slide_{}_", i + 1)), "{name}");
        let img = image::open(out.join(name)).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (400, 400));
        // Slide 2 is covered by its image; the others show the theme
        // background in the corner, with no chrome painted over it.
        let expected = if i == 1 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0x0f, 0x17, 0x2a, 255])
        };
        assert_eq!(*img.get_pixel(1, 1), expected, "{name}");
    }
}

#[tokio::test]
async fn test_single_pdf_written_to_disk() {
    let deck_dir = DeckDir::yaml();
    let out = deck_dir.path().join("pdf");
    let mut store = DeckStore::new(load_deck(deck_dir.deck_path()).unwrap()).unwrap();
    let (exporter, _) = exporter(&out);

    let outcome = exporter
        .export_single_slide(&mut store, &ExportRequest::new(ExportFormat::Pdf, 200, 100, 1.0))
        .await
        .unwrap();

    let bytes = fs::read(out.join(&outcome.filename)).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(
        bytes
            .windows(b"/MediaBox [0 0 150 75]".len())
            .any(|w| w == b"/MediaBox [0 0 150 75]")
    );
    assert_eq!(outcome.size, bytes.len());
}

#[tokio::test]
async fn test_missing_image_is_network_failure() {
    let deck_dir = DeckDir::yaml();
    fs::remove_file(deck_dir.path().join("img/dot.png")).unwrap();
    let out = deck_dir.path().join("out");
    let mut store = DeckStore::new(load_deck(deck_dir.deck_path()).unwrap()).unwrap();
    store.set_active(1).unwrap();
    store.render().unwrap();
    let (exporter, notifier) = exporter(&out);

    let err = exporter
        .export_single_slide(&mut store, &ExportRequest::new(ExportFormat::Png, 200, 200, 1.0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FpError::Rasterization {
            kind: CaptureErrorKind::Network,
            ..
        }
    ));
    assert!(notifier.toasts(Severity::Error)[0].contains("could not be loaded"));
    assert!(!out.exists() || sorted_files(&out).is_empty());
}

#[tokio::test]
async fn test_text_keeps_theme_color() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = DeckStore::new(crate::common::fixtures::deck(1, 200, 200)).unwrap();
    let (exporter, _) = exporter(dir.path());

    let outcome = exporter
        .export_single_slide(&mut store, &ExportRequest::new(ExportFormat::Png, 200, 200, 1.0))
        .await
        .unwrap();

    let img = image::open(dir.path().join(&outcome.filename)).unwrap().to_rgba8();
    // Default theme: #f9fafb text on #111827.
    assert!(img.pixels().any(|p| *p == Rgba([0xf9, 0xfa, 0xfb, 255])));
    assert!(!img.pixels().any(|p| *p == Rgba([0, 0, 0, 255])));
}
