//! Common test utilities for the FlashPost integration tests.
//!
//! - `fixtures`: deck builders and deck files in temp directories
//! - `Harness`: an exporter wired to the mock rasterizer, the recording
//!   notifier and the in-memory sink, with zero delays
#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use flashpost::document::{Display, Document, Visibility};
use flashpost::download::MemorySink;
use flashpost::error::Result;
use flashpost::export::{ExportTimings, Exporter};
use flashpost::notify::mock::RecordingNotifier;
use flashpost::pdf::PdfWriter;
use flashpost::raster::mock::MockRasterizer;
use flashpost::slides::{DeckStore, Slide, SlideStore};
use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Exporter plus handles on every collaborator it talks to.
pub struct Harness {
    pub exporter: Exporter,
    pub rasterizer: Arc<MockRasterizer>,
    pub notifier: Arc<RecordingNotifier>,
    pub sink: Arc<MemorySink>,
}

impl Harness {
    /// Mock rasterizer and the built-in PDF writer, no delays.
    #[must_use]
    pub fn new() -> Self {
        let rasterizer = Arc::new(MockRasterizer::new());
        let harness = Self::without_engines();
        Self {
            exporter: harness
                .exporter
                .with_rasterizer(rasterizer.clone())
                .with_pdf_backend(Arc::new(PdfWriter::new())),
            rasterizer,
            ..harness
        }
    }

    /// No rasterizer and no PDF backend registered.
    #[must_use]
    pub fn without_engines() -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let sink = Arc::new(MemorySink::new());
        let exporter = Exporter::new(notifier.clone(), sink.clone())
            .with_timings(ExportTimings::immediate());
        Self {
            exporter,
            rasterizer: Arc::new(MockRasterizer::new()),
            notifier,
            sink,
        }
    }
}

/// Inline visibility of every chrome element, in document order.
#[must_use]
pub fn chrome_state(document: &Document) -> Vec<(Option<Display>, Option<Visibility>)> {
    flashpost::chrome::CHROME_SELECTORS
        .iter()
        .flat_map(|selector| document.query_all(selector))
        .filter_map(|id| document.get(id))
        .map(|e| (e.style.display, e.style.visibility))
        .collect()
}

/// Deck store of `count` numbered slides at `width` x `height`.
#[must_use]
pub fn store(count: usize, width: u32, height: u32) -> DeckStore {
    DeckStore::new(fixtures::deck(count, width, height)).unwrap()
}

/// Slide store that counts how often the active slide changes.
pub struct CountingStore {
    pub inner: DeckStore,
    pub switches: Vec<usize>,
    pub renders: usize,
}

impl CountingStore {
    #[must_use]
    pub fn new(inner: DeckStore) -> Self {
        Self {
            inner,
            switches: Vec::new(),
            renders: 0,
        }
    }
}

impl SlideStore for CountingStore {
    fn active_index(&self) -> usize {
        self.inner.active_index()
    }

    fn slides(&self) -> &[Slide] {
        self.inner.slides()
    }

    fn set_active(&mut self, index: usize) -> Result<()> {
        self.switches.push(index);
        self.inner.set_active(index)
    }

    fn render(&mut self) -> Result<()> {
        self.renders += 1;
        self.inner.render()
    }

    fn document(&self) -> &Document {
        self.inner.document()
    }

    fn document_mut(&mut self) -> &mut Document {
        self.inner.document_mut()
    }
}
