//! Delivery of exported files.
//!
//! Rasters go through [`DownloadSink::download`]; finished PDF documents go
//! through [`DownloadSink::save_document`]. [`FileDownloader`] writes into an
//! output directory, [`MemorySink`] keeps everything in memory for tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

use crate::error::{FpError, Result};
use crate::export::ExportFormat;
use crate::image_ops::to_data_url;

/// An encoded export ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedArtifact {
    pub filename: String,
    pub format: ExportFormat,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ExportedArtifact {
    #[must_use]
    pub fn to_data_url(&self) -> String {
        to_data_url(self.format.mime_type(), &self.bytes)
    }
}

/// Destination for exported files.
pub trait DownloadSink: Send + Sync {
    /// Deliver an encoded raster.
    fn download(&self, artifact: &ExportedArtifact) -> Result<()>;

    /// Deliver a finished document.
    fn save_document(&self, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// Writes files into a directory.
///
/// Each write first tries an atomic temp-file persist in the target
/// directory, then falls back to writing the file directly.
#[derive(Debug, Clone)]
pub struct FileDownloader {
    dir: PathBuf,
}

impl FileDownloader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `filename` ends up.
    #[must_use]
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    #[instrument(skip(self, bytes), fields(dir = %self.dir.display(), len = bytes.len()))]
    fn write(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(FpError::DownloadFailed {
                filename: filename.to_string(),
                reason: "filename must be a plain file name".to_string(),
            });
        }
        let target = self.path_for(filename);

        let primary = fs::create_dir_all(&self.dir)
            .map_err(|e| e.to_string())
            .and_then(|()| persist_atomic(&self.dir, &target, bytes));
        let primary_err = match primary {
            Ok(()) => {
                debug!(path = %target.display(), "Saved via temp-file persist");
                return Ok(());
            }
            Err(e) => e,
        };
        warn!(error = %primary_err, "Atomic save failed, falling back to direct write");

        match fs::write(&target, bytes) {
            Ok(()) => {
                debug!(path = %target.display(), "Saved via direct write");
                Ok(())
            }
            Err(e) => Err(FpError::DownloadFailed {
                filename: filename.to_string(),
                reason: format!("{primary_err}; fallback: {e}"),
            }),
        }
    }
}

fn persist_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> std::result::Result<(), String> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| e.to_string())?;
    tmp.write_all(bytes).map_err(|e| e.to_string())?;
    tmp.flush().map_err(|e| e.to_string())?;
    tmp.persist(target).map_err(|e| e.error.to_string())?;
    Ok(())
}

impl DownloadSink for FileDownloader {
    fn download(&self, artifact: &ExportedArtifact) -> Result<()> {
        self.write(&artifact.filename, &artifact.bytes)
    }

    fn save_document(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.write(filename, bytes)
    }
}

/// How a file reached a [`MemorySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Download,
    Document,
}

/// One file captured by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub path: DeliveryPath,
}

/// In-memory sink for testing.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Delivered>>,
    fail_next: Mutex<bool>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next delivery with `DownloadFailed`.
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    #[must_use]
    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    fn push(&self, filename: &str, bytes: &[u8], path: DeliveryPath) -> Result<()> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(FpError::DownloadFailed {
                filename: filename.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.delivered.lock().unwrap().push(Delivered {
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
            path,
        });
        Ok(())
    }
}

impl DownloadSink for MemorySink {
    fn download(&self, artifact: &ExportedArtifact) -> Result<()> {
        self.push(&artifact.filename, &artifact.bytes, DeliveryPath::Download)
    }

    fn save_document(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.push(filename, bytes, DeliveryPath::Document)
    }
}
