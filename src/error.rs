//! Error types for FlashPost export operations.

use serde::Serialize;
use thiserror::Error;

/// External capability an export depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    /// Rasterization engine (element to pixels).
    Rasterizer,
    /// PDF assembly engine.
    PdfEngine,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rasterizer => f.write_str("rasterizer"),
            Self::PdfEngine => f.write_str("PDF engine"),
        }
    }
}

/// Why a capture failed, as reported by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureErrorKind {
    /// Canvas would exceed the pixel budget.
    Memory,
    /// A cross-origin resource could not be used.
    CrossOrigin,
    /// A resource failed to load.
    Network,
    /// A resource did not load before the image timeout.
    Timeout,
    /// The capture produced a zero-sized raster.
    EmptyImage,
    /// Anything else.
    Other,
}

/// Tag identifying the class of an [`FpError`].
///
/// User-facing diagnostics switch on this tag rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    DependencyMissing(Dependency),
    ElementNotFound,
    Rasterization(CaptureErrorKind),
    Encoding,
    Download,
    InvalidRequest,
    Busy,
    Deck,
    Config,
    Server,
    Io,
    Other,
}

/// Primary error type for FlashPost operations.
#[derive(Error, Debug)]
pub enum FpError {
    // Export pipeline errors
    #[error("Required {dependency} is not available")]
    DependencyMissing { dependency: Dependency },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Rasterization failed ({kind:?}): {message}")]
    Rasterization {
        kind: CaptureErrorKind,
        message: String,
    },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Could not save '{filename}': {reason}")]
    DownloadFailed { filename: String, reason: String },

    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    #[error("Another export is already running")]
    ExportInProgress,

    // Deck errors
    #[error("Deck has no slides")]
    NoSlides,

    #[error("Invalid slide {index}: deck has {count} slides (1-{count})")]
    SlideIndexOutOfRange { index: usize, count: usize },

    #[error("Deck file not found: {path}")]
    DeckNotFound { path: String },

    #[error("Deck parse error: {0}")]
    DeckParse(String),

    // Configuration errors
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // Web server errors
    #[error("Web server failed to start on {addr}: {reason}")]
    WebServerFailed { addr: String, reason: String },

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl FpError {
    /// Returns the tag for this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DependencyMissing { dependency } => ErrorKind::DependencyMissing(*dependency),
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::Rasterization { kind, .. } => ErrorKind::Rasterization(*kind),
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::DownloadFailed { .. } => ErrorKind::Download,
            Self::InvalidRequest(_) | Self::SlideIndexOutOfRange { .. } => {
                ErrorKind::InvalidRequest
            }
            Self::ExportInProgress => ErrorKind::Busy,
            Self::NoSlides | Self::DeckNotFound { .. } | Self::DeckParse(_) => ErrorKind::Deck,
            Self::ConfigParse(_) | Self::ConfigInvalid(_) => ErrorKind::Config,
            Self::WebServerFailed { .. } => ErrorKind::Server,
            Self::Io(_) => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Build a rasterization error.
    pub fn capture(kind: CaptureErrorKind, message: impl Into<String>) -> Self {
        Self::Rasterization {
            kind,
            message: message.into(),
        }
    }

    /// User-facing sentence explaining an export failure.
    pub const fn diagnostic(&self) -> &'static str {
        match self.kind() {
            ErrorKind::DependencyMissing(Dependency::Rasterizer) => {
                "The rendering engine is not loaded. Restart FlashPost and try again."
            }
            ErrorKind::DependencyMissing(Dependency::PdfEngine) => {
                "The PDF engine is not loaded. Export as PNG or JPEG instead."
            }
            ErrorKind::Rasterization(CaptureErrorKind::Memory) => {
                "Not enough memory to render at this size. Lower the scale or dimensions."
            }
            ErrorKind::Rasterization(CaptureErrorKind::CrossOrigin) => {
                "An image on this slide is blocked by cross-origin restrictions. Use local images."
            }
            ErrorKind::Rasterization(CaptureErrorKind::Network) => {
                "A slide resource could not be loaded. Check image paths and your connection."
            }
            ErrorKind::Rasterization(CaptureErrorKind::Timeout) => {
                "Slide images took too long to load. Try again or use smaller images."
            }
            ErrorKind::Rasterization(CaptureErrorKind::EmptyImage) => {
                "The slide rendered as an empty image. Check that the slide is visible."
            }
            ErrorKind::ElementNotFound => "The slide preview is not ready. Render a slide first.",
            ErrorKind::Encoding => "The image could not be encoded. Try a different format.",
            ErrorKind::Download => "The file could not be saved. Check the output directory.",
            _ => "Export failed. Please try again.",
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. }
                | Self::InvalidRequest(_)
                | Self::ExportInProgress
                | Self::NoSlides
                | Self::SlideIndexOutOfRange { .. }
                | Self::DeckNotFound { .. }
                | Self::DeckParse(_)
                | Self::ConfigParse(_)
                | Self::DownloadFailed { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoSlides => Some("Add at least one entry under `slides` in the deck file"),
            Self::SlideIndexOutOfRange { .. } => Some("Slide numbers start at 1"),
            Self::DeckNotFound { .. } => Some("Check the deck path, or create one with a `slides` list"),
            Self::DownloadFailed { .. } => Some("Use --out to pick a writable directory"),
            Self::WebServerFailed { .. } => Some("Use --port or PORT to pick a free port"),
            Self::Rasterization { .. } => Some("Retry with --scale 1 --width 720 --height 720"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using FpError.
pub type Result<T> = std::result::Result<T, FpError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| FpError::Other(format!("{}: {e}", f().into())))
    }
}
