//! Deck file loading.
//!
//! Decks are written by hand in JSON, YAML or TOML; the format is picked by
//! extension. Image paths are resolved against the deck file's directory.
//!
//! # Example YAML
//!
//! ```yaml
//! name: Five habits
//! theme:
//!   background: "#0f172a"
//!   accent: "#f59e0b"
//!   width: 1080
//!   height: 1350
//! slides:
//!   - title: Five habits of calm engineers
//!     body: Swipe for the list
//!   - title: Write it down
//!     image: img/notebook.jpg
//! ```

use std::path::Path;

use tracing::{debug, info, instrument, trace};

use super::path::PathResolver;
use crate::error::{FpError, Result};
use crate::slides::Deck;

/// Deck file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckFormat {
    /// JSON (.json).
    Json,
    /// YAML (.yaml, .yml).
    Yaml,
    /// TOML (.toml).
    Toml,
}

impl DeckFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting deck format from extension");
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }
}

/// Load a deck from a file and resolve its image paths.
///
/// # Errors
///
/// Returns an error if:
/// - The file does not exist
/// - The format cannot be detected from the extension
/// - The content cannot be parsed or fails validation
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_deck<P: AsRef<Path>>(path: P) -> Result<Deck> {
    let path = path.as_ref();
    info!("Loading deck file");

    let format = DeckFormat::from_extension(path).ok_or_else(|| {
        FpError::DeckParse(format!(
            "Unknown deck format for '{}': expected .json, .yaml, .yml, or .toml",
            path.display()
        ))
    })?;
    debug!(?format, "Detected deck format");

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FpError::DeckNotFound {
                path: path.display().to_string(),
            }
        } else {
            FpError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), "Read deck file");

    let mut deck = load_deck_from_str(&content, format)?;

    let resolver = PathResolver::new(path)?;
    for slide in &mut deck.slides {
        if let Some(src) = &slide.image {
            slide.image = Some(resolver.resolve_image(src)?);
        }
    }
    Ok(deck)
}

/// Parse and validate a deck from a string.
#[instrument(skip(content), fields(format = ?format, content_len = content.len()))]
pub fn load_deck_from_str(content: &str, format: DeckFormat) -> Result<Deck> {
    let deck: Deck = match format {
        DeckFormat::Json => {
            serde_json::from_str(content).map_err(|e| FpError::DeckParse(format!("JSON: {e}")))?
        }
        DeckFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| FpError::DeckParse(format!("YAML: {e}")))?
        }
        DeckFormat::Toml => {
            toml::from_str(content).map_err(|e| FpError::DeckParse(format!("TOML: {e}")))?
        }
    };

    deck.validate()?;
    info!(
        name = ?deck.name,
        slides = deck.slides.len(),
        width = deck.theme.width,
        height = deck.theme.height,
        "Deck loaded and validated"
    );
    Ok(deck)
}
