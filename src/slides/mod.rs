//! Slide data model and the store the exporter drives.
//!
//! A [`Deck`] is the ordered list of slides plus a theme. The [`SlideStore`]
//! trait is the exporter's only view of "which slide is active" and "paint
//! it into the document"; [`DeckStore`] is the built-in implementation.

mod render;

pub use render::{DeckStore, SLIDE_CONTAINER_ID, SLIDE_CONTAINER_SELECTOR};

use serde::{Deserialize, Serialize};

use crate::document::{Document, parse_color};
use crate::error::{FpError, Result};
use crate::image_ops::ResizeStrategy;

/// One carousel slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Background color override (hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Text color override (hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Background image (local path, relative to the deck file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_fit: Option<ResizeStrategy>,
}

impl Slide {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Deck-wide look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckTheme {
    pub background: String,
    pub text_color: String,
    pub accent: String,
    pub font_family: String,
    /// Slide width in CSS pixels.
    pub width: u32,
    /// Slide height in CSS pixels.
    pub height: u32,
}

impl Default for DeckTheme {
    fn default() -> Self {
        Self {
            background: "#111827".to_string(),
            text_color: "#f9fafb".to_string(),
            accent: "#6366f1".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            width: 1080,
            height: 1080,
        }
    }
}

/// Ordered slides plus theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub theme: DeckTheme,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Deck {
    #[must_use]
    pub fn new(slides: Vec<Slide>) -> Self {
        Self {
            slides,
            ..Default::default()
        }
    }

    /// Check colors and dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.theme.width == 0 || self.theme.height == 0 {
            return Err(FpError::DeckParse(format!(
                "theme size must be positive, got {}x{}",
                self.theme.width, self.theme.height
            )));
        }
        for color in [
            &self.theme.background,
            &self.theme.text_color,
            &self.theme.accent,
        ] {
            parse_color(color)?;
        }
        for (i, slide) in self.slides.iter().enumerate() {
            for color in [&slide.background, &slide.text_color].into_iter().flatten() {
                parse_color(color)
                    .map_err(|e| FpError::DeckParse(format!("slide {}: {e}", i + 1)))?;
            }
        }
        Ok(())
    }
}

/// Source of slides and owner of the document they render into.
///
/// The exporter borrows the store mutably for a whole export, so the active
/// slide and the document cannot change underneath it.
pub trait SlideStore {
    /// Zero-based index of the active slide.
    fn active_index(&self) -> usize;

    fn slides(&self) -> &[Slide];

    /// Make `index` the active slide. Does not repaint.
    fn set_active(&mut self, index: usize) -> Result<()>;

    /// Paint the active slide into the document.
    fn render(&mut self) -> Result<()>;

    fn document(&self) -> &Document;

    fn document_mut(&mut self) -> &mut Document;
}
