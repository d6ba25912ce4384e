//! Inline style values for document elements.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::{FpError, Result};
use crate::image_ops::ResizeStrategy;

/// CSS-like `display` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    Block,
    Flex,
    Inline,
    None,
}

/// CSS-like `visibility` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Inline style of an element. `None` means "not set inline".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub display: Option<Display>,
    pub visibility: Option<Visibility>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub color: Option<Rgba<u8>>,
    pub background: Option<Rgba<u8>>,
    /// How an image element fits its box (`object-fit`).
    pub object_fit: Option<ResizeStrategy>,
}

impl Style {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn background(mut self, color: Rgba<u8>) -> Self {
        self.background = Some(color);
        self
    }

    #[must_use]
    pub fn color(mut self, color: Rgba<u8>) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    #[must_use]
    pub fn font_size(mut self, px: f32) -> Self {
        self.font_size = Some(px);
        self
    }

    #[must_use]
    pub fn display(mut self, display: Display) -> Self {
        self.display = Some(display);
        self
    }
}

/// Fully transparent black.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
/// Opaque white.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Parse a hex color: `#rgb`, `#rrggbb`, `#rrggbbaa` (leading `#` optional)
/// or the keyword `transparent`.
pub fn parse_color(s: &str) -> Result<Rgba<u8>> {
    if s.eq_ignore_ascii_case("transparent") {
        return Ok(TRANSPARENT);
    }

    let hex = s.trim().trim_start_matches('#');
    let expanded: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };

    if !(expanded.len() == 6 || expanded.len() == 8) || !expanded.is_ascii() {
        return Err(FpError::DeckParse(format!(
            "Invalid color '{s}': expected #rgb, #rrggbb or #rrggbbaa"
        )));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&expanded[i..i + 2], 16)
            .map_err(|_| FpError::DeckParse(format!("Invalid color component in '{s}'")))
    };

    let alpha = if expanded.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// Format a color as `#rrggbb` (or `#rrggbbaa` when not opaque).
#[must_use]
pub fn format_color(color: Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    if a == 255 {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}
