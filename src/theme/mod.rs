//! Theme for human-mode terminal output.

use console::{Color, Style};

/// Visual theme for FlashPost human-mode output.
///
/// Centralizes colors and styles for consistent rendering.
#[derive(Debug, Clone)]
pub struct FpTheme {
    // Status styles
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub info: Style,

    // Component styles
    pub header: Style,
    pub label: Style,
    pub value: Style,
    pub muted: Style,
    pub filename: Style,

    /// indicatif template for the batch progress bar.
    pub progress_template: &'static str,
    /// indicatif template for the single-export spinner.
    pub spinner_template: &'static str,
}

impl FpTheme {
    /// Theme with every style reduced to plain text.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            error: Style::new(),
            warning: Style::new(),
            info: Style::new(),
            header: Style::new(),
            label: Style::new(),
            value: Style::new(),
            muted: Style::new(),
            filename: Style::new(),
            progress_template: "[{bar:40}] {pos:>3}% {msg}",
            spinner_template: "{spinner} {msg}",
        }
    }
}

impl Default for FpTheme {
    fn default() -> Self {
        let accent = Color::Color256(99);
        Self {
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warning: Style::new().yellow().bold(),
            info: Style::new().blue().bold(),
            header: Style::new().fg(accent).bold(),
            label: Style::new().dim(),
            value: Style::new().bold(),
            muted: Style::new().dim().italic(),
            filename: Style::new().cyan(),
            progress_template: "{spinner:.magenta} [{bar:40.magenta/blue}] {pos:>3}% {msg}",
            spinner_template: "{spinner:.magenta} {msg}",
        }
    }
}
