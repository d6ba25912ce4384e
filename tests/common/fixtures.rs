//! Deck fixtures, in memory and on disk.

use std::path::{Path, PathBuf};

use flashpost::slides::{Deck, Slide};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

/// Deck with `count` slides titled "Slide 1", "Slide 2", ...
#[must_use]
pub fn deck(count: usize, width: u32, height: u32) -> Deck {
    let slides = (1..=count)
        .map(|i| Slide::new(format!("Slide {i}"), format!("Body of slide {i}")))
        .collect();
    let mut deck = Deck::new(slides);
    deck.theme.width = width;
    deck.theme.height = height;
    deck
}

/// A deck file plus a local image, in a temporary directory.
pub struct DeckDir {
    pub dir: TempDir,
}

impl DeckDir {
    /// Three-slide YAML deck at 200x200; the second slide shows `img/dot.png`.
    #[must_use]
    pub fn yaml() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir(dir.path().join("img")).unwrap();
        RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]))
            .save(dir.path().join("img/dot.png"))
            .unwrap();
        std::fs::write(
            dir.path().join("deck.yaml"),
            r##"name: Habits
theme:
  background: "#0f172a"
  width: 200
  height: 200
slides:
  - title: Five habits
    body: Swipe for the list
  - title: Write it down
    image: img/dot.png
  - title: Take breaks
"##,
        )
        .unwrap();
        Self { dir }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn deck_path(&self) -> PathBuf {
        self.dir.path().join("deck.yaml")
    }

    /// Write a settings file with zero delays and return its path.
    #[must_use]
    pub fn fast_settings(&self) -> PathBuf {
        let path = self.dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[timings]\nsettle_ms = 0\nrender_settle_ms = 0\nbetween_slides_ms = 0\nretry_prompt_ms = 0\n",
        )
        .unwrap();
        path
    }
}
