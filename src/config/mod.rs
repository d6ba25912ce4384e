//! Configuration: user settings and deck files.
//!
//! Settings come from `config.toml` (see [`Settings`]); decks are JSON, YAML
//! or TOML files loaded with [`load_deck`].

mod deck;
mod path;
mod settings;

pub use deck::{DeckFormat, load_deck, load_deck_from_str};
pub use path::{PathResolver, home_dir, is_remote, resolve_path};
pub use settings::{ExportSettings, ServerSettings, Settings, TimingSettings};
