//! User settings (`config.toml`).
//!
//! Looked up at `$CONFIG_DIR/flashpost/config.toml` unless `--config` names a
//! file. Every key is optional; a missing default file means defaults.
//!
//! # Example
//!
//! ```toml
//! [export]
//! format = "jpeg"
//! scale = 2.0
//! output_dir = "~/Pictures/carousels"
//! retry = "always"
//!
//! [timings]
//! settle_ms = 150
//!
//! [server]
//! port = 3000
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{FpError, Result};
use crate::export::{ExportFormat, ExportTimings};
use crate::notify::RetryPolicy;
use crate::server::{DEFAULT_PORT, ServerConfig};

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub export: ExportSettings,
    pub timings: TimingSettings,
    pub server: ServerSettings,
}

/// `[export]` defaults for export commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Output width; the deck's slide width when unset.
    pub width: Option<u32>,
    /// Output height; the deck's slide height when unset.
    pub height: Option<u32>,
    pub scale: f32,
    /// Where files are written; the current directory when unset.
    pub output_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            width: None,
            height: None,
            scale: 2.0,
            output_dir: None,
            retry: RetryPolicy::Ask,
        }
    }
}

/// `[timings]` pipeline delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSettings {
    pub settle_ms: u64,
    pub render_settle_ms: u64,
    pub between_slides_ms: u64,
    pub retry_prompt_ms: u64,
    pub image_timeout_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        let d = ExportTimings::default();
        Self {
            settle_ms: d.settle.as_millis() as u64,
            render_settle_ms: d.render_settle.as_millis() as u64,
            between_slides_ms: d.between_slides.as_millis() as u64,
            retry_prompt_ms: d.retry_prompt.as_millis() as u64,
            image_timeout_ms: d.image_timeout.as_millis() as u64,
        }
    }
}

impl TimingSettings {
    #[must_use]
    pub const fn to_timings(&self) -> ExportTimings {
        ExportTimings {
            settle: Duration::from_millis(self.settle_ms),
            render_settle: Duration::from_millis(self.render_settle_ms),
            between_slides: Duration::from_millis(self.between_slides_ms),
            retry_prompt: Duration::from_millis(self.retry_prompt_ms),
            image_timeout: Duration::from_millis(self.image_timeout_ms),
        }
    }
}

/// `[server]` defaults for `flashpost serve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub port: u16,
    pub bind: IpAddr,
    pub root: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            root: PathBuf::from("."),
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            root: s.root.clone(),
            port: s.port,
            bind: s.bind,
        }
    }
}

impl Settings {
    /// `$CONFIG_DIR/flashpost/config.toml`, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("flashpost").join("config.toml"))
    }

    /// Load from `explicit`, or from [`Settings::default_path`].
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => {
                    debug!("No config directory on this platform, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FpError::ConfigInvalid(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(FpError::Io(e)),
        };

        let settings = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parse and validate TOML settings.
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| FpError::ConfigParse(format!("TOML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let scale = self.export.scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(FpError::ConfigInvalid(format!(
                "export.scale must be positive, got {scale}"
            )));
        }
        if self.export.width == Some(0) || self.export.height == Some(0) {
            return Err(FpError::ConfigInvalid(
                "export.width and export.height must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
