//! Path resolution for deck and settings files.
//!
//! Supports absolute paths, paths relative to the deck file, and "~" home
//! directory expansion. Remote image URLs pass through untouched.

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::{FpError, Result};

/// Resolve a path written in a deck or settings file.
///
/// Resolution rules:
/// 1. Paths starting with `~`: expanded to home directory
/// 2. Absolute paths: used as-is
/// 3. Relative paths: resolved relative to `base_dir`
pub fn resolve_path(path: &Path, base_dir: &Path) -> Result<PathBuf> {
    trace!(
        path = %path.display(),
        base_dir = %base_dir.display(),
        "Resolving path"
    );

    let path_str = path.to_string_lossy();

    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        let resolved = if rest.is_empty() {
            home
        } else {
            home.join(rest)
        };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let resolved = base_dir.join(path);
    debug!(
        original = %path.display(),
        resolved = %resolved.display(),
        "Resolved relative path"
    );
    Ok(resolved)
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| FpError::ConfigInvalid("Could not determine home directory".to_string()))
}

/// True for `http://` and `https://` sources.
#[must_use]
pub fn is_remote(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Path resolution context for one deck file.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the file at `file_path`.
    pub fn new(file_path: &Path) -> Result<Self> {
        let parent = file_path.parent().ok_or_else(|| {
            FpError::ConfigInvalid(format!(
                "Path has no parent directory: {}",
                file_path.display()
            ))
        })?;
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };

        let canonical = parent.canonicalize().unwrap_or_else(|_| {
            warn!(dir = %parent.display(), "Failed to canonicalize directory");
            parent.to_path_buf()
        });

        Ok(Self {
            base_dir: canonical,
        })
    }

    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        resolve_path(path, &self.base_dir)
    }

    /// Resolve an image source; URLs are returned unchanged.
    pub fn resolve_image(&self, src: &str) -> Result<String> {
        if is_remote(src) {
            return Ok(src.to_string());
        }
        Ok(self.resolve(Path::new(src))?.display().to_string())
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
