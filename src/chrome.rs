//! Scoped suppression of UI chrome during capture.
//!
//! Navigation buttons, the slide-number badge and position indicators sit on
//! top of the slide container and must not end up in exported images.
//! [`ChromeGuard::hide`] records each element's inline `display` and
//! `visibility`, hides it, and puts the recorded values back when the guard
//! is dropped, whichever way the capture ends.

use std::ops::Deref;

use serde::Serialize;
use tracing::{debug, trace};

use crate::document::{Display, Document, ElementId, Visibility};

/// Selectors for chrome elements, in hide order.
pub const CHROME_SELECTORS: &[&str] = &[".nav-button", ".slide-number", ".position-indicator"];

/// Inline visibility values of one element before hiding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavedVisibility {
    pub element: ElementId,
    pub display: Option<Display>,
    pub visibility: Option<Visibility>,
}

/// Holds chrome hidden until dropped.
pub struct ChromeGuard<'a> {
    document: &'a mut Document,
    saved: Vec<SavedVisibility>,
}

impl<'a> ChromeGuard<'a> {
    /// Snapshot and hide every element matching [`CHROME_SELECTORS`].
    pub fn hide(document: &'a mut Document) -> Self {
        Self::hide_matching(document, CHROME_SELECTORS)
    }

    /// Snapshot and hide every element matching any of `selectors`.
    pub fn hide_matching(document: &'a mut Document, selectors: &[&str]) -> Self {
        let mut saved: Vec<SavedVisibility> = Vec::new();
        for selector in selectors {
            for id in document.query_all(selector) {
                if saved.iter().any(|s| s.element == id) {
                    continue;
                }
                let Some(element) = document.get_mut(id) else {
                    continue;
                };
                saved.push(SavedVisibility {
                    element: id,
                    display: element.style.display,
                    visibility: element.style.visibility,
                });
                element.style.display = Some(Display::None);
                element.style.visibility = Some(Visibility::Hidden);
                trace!(?id, selector, "Hid chrome element");
            }
        }
        debug!(count = saved.len(), "Chrome hidden");
        Self { document, saved }
    }

    /// Values recorded before hiding.
    #[must_use]
    pub fn saved(&self) -> &[SavedVisibility] {
        &self.saved
    }

    /// Read access to the document while chrome is hidden.
    #[must_use]
    pub fn document(&self) -> &Document {
        &*self.document
    }
}

impl Deref for ChromeGuard<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        &*self.document
    }
}

impl Drop for ChromeGuard<'_> {
    fn drop(&mut self) {
        for saved in self.saved.drain(..).rev() {
            if let Some(element) = self.document.get_mut(saved.element) {
                element.style.display = saved.display;
                element.style.visibility = saved.visibility;
            }
        }
        debug!("Chrome restored");
    }
}
