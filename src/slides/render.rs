//! Deck-backed [`SlideStore`] that lays slides out into a [`Document`].

use image::Rgba;
use tracing::{debug, instrument};

use super::{Deck, Slide, SlideStore};
use crate::document::{Document, Element, ElementId, Rect, Style, parse_color};
use crate::error::{FpError, Result};

/// Id of the element that holds the visible slide.
pub const SLIDE_CONTAINER_ID: &str = "slide-container";
/// Selector form of [`SLIDE_CONTAINER_ID`].
pub const SLIDE_CONTAINER_SELECTOR: &str = "#slide-container";

const NAV_SIZE: f32 = 48.0;
const DOT_SIZE: f32 = 12.0;
const DOT_GAP: f32 = 8.0;
const INACTIVE_DOT: Rgba<u8> = Rgba([255, 255, 255, 110]);

/// Slide store over an in-memory [`Deck`].
#[derive(Debug, Clone)]
pub struct DeckStore {
    deck: Deck,
    active: usize,
    document: Document,
}

impl DeckStore {
    /// Create a store and render the first slide.
    pub fn new(deck: Deck) -> Result<Self> {
        deck.validate()?;
        let mut store = Self {
            deck,
            active: 0,
            document: Document::new(),
        };
        store.render()?;
        Ok(store)
    }

    #[must_use]
    pub const fn deck(&self) -> &Deck {
        &self.deck
    }

    /// The slide container, if a slide is rendered.
    #[must_use]
    pub fn container(&self) -> Option<ElementId> {
        self.document.query(SLIDE_CONTAINER_SELECTOR)
    }
}

impl SlideStore for DeckStore {
    fn active_index(&self) -> usize {
        self.active
    }

    fn slides(&self) -> &[Slide] {
        &self.deck.slides
    }

    fn set_active(&mut self, index: usize) -> Result<()> {
        let count = self.deck.slides.len();
        if index >= count {
            return Err(FpError::SlideIndexOutOfRange { index, count });
        }
        self.active = index;
        Ok(())
    }

    #[instrument(skip(self), fields(active = self.active))]
    fn render(&mut self) -> Result<()> {
        let theme = &self.deck.theme;
        let root = self.document.root();
        self.document.clear_children(root);

        // Page-level styles live on the body, outside the slide container.
        if let Some(body) = self.document.get_mut(root) {
            body.style = Style::new()
                .font_family(theme.font_family.clone())
                .color(parse_color(&theme.text_color)?);
            body.rect = Rect::sized(theme.width as f32, theme.height as f32);
        }

        let Some(slide) = self.deck.slides.get(self.active) else {
            debug!("Deck is empty, nothing to render");
            return Ok(());
        };

        let layout = Layout::new(theme.width as f32, theme.height as f32);
        let accent = parse_color(&theme.accent)?;
        let background = parse_color(slide.background.as_deref().unwrap_or(&theme.background))?;

        let mut container_style = Style::new().background(background);
        if let Some(color) = &slide.text_color {
            container_style = container_style.color(parse_color(color)?);
        }
        if let Some(family) = &slide.font_family {
            container_style = container_style.font_family(family.clone());
        }

        let container = append(
            &mut self.document,
            root,
            Element::new("div")
                .with_id(SLIDE_CONTAINER_ID)
                .with_class("slide")
                .with_style(container_style)
                .with_rect(layout.full()),
        )?;

        if let Some(src) = &slide.image {
            let mut style = Style::new();
            style.object_fit = slide.image_fit;
            append(
                &mut self.document,
                container,
                Element::new("img")
                    .with_class("slide-image")
                    .with_image(src.clone())
                    .with_style(style)
                    .with_rect(layout.full()),
            )?;
        }

        append(
            &mut self.document,
            container,
            Element::new("h1")
                .with_class("slide-title")
                .with_text(slide.title.clone())
                .with_style(Style::new().font_size(layout.width * 0.06))
                .with_rect(layout.title()),
        )?;

        if !slide.body.is_empty() {
            append(
                &mut self.document,
                container,
                Element::new("p")
                    .with_class("slide-body")
                    .with_text(slide.body.clone())
                    .with_style(Style::new().font_size(layout.width * 0.035))
                    .with_rect(layout.body()),
            )?;
        }

        let total = self.deck.slides.len();
        self.append_chrome(container, &layout, accent, total)?;

        debug!(index = self.active, total, "Rendered slide");
        Ok(())
    }

    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}

impl DeckStore {
    fn append_chrome(
        &mut self,
        container: ElementId,
        layout: &Layout,
        accent: Rgba<u8>,
        total: usize,
    ) -> Result<()> {
        let doc = &mut self.document;
        let nav = Style::new().background(accent);

        append(
            doc,
            container,
            Element::new("button")
                .with_class("nav-button")
                .with_class("nav-prev")
                .with_text("<")
                .with_style(nav.clone())
                .with_rect(layout.nav(false)),
        )?;
        append(
            doc,
            container,
            Element::new("button")
                .with_class("nav-button")
                .with_class("nav-next")
                .with_text(">")
                .with_style(nav)
                .with_rect(layout.nav(true)),
        )?;

        append(
            doc,
            container,
            Element::new("span")
                .with_class("slide-number")
                .with_text(format!("{} / {total}", self.active + 1))
                .with_style(Style::new().background(Rgba([0, 0, 0, 120])).font_size(18.0))
                .with_rect(layout.badge()),
        )?;

        let strip = append(
            doc,
            container,
            Element::new("div")
                .with_class("position-indicator")
                .with_rect(layout.dots(total)),
        )?;
        for i in 0..total {
            let fill = if i == self.active { accent } else { INACTIVE_DOT };
            append(
                doc,
                strip,
                Element::new("span")
                    .with_class("position-dot")
                    .with_style(Style::new().background(fill))
                    .with_rect(Rect::new(
                        i as f32 * (DOT_SIZE + DOT_GAP),
                        0.0,
                        DOT_SIZE,
                        DOT_SIZE,
                    )),
            )?;
        }
        Ok(())
    }
}

fn append(doc: &mut Document, parent: ElementId, element: Element) -> Result<ElementId> {
    doc.append(parent, element)
        .ok_or_else(|| FpError::Other(format!("render target {parent:?} vanished")))
}

/// Box positions for a slide of the given size.
struct Layout {
    width: f32,
    height: f32,
    pad: f32,
}

impl Layout {
    fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pad: width.min(height) * 0.08,
        }
    }

    const fn full(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    fn title(&self) -> Rect {
        Rect::new(
            self.pad,
            self.height * 0.28,
            self.width - 2.0 * self.pad,
            self.height * 0.16,
        )
    }

    fn body(&self) -> Rect {
        Rect::new(
            self.pad,
            self.height * 0.48,
            self.width - 2.0 * self.pad,
            self.height * 0.3,
        )
    }

    fn nav(&self, next: bool) -> Rect {
        let x = if next {
            self.width - self.pad / 2.0 - NAV_SIZE
        } else {
            self.pad / 2.0
        };
        Rect::new(x, (self.height - NAV_SIZE) / 2.0, NAV_SIZE, NAV_SIZE)
    }

    fn badge(&self) -> Rect {
        Rect::new(self.width - self.pad - 96.0, self.pad / 2.0, 96.0, 36.0)
    }

    fn dots(&self, total: usize) -> Rect {
        let width = total as f32 * (DOT_SIZE + DOT_GAP) - DOT_GAP;
        Rect::new(
            (self.width - width.max(0.0)) / 2.0,
            self.height - self.pad,
            width.max(0.0),
            DOT_SIZE,
        )
    }
}
