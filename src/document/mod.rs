//! In-memory element tree that slides are rendered into.
//!
//! The document is the surface shared by the renderer, the chrome guard and
//! the rasterizer: elements carry an id, classes, inline [`Style`], a box
//! relative to their parent, and optional text or image content. Styles that
//! inherit (font family, font size, text color, visibility) are resolved by
//! walking ancestors, the way a browser resolves computed style.

mod style;

use std::collections::HashMap;

use image::Rgba;
use serde::Serialize;
use tracing::trace;

pub use style::{Display, Style, TRANSPARENT, Visibility, WHITE, format_color, parse_color};

/// Font family used when no ancestor sets one.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";
/// Font size (px) used when no ancestor sets one.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;
/// Text color used when no ancestor sets one.
pub const DEFAULT_TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(usize);

/// Box geometry in CSS pixels, relative to the parent element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }
}

/// A single node in the document.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub style: Style,
    pub rect: Rect,
    pub text: Option<String>,
    /// Image source: a local path or an `http(s)://` URL.
    pub image: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    /// Create a detached element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub const fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, src: impl Into<String>) -> Self {
        self.image = Some(src.into());
        self
    }

    /// Returns true if the element carries the class.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    #[must_use]
    pub const fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    fn matches(&self, selector: &str) -> bool {
        if let Some(id) = selector.strip_prefix('#') {
            self.id.as_deref() == Some(id)
        } else if let Some(class) = selector.strip_prefix('.') {
            self.has_class(class)
        } else {
            self.tag == selector
        }
    }
}

/// Element tree with a single root (`body`).
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Element>>,
    /// Slots emptied by `remove`, reused by `append`.
    free: Vec<usize>,
    root: ElementId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with an empty `body` root.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(Element::new("body"))
    }

    /// Create a document whose root is the given element.
    #[must_use]
    pub fn with_root(mut root: Element) -> Self {
        root.parent = None;
        root.children.clear();
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            root: ElementId(0),
        }
    }

    #[must_use]
    pub const fn root(&self) -> ElementId {
        self.root
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Append `element` as the last child of `parent`.
    ///
    /// Returns `None` if `parent` does not exist.
    pub fn append(&mut self, parent: ElementId, mut element: Element) -> Option<ElementId> {
        self.get(parent)?;
        element.parent = Some(parent);
        element.children.clear();
        let id = if let Some(slot) = self.free.pop() {
            self.nodes[slot] = Some(element);
            ElementId(slot)
        } else {
            self.nodes.push(Some(element));
            ElementId(self.nodes.len() - 1)
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        trace!(?id, ?parent, "Appended element");
        Some(id)
    }

    /// Remove an element and its subtree. The root cannot be removed.
    pub fn remove(&mut self, id: ElementId) -> bool {
        if id == self.root || self.get(id).is_none() {
            return false;
        }
        if let Some(parent) = self.get(id).and_then(Element::parent) {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        for node in self.descendants(id) {
            self.nodes[node.0] = None;
            self.free.push(node.0);
        }
        true
    }

    /// Number of slots backing the tree, live or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Remove every child of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: ElementId) {
        let children = self
            .get(id)
            .map(|e| e.children.clone())
            .unwrap_or_default();
        for child in children {
            self.remove(child);
        }
    }

    /// Pre-order traversal of `id` and everything below it.
    #[must_use]
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(element) = self.get(current) {
                out.push(current);
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    /// First element matching `selector` (`#id`, `.class` or tag), in tree order.
    #[must_use]
    pub fn query(&self, selector: &str) -> Option<ElementId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|e| e.matches(selector)))
    }

    /// Every element matching `selector`, in tree order.
    #[must_use]
    pub fn query_all(&self, selector: &str) -> Vec<ElementId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|e| e.matches(selector)))
            .collect()
    }

    fn ancestors_inclusive(&self, id: ElementId) -> impl Iterator<Item = &Element> {
        let mut next = self.get(id);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.parent.and_then(|p| self.get(p));
            Some(current)
        })
    }

    /// Computed font family: inline value or nearest ancestor's.
    #[must_use]
    pub fn resolved_font_family(&self, id: ElementId) -> String {
        self.ancestors_inclusive(id)
            .find_map(|e| e.style.font_family.clone())
            .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string())
    }

    /// Computed font size in CSS pixels.
    #[must_use]
    pub fn resolved_font_size(&self, id: ElementId) -> f32 {
        self.ancestors_inclusive(id)
            .find_map(|e| e.style.font_size)
            .unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// Computed text color.
    #[must_use]
    pub fn resolved_color(&self, id: ElementId) -> Rgba<u8> {
        self.ancestors_inclusive(id)
            .find_map(|e| e.style.color)
            .unwrap_or(DEFAULT_TEXT_COLOR)
    }

    /// True unless the element or an ancestor has `display: none`.
    #[must_use]
    pub fn is_rendered(&self, id: ElementId) -> bool {
        self.get(id).is_some()
            && self
                .ancestors_inclusive(id)
                .all(|e| e.style.display != Some(Display::None))
    }

    /// Computed visibility (inherited; a child may override a hidden parent).
    #[must_use]
    pub fn is_visible(&self, id: ElementId) -> bool {
        self.ancestors_inclusive(id)
            .find_map(|e| e.style.visibility)
            .is_none_or(|v| v == Visibility::Visible)
    }

    /// Box of `id` in document coordinates.
    #[must_use]
    pub fn absolute_rect(&self, id: ElementId) -> Option<Rect> {
        let rect = self.get(id)?.rect;
        let (dx, dy) = self
            .ancestors_inclusive(id)
            .skip(1)
            .fold((0.0, 0.0), |(x, y), e| (x + e.rect.x, y + e.rect.y));
        Some(Rect::new(rect.x + dx, rect.y + dy, rect.width, rect.height))
    }

    /// Deep-copy the subtree under `id` into a new detached document.
    ///
    /// The copy's root is the cloned `id`, placed at the origin. Its text
    /// color and font size are resolved against the source ancestors. The
    /// font family is not carried over; see `inline_resolved_fonts`.
    #[must_use]
    pub fn clone_subtree(&self, id: ElementId) -> Option<ClonedSubtree> {
        let source_root = self.get(id)?;
        let mut root = source_root.clone();
        root.rect.x = 0.0;
        root.rect.y = 0.0;
        root.style.color = Some(self.resolved_color(id));
        root.style.font_size = Some(self.resolved_font_size(id));
        let mut document = Self::with_root(root);
        let mut origin = HashMap::new();
        origin.insert(document.root, id);

        let mut stack: Vec<(ElementId, ElementId)> = source_root
            .children
            .iter()
            .rev()
            .map(|child| (*child, document.root))
            .collect();

        while let Some((source, parent)) = stack.pop() {
            let Some(element) = self.get(source) else {
                continue;
            };
            let Some(cloned) = document.append(parent, element.clone()) else {
                continue;
            };
            origin.insert(cloned, source);
            stack.extend(element.children.iter().rev().map(|c| (*c, cloned)));
        }

        Some(ClonedSubtree { document, origin })
    }
}

/// A detached copy of a subtree plus the mapping back to the source elements.
#[derive(Debug, Clone)]
pub struct ClonedSubtree {
    pub document: Document,
    origin: HashMap<ElementId, ElementId>,
}

impl ClonedSubtree {
    /// Source element a cloned element was copied from.
    #[must_use]
    pub fn origin_of(&self, cloned: ElementId) -> Option<ElementId> {
        self.origin.get(&cloned).copied()
    }

    /// Cloned element ids in tree order.
    #[must_use]
    pub fn elements(&self) -> Vec<ElementId> {
        self.document.descendants(self.document.root())
    }
}
