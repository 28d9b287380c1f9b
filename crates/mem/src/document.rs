//! In-memory document tree.

use serde::{Deserialize, Serialize};
use sweep_core::{Bounds, Document, DocumentSource, PageSize, Result, Slide};

/// A page element described by its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryElement {
    /// Optional label, handy in JSON fixtures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl MemoryElement {
    /// Create an unnamed element from its bounding box.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            name: None,
            left,
            top,
            width,
            height,
        }
    }

    /// Bounding box of this element.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.left, self.top, self.width, self.height)
    }
}

/// A slide: ordered elements plus one notes text block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySlide {
    #[serde(default)]
    pub elements: Vec<MemoryElement>,

    /// Speaker notes text. An empty string models an empty notes
    /// container; the container itself is never removed.
    #[serde(default)]
    pub notes: String,
}

impl MemorySlide {
    /// Create an empty slide.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the notes text.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Append an element.
    pub fn add_element(&mut self, element: MemoryElement) {
        self.elements.push(element);
    }
}

impl Slide for MemorySlide {
    fn element_count(&self) -> usize {
        self.elements.len()
    }

    fn element_bounds(&self, index: usize) -> Bounds {
        self.elements[index].bounds()
    }

    fn remove_element(&mut self, index: usize) -> Result<()> {
        self.elements.remove(index);
        Ok(())
    }

    fn notes_text(&self) -> &str {
        &self.notes
    }

    fn clear_notes(&mut self) -> Result<()> {
        self.notes.clear();
        Ok(())
    }
}

/// An in-memory presentation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Identifier used to address comments in the metadata store.
    pub id: String,

    pub page_width: f64,
    pub page_height: f64,

    #[serde(default)]
    pub slides: Vec<MemorySlide>,
}

impl MemoryDocument {
    /// Create an empty document with the given canvas size.
    pub fn new(id: impl Into<String>, page_width: f64, page_height: f64) -> Self {
        Self {
            id: id.into(),
            page_width,
            page_height,
            slides: Vec::new(),
        }
    }

    /// Append a slide.
    pub fn add_slide(&mut self, slide: MemorySlide) {
        self.slides.push(slide);
    }
}

impl Document for MemoryDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn page_size(&self) -> PageSize {
        PageSize::new(self.page_width, self.page_height)
    }

    fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn slide_mut(&mut self, index: usize) -> &mut dyn Slide {
        &mut self.slides[index]
    }
}

impl DocumentSource for MemoryDocument {
    fn active_document(&mut self) -> Result<&mut dyn Document> {
        Ok(self)
    }
}
