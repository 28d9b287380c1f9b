//! Collaborator traits for the hosting document platform.
//!
//! The cleanup procedures never own a document tree; they operate through
//! these traits on whatever host adapter is in use (in-memory, PPTX). All
//! entities are created and owned by the host; the procedures only read,
//! clear, and delete.

use crate::error::Result;
use crate::geometry::{Bounds, PageSize};

/// Source of the document a command runs against.
///
/// Replaces the host-managed "active document" singleton: every procedure
/// receives an explicit document handle obtained from here once per
/// invocation.
pub trait DocumentSource {
    /// The document the next command should operate on.
    fn active_document(&mut self) -> Result<&mut dyn Document>;
}

/// An open presentation document.
pub trait Document {
    /// Identifier used to address host-side metadata (comments).
    fn id(&self) -> &str;

    /// Canvas dimensions, fixed for the duration of one cleanup run.
    fn page_size(&self) -> PageSize;

    /// Number of slides in document order.
    fn slide_count(&self) -> usize;

    /// Mutable access to the slide at `index`.
    ///
    /// Panics if `index >= slide_count()`.
    fn slide_mut(&mut self, index: usize) -> &mut dyn Slide;
}

/// A single slide: an ordered element sequence plus one notes container.
pub trait Slide {
    /// Number of page elements currently on the slide.
    fn element_count(&self) -> usize;

    /// Bounding box of the element at `index`.
    ///
    /// Panics if `index >= element_count()`.
    fn element_bounds(&self, index: usize) -> Bounds;

    /// Remove the element at `index`. Elements after it shift down by one.
    fn remove_element(&mut self, index: usize) -> Result<()>;

    /// Current speaker notes text.
    fn notes_text(&self) -> &str;

    /// Empty the speaker notes text. The notes container itself stays.
    fn clear_notes(&mut self) -> Result<()>;
}

/// One page of comment ids from the metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPage {
    /// Comment ids in this page.
    pub ids: Vec<String>,

    /// Token for the next page; `None` means the listing is exhausted.
    pub next_page_token: Option<String>,
}

/// Comment metadata service, independent of the slide tree.
///
/// Comments are keyed by opaque ids and associated with a document via its
/// identifier. Deleting comments never mutates the slide tree, and vice
/// versa.
pub trait CommentService {
    /// List one page of comment ids for `document_id`.
    ///
    /// Pass the token from the previous page, or `None` to start. A page
    /// token must stay valid across deletions of already-listed comments:
    /// following tokens to exhaustion visits every surviving comment
    /// exactly once regardless of `page_size`.
    fn list_page(
        &mut self,
        document_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<CommentPage>;

    /// Delete one comment. Terminal and irreversible.
    fn delete(&mut self, document_id: &str, comment_id: &str) -> Result<()>;
}
