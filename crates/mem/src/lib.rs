//! In-memory host for slide deck cleanup.
//!
//! A document tree and a paginated comment store backed by plain value
//! types. This is the reference host: tests drive the cleanup procedures
//! against it, and the CLI loads one from a JSON description.

pub mod comments;
pub mod document;

use serde::{Deserialize, Serialize};

pub use comments::{CommentRecord, MemoryCommentStore};
pub use document::{MemoryDocument, MemoryElement, MemorySlide};

/// A whole host in one value: the document plus its comment metadata.
///
/// This is the serde root the CLI reads from and writes back to JSON.
/// Comments live outside the document tree, keyed by document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHost {
    pub document: MemoryDocument,

    #[serde(default)]
    pub comments: MemoryCommentStore,
}

impl MemoryHost {
    /// Create a host around a document, with no comments.
    pub fn new(document: MemoryDocument) -> Self {
        Self {
            document,
            comments: MemoryCommentStore::new(),
        }
    }
}
