//! In-memory comment metadata store with paginated listing.
//!
//! Pagination must stay correct while a purge deletes every comment it
//! lists: deleted records leave a tombstoned slot behind, so a page token
//! (a slot offset) never skips or repeats a surviving comment, whatever
//! the page size.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sweep_core::{CommentPage, CommentService, Error, Result};

/// One review comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl CommentRecord {
    /// Create a comment with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: String::new(),
            text: String::new(),
        }
    }
}

/// Comment store keyed by document id.
///
/// The JSON form is a plain map of document id to comment list; the
/// tombstoned slots are an in-memory detail and never serialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    from = "HashMap<String, Vec<CommentRecord>>",
    into = "HashMap<String, Vec<CommentRecord>>"
)]
pub struct MemoryCommentStore {
    docs: HashMap<String, Vec<Option<CommentRecord>>>,
}

impl MemoryCommentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a comment to a document's list.
    pub fn insert(&mut self, document_id: impl Into<String>, record: CommentRecord) {
        self.docs
            .entry(document_id.into())
            .or_default()
            .push(Some(record));
    }

    /// Number of comments still present for a document.
    pub fn count(&self, document_id: &str) -> usize {
        self.docs
            .get(document_id)
            .map(|slots| slots.iter().flatten().count())
            .unwrap_or(0)
    }
}

impl From<HashMap<String, Vec<CommentRecord>>> for MemoryCommentStore {
    fn from(docs: HashMap<String, Vec<CommentRecord>>) -> Self {
        Self {
            docs: docs
                .into_iter()
                .map(|(id, records)| (id, records.into_iter().map(Some).collect()))
                .collect(),
        }
    }
}

impl From<MemoryCommentStore> for HashMap<String, Vec<CommentRecord>> {
    fn from(store: MemoryCommentStore) -> Self {
        store
            .docs
            .into_iter()
            .map(|(id, slots)| (id, slots.into_iter().flatten().collect()))
            .collect()
    }
}

impl CommentService for MemoryCommentStore {
    fn list_page(
        &mut self,
        document_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<CommentPage> {
        if page_size == 0 {
            return Err(Error::CommentError(
                "page size must be at least 1".to_string(),
            ));
        }

        let slots = match self.docs.get(document_id) {
            Some(slots) => slots,
            // Unknown document: nothing to list, not an error
            None => {
                return Ok(CommentPage {
                    ids: Vec::new(),
                    next_page_token: None,
                })
            }
        };

        let start: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| Error::CommentError(format!("invalid page token: {token}")))?,
            None => 0,
        };

        let mut ids = Vec::new();
        let mut cursor = start;

        while cursor < slots.len() && ids.len() < page_size {
            if let Some(record) = &slots[cursor] {
                ids.push(record.id.clone());
            }
            cursor += 1;
        }

        let next_page_token = if slots[cursor.min(slots.len())..].iter().any(Option::is_some) {
            Some(cursor.to_string())
        } else {
            None
        };

        Ok(CommentPage {
            ids,
            next_page_token,
        })
    }

    fn delete(&mut self, document_id: &str, comment_id: &str) -> Result<()> {
        let slots = self.docs.get_mut(document_id).ok_or_else(|| {
            Error::CommentError(format!("no comments stored for document: {document_id}"))
        })?;

        let slot = slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|record| record.id == comment_id))
            .ok_or_else(|| Error::CommentError(format!("no such comment: {comment_id}")))?;

        log::debug!("deleting comment {comment_id} on {document_id}");
        *slot = None;
        Ok(())
    }
}
