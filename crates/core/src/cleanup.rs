//! The three cleanup procedures.
//!
//! Each is a linear scan over a host-supplied collection: purge every
//! review comment, clear every non-empty speaker note, remove every page
//! element lying entirely outside the canvas. They share nothing beyond
//! the document handle and the geometry predicate.

use crate::error::Result;
use crate::host::{CommentService, Document};

/// Default page size for comment listing. Affects the number of round
/// trips to the metadata service, never the deleted count.
pub const DEFAULT_COMMENT_PAGE_SIZE: usize = 100;

/// Delete every comment associated with `document_id`.
///
/// Folds over the paginated listing: request a page (starting with no
/// token), delete every id in it, follow the next-page token until the
/// service stops returning one. Returns the total number deleted.
///
/// A failure from the service on any list or delete call aborts the whole
/// operation; deletions already issued stand.
pub fn purge_comments(
    service: &mut dyn CommentService,
    document_id: &str,
    page_size: usize,
) -> Result<usize> {
    let mut deleted = 0;
    let mut page_token: Option<String> = None;

    loop {
        let page = service.list_page(document_id, page_token.as_deref(), page_size)?;
        log::debug!(
            "comment page: {} ids, more = {}",
            page.ids.len(),
            page.next_page_token.is_some()
        );

        for id in &page.ids {
            service.delete(document_id, id)?;
            deleted += 1;
        }

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(deleted)
}

/// Clear the speaker notes of every slide whose notes text is non-empty
/// after trimming leading/trailing whitespace.
///
/// Whitespace-only notes are left untouched. Returns the number of slides
/// cleared. Clearing empties the text; the notes container stays.
pub fn clear_speaker_notes(document: &mut dyn Document) -> Result<usize> {
    let mut cleared = 0;

    for index in 0..document.slide_count() {
        let slide = document.slide_mut(index);
        if !slide.notes_text().trim().is_empty() {
            slide.clear_notes()?;
            cleared += 1;
        }
    }

    Ok(cleared)
}

/// Remove every page element whose bounding box has zero intersection
/// with the visible canvas. Returns the total removed across all slides.
///
/// Elements with any partial overlap are preserved; boundary-flush
/// elements count as outside (see [`crate::Bounds::is_off_canvas`]).
pub fn remove_off_canvas_elements(document: &mut dyn Document) -> Result<usize> {
    let page = document.page_size();
    let mut removed = 0;

    for index in 0..document.slide_count() {
        let slide = document.slide_mut(index);

        // Walk backwards so a removal never shifts the index of an
        // element we have yet to visit.
        for element in (0..slide.element_count()).rev() {
            if slide.element_bounds(element).is_off_canvas(page) {
                slide.remove_element(element)?;
                removed += 1;
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::geometry::{Bounds, PageSize};
    use crate::host::{CommentPage, Slide};

    struct FakeSlide {
        elements: Vec<Bounds>,
        notes: String,
    }

    impl Slide for FakeSlide {
        fn element_count(&self) -> usize {
            self.elements.len()
        }

        fn element_bounds(&self, index: usize) -> Bounds {
            self.elements[index]
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

    struct FakeDocument {
        slides: Vec<FakeSlide>,
    }

    impl FakeDocument {
        fn new(slides: Vec<FakeSlide>) -> Self {
            Self { slides }
        }
    }

    impl Document for FakeDocument {
        fn id(&self) -> &str {
            "fake"
        }

        fn page_size(&self) -> PageSize {
            PageSize::new(800.0, 600.0)
        }

        fn slide_count(&self) -> usize {
            self.slides.len()
        }

        fn slide_mut(&mut self, index: usize) -> &mut dyn Slide {
            &mut self.slides[index]
        }
    }

    /// Paginated comment service over a tombstoned id list, so page
    /// tokens stay valid while comments are being deleted out from under
    /// the listing.
    struct FakeComments {
        slots: Vec<Option<String>>,
        fail_after_deletes: Option<usize>,
        deletes_issued: usize,
    }

    impl FakeComments {
        fn new(ids: &[&str]) -> Self {
            Self {
                slots: ids.iter().map(|id| Some(id.to_string())).collect(),
                fail_after_deletes: None,
                deletes_issued: 0,
            }
        }

        fn failing_after(ids: &[&str], deletes: usize) -> Self {
            let mut fake = Self::new(ids);
            fake.fail_after_deletes = Some(deletes);
            fake
        }

        fn remaining(&self) -> usize {
            self.slots.iter().flatten().count()
        }
    }

    impl CommentService for FakeComments {
        fn list_page(
            &mut self,
            _document_id: &str,
            page_token: Option<&str>,
            page_size: usize,
        ) -> Result<CommentPage> {
            let start: usize = match page_token {
                Some(token) => token
                    .parse()
                    .map_err(|_| Error::CommentError(format!("bad page token: {token}")))?,
                None => 0,
            };

            let mut ids = Vec::new();
            let mut next = None;
            let mut cursor = start;

            while cursor < self.slots.len() && ids.len() < page_size {
                if let Some(id) = &self.slots[cursor] {
                    ids.push(id.clone());
                }
                cursor += 1;
            }

            if self.slots[cursor..].iter().any(Option::is_some) {
                next = Some(cursor.to_string());
            }

            Ok(CommentPage {
                ids,
                next_page_token: next,
            })
        }

        fn delete(&mut self, _document_id: &str, comment_id: &str) -> Result<()> {
            if self.fail_after_deletes == Some(self.deletes_issued) {
                return Err(Error::CommentError("service unavailable".to_string()));
            }

            let slot = self
                .slots
                .iter_mut()
                .find(|slot| slot.as_deref() == Some(comment_id))
                .ok_or_else(|| Error::CommentError(format!("no such comment: {comment_id}")))?;
            *slot = None;
            self.deletes_issued += 1;
            Ok(())
        }
    }

    fn slide(elements: Vec<Bounds>, notes: &str) -> FakeSlide {
        FakeSlide {
            elements,
            notes: notes.to_string(),
        }
    }

    #[test]
    fn test_purge_deletes_everything() {
        let mut comments = FakeComments::new(&["a", "b", "c", "d", "e"]);
        let deleted = purge_comments(&mut comments, "fake", 2).unwrap();
        assert_eq!(deleted, 5);
        assert_eq!(comments.remaining(), 0);
    }

    #[test]
    fn test_purge_count_is_stable_across_page_sizes() {
        let ids: Vec<String> = (0..25).map(|n| format!("c{n}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        for page_size in [1, 10, 100] {
            let mut comments = FakeComments::new(&id_refs);
            let deleted = purge_comments(&mut comments, "fake", page_size).unwrap();
            assert_eq!(deleted, 25, "page_size = {page_size}");
            assert_eq!(comments.remaining(), 0);
        }
    }

    #[test]
    fn test_purge_empty_store_deletes_nothing() {
        let mut comments = FakeComments::new(&[]);
        assert_eq!(purge_comments(&mut comments, "fake", 100).unwrap(), 0);
    }

    #[test]
    fn test_purge_failure_aborts_and_keeps_prior_deletions() {
        let mut comments = FakeComments::failing_after(&["a", "b", "c", "d"], 2);
        let err = purge_comments(&mut comments, "fake", 100).unwrap_err();
        assert!(matches!(err, Error::CommentError(_)));
        // The two deletions issued before the failure are not rolled back
        assert_eq!(comments.remaining(), 2);
    }

    #[test]
    fn test_clear_notes_counts_only_non_blank() {
        let mut document = FakeDocument::new(vec![
            slide(vec![], "remember to pause here"),
            slide(vec![], ""),
            slide(vec![], "   \n\t  "),
            slide(vec![], "  trailing  "),
        ]);

        let cleared = clear_speaker_notes(&mut document).unwrap();
        assert_eq!(cleared, 2);
        assert_eq!(document.slides[0].notes, "");
        assert_eq!(document.slides[3].notes, "");
        // Whitespace-only notes are left as-is
        assert_eq!(document.slides[2].notes, "   \n\t  ");
    }

    #[test]
    fn test_clear_notes_second_run_finds_nothing() {
        let mut document = FakeDocument::new(vec![slide(vec![], "notes")]);
        assert_eq!(clear_speaker_notes(&mut document).unwrap(), 1);
        assert_eq!(clear_speaker_notes(&mut document).unwrap(), 0);
    }

    #[test]
    fn test_remove_off_canvas_interleaved_indices() {
        // Indices 1 and 3 are off-canvas; removal must not skip or
        // double-process the on-canvas elements around them.
        let on = Bounds::new(100.0, 100.0, 50.0, 50.0);
        let off_left = Bounds::new(-60.0, 100.0, 50.0, 50.0);
        let off_bottom = Bounds::new(100.0, 600.0, 50.0, 50.0);

        let mut document =
            FakeDocument::new(vec![slide(vec![on, off_left, on, off_bottom, on], "")]);

        let removed = remove_off_canvas_elements(&mut document).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(document.slides[0].elements, vec![on, on, on]);
    }

    #[test]
    fn test_remove_off_canvas_is_idempotent() {
        let mut document = FakeDocument::new(vec![slide(
            vec![
                Bounds::new(800.0, 0.0, 10.0, 10.0),
                Bounds::new(0.0, 0.0, 800.0, 600.0),
            ],
            "",
        )]);

        assert_eq!(remove_off_canvas_elements(&mut document).unwrap(), 1);
        assert_eq!(remove_off_canvas_elements(&mut document).unwrap(), 0);
        assert_eq!(document.slides[0].elements.len(), 1);
    }

    #[test]
    fn test_remove_off_canvas_spans_all_slides() {
        let off = Bounds::new(-20.0, -20.0, 10.0, 10.0);
        let on = Bounds::new(10.0, 10.0, 10.0, 10.0);

        let mut document = FakeDocument::new(vec![
            slide(vec![off, on], ""),
            slide(vec![], ""),
            slide(vec![on, off, off], ""),
        ]);

        assert_eq!(remove_off_canvas_elements(&mut document).unwrap(), 3);
        assert_eq!(document.slides[0].elements.len(), 1);
        assert_eq!(document.slides[2].elements.len(), 1);
    }
}
