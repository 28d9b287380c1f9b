//! PPTX (Office Open XML) host adapter for slide deck cleanup.
//!
//! Opens a .pptx archive (a ZIP of XML parts), exposes it through the
//! core document and comment traits, and saves the cleaned archive back
//! out. Mutations are recorded against the in-memory model and applied
//! at save time by rewriting only the affected parts; everything else is
//! copied byte for byte.

mod parser;
mod rewrite;

use std::collections::HashSet;
use std::io::{Read, Seek, Write};
use std::path::Path;

use sweep_core::{
    Bounds, CommentPage, CommentService, Document, DocumentSource, Error, PageSize, Result, Slide,
};

use parser::SHAPE_ELEMENTS;

/// An open .pptx archive, split into the two host collaborators.
///
/// `document` and `comments` are separate fields so a
/// [`sweep_core::HostSession`] can borrow both at once.
#[derive(Debug)]
pub struct PptxPackage {
    entries: Vec<(String, Vec<u8>)>,
    pub document: PptxDocument,
    pub comments: PptxCommentStore,
}

/// The slide tree half of the package.
#[derive(Debug)]
pub struct PptxDocument {
    id: String,
    page: PageSize,
    slides: Vec<PptxSlide>,
}

/// One slide part, its positioned shapes, and its notes part.
#[derive(Debug)]
struct PptxSlide {
    part: String,
    elements: Vec<PptxElement>,
    removed: Vec<usize>,
    notes_part: Option<String>,
    notes_text: String,
    notes_cleared: bool,
}

/// A top-level shape with an explicit transform.
///
/// Shapes that inherit their placement from the layout are not exposed
/// as page elements and are never removal candidates.
#[derive(Debug)]
struct PptxElement {
    shape_index: usize,
    bounds: Bounds,
}

/// The comment metadata half of the package.
///
/// Comment ids are `"{part}#{ordinal}"` over the part's original `p:cm`
/// order. Deletion tombstones the record; the part is rewritten at save
/// time, so ids stay stable while a purge is in flight.
#[derive(Debug)]
pub struct PptxCommentStore {
    document_id: String,
    records: Vec<PptxComment>,
}

#[derive(Debug)]
struct PptxComment {
    part: String,
    ordinal: usize,
    deleted: bool,
}

impl PptxComment {
    fn id(&self) -> String {
        format!("{}#{}", self.part, self.ordinal)
    }
}

impl PptxPackage {
    /// Open a .pptx archive from a reader.
    pub fn open<R: Read + Seek>(reader: R, filename: &str) -> Result<Self> {
        let entries = parser::read_archive(reader)?;

        let presentation_xml = entry_text(&entries, "ppt/presentation.xml")?;
        let rels_xml = entry_text(&entries, "ppt/_rels/presentation.xml.rels")?;

        let page = parser::parse_page_size(presentation_xml)?;
        let slide_parts = parser::parse_slide_order(presentation_xml, rels_xml)?;
        log::debug!("{} slides, canvas {}x{} EMU", slide_parts.len(), page.width, page.height);

        let mut slides = Vec::with_capacity(slide_parts.len());
        let mut records = Vec::new();

        for part in slide_parts {
            let slide_xml = entry_text(&entries, &part)?;
            let elements = parser::parse_shape_bounds(slide_xml)?
                .into_iter()
                .enumerate()
                .filter_map(|(shape_index, bounds)| {
                    bounds.map(|bounds| PptxElement {
                        shape_index,
                        bounds,
                    })
                })
                .collect();

            let slide_dir = part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            let mut notes_part = None;
            let mut notes_text = String::new();

            if let Some(rels) = optional_entry_text(&entries, &parser::rels_path_for(&part))? {
                let relationships = parser::parse_relationships(rels)?;

                if let Some(rel) = relationships
                    .iter()
                    .find(|r| r.rel_type.ends_with("/notesSlide"))
                {
                    let resolved = parser::resolve_target(slide_dir, &rel.target);
                    if let Some(xml) = optional_entry_text(&entries, &resolved)? {
                        notes_text = parser::parse_notes_text(xml)?;
                        notes_part = Some(resolved);
                    }
                }

                if let Some(rel) = relationships
                    .iter()
                    .find(|r| r.rel_type.ends_with("/comments"))
                {
                    let resolved = parser::resolve_target(slide_dir, &rel.target);
                    if let Some(xml) = optional_entry_text(&entries, &resolved)? {
                        for ordinal in 0..parser::parse_comment_count(xml)? {
                            records.push(PptxComment {
                                part: resolved.clone(),
                                ordinal,
                                deleted: false,
                            });
                        }
                    }
                }
            }

            slides.push(PptxSlide {
                part,
                elements,
                removed: Vec::new(),
                notes_part,
                notes_text,
                notes_cleared: false,
            });
        }

        let id = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("presentation")
            .to_string();

        Ok(Self {
            entries,
            document: PptxDocument { id: id.clone(), page, slides },
            comments: PptxCommentStore {
                document_id: id,
                records,
            },
        })
    }

    /// Whether any recorded mutation needs saving.
    pub fn is_dirty(&self) -> bool {
        self.document
            .slides
            .iter()
            .any(|slide| !slide.removed.is_empty() || slide.notes_cleared)
            || self.comments.records.iter().any(|record| record.deleted)
    }

    /// Write the archive with all recorded mutations applied.
    pub fn save<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let mut archive = zip::ZipWriter::new(writer);

        for (name, data) in &self.entries {
            archive
                .start_file(name.clone(), options)
                .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", name, e)))?;

            match self.rewrite_entry(name, data)? {
                Some(rewritten) => archive.write_all(&rewritten)?,
                None => archive.write_all(data)?,
            }
        }

        archive
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(())
    }

    /// Rewritten bytes for a part touched by a mutation, `None` for a
    /// verbatim copy.
    fn rewrite_entry(&self, name: &str, data: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(slide) = self.document.slides.iter().find(|s| s.part == name) {
            if slide.removed.is_empty() {
                return Ok(None);
            }
            let remove: HashSet<usize> = slide.removed.iter().copied().collect();
            let xml = part_utf8(name, data)?;
            let rewritten = rewrite::strip_children(xml, b"spTree", SHAPE_ELEMENTS, &remove)?;
            return Ok(Some(rewritten.into_bytes()));
        }

        if self
            .document
            .slides
            .iter()
            .any(|s| s.notes_cleared && s.notes_part.as_deref() == Some(name))
        {
            let xml = part_utf8(name, data)?;
            return Ok(Some(rewrite::clear_notes_body_text(xml)?.into_bytes()));
        }

        let deleted: HashSet<usize> = self
            .comments
            .records
            .iter()
            .filter(|record| record.deleted && record.part == name)
            .map(|record| record.ordinal)
            .collect();
        if !deleted.is_empty() {
            let xml = part_utf8(name, data)?;
            let rewritten = rewrite::strip_children(xml, b"cmLst", &[b"cm"], &deleted)?;
            return Ok(Some(rewritten.into_bytes()));
        }

        Ok(None)
    }
}

impl Document for PptxDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn page_size(&self) -> PageSize {
        self.page
    }

    fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn slide_mut(&mut self, index: usize) -> &mut dyn Slide {
        &mut self.slides[index]
    }
}

impl DocumentSource for PptxDocument {
    fn active_document(&mut self) -> Result<&mut dyn Document> {
        Ok(self)
    }
}

impl Slide for PptxSlide {
    fn element_count(&self) -> usize {
        self.elements.len()
    }

    fn element_bounds(&self, index: usize) -> Bounds {
        self.elements[index].bounds
    }

    fn remove_element(&mut self, index: usize) -> Result<()> {
        let element = self.elements.remove(index);
        self.removed.push(element.shape_index);
        Ok(())
    }

    fn notes_text(&self) -> &str {
        &self.notes_text
    }

    fn clear_notes(&mut self) -> Result<()> {
        self.notes_text.clear();
        self.notes_cleared = true;
        Ok(())
    }
}

impl CommentService for PptxCommentStore {
    fn list_page(
        &mut self,
        document_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<CommentPage> {
        if document_id != self.document_id {
            return Err(Error::CommentError(format!(
                "unknown document: {}",
                document_id
            )));
        }
        if page_size == 0 {
            return Err(Error::CommentError(
                "page size must be at least 1".to_string(),
            ));
        }

        let start: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| Error::CommentError(format!("invalid page token: {}", token)))?,
            None => 0,
        };

        let mut ids = Vec::new();
        let mut cursor = start;

        while cursor < self.records.len() && ids.len() < page_size {
            let record = &self.records[cursor];
            if !record.deleted {
                ids.push(record.id());
            }
            cursor += 1;
        }

        let next_page_token = if self.records[cursor.min(self.records.len())..]
            .iter()
            .any(|record| !record.deleted)
        {
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
        if document_id != self.document_id {
            return Err(Error::CommentError(format!(
                "unknown document: {}",
                document_id
            )));
        }

        let record = self
            .records
            .iter_mut()
            .find(|record| !record.deleted && record.id() == comment_id)
            .ok_or_else(|| Error::CommentError(format!("no such comment: {}", comment_id)))?;

        record.deleted = true;
        Ok(())
    }
}

fn entry_text<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> Result<&'a str> {
    optional_entry_text(entries, name)?
        .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", name)))
}

fn optional_entry_text<'a>(
    entries: &'a [(String, Vec<u8>)],
    name: &str,
) -> Result<Option<&'a str>> {
    match entries.iter().find(|(entry, _)| entry == name) {
        Some((_, data)) => Ok(Some(part_utf8(name, data)?)),
        None => Ok(None),
    }
}

fn part_utf8<'a>(name: &str, data: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(data)
        .map_err(|e| Error::XmlError(format!("Part '{}' is not UTF-8: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use sweep_core::{run_command, Command, HostSession};
    use zip::write::FileOptions;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
</Types>"#;

    const PRESENTATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <p:sldIdLst><p:sldId id="256" r:id="rId1"/></p:sldIdLst>
  <p:sldSz cx="9144000" cy="6858000"/>
</p:presentation>"#;

    const PRESENTATION_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
</Relationships>"#;

    const SLIDE1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
    <p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/></a:xfrm></p:grpSpPr>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
      <p:spPr/>
      <p:txBody><a:p><a:r><a:t>Quarterly results</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="3" name="Body"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
      <p:spPr><a:xfrm><a:off x="914400" y="914400"/><a:ext cx="914400" cy="914400"/></a:xfrm></p:spPr>
      <p:txBody><a:p><a:r><a:t>On canvas</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="4" name="Scratch"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
      <p:spPr><a:xfrm><a:off x="9144000" y="0"/><a:ext cx="914400" cy="914400"/></a:xfrm></p:spPr>
      <p:txBody><a:p><a:r><a:t>Parked off to the side</a:t></a:r></a:p></p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

    const SLIDE1_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments/comment1.xml"/>
</Relationships>"#;

    const NOTES1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Notes Placeholder"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>Demo login is in the shared vault</a:t></a:r></a:p></p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:notes>"#;

    const COMMENTS1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:cmLst xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cm authorId="0" dt="2024-03-02T09:12:00" idx="1"><p:pos x="10" y="10"/><p:text>Update the revenue figure</p:text></p:cm>
  <p:cm authorId="1" dt="2024-03-02T11:40:00" idx="2"><p:pos x="20" y="20"/><p:text>Who owns this slide?</p:text></p:cm>
</p:cmLst>"#;

    fn build_fixture() -> Vec<u8> {
        let mut archive = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("ppt/presentation.xml", PRESENTATION),
            ("ppt/_rels/presentation.xml.rels", PRESENTATION_RELS),
            ("ppt/slides/slide1.xml", SLIDE1),
            ("ppt/slides/_rels/slide1.xml.rels", SLIDE1_RELS),
            ("ppt/notesSlides/notesSlide1.xml", NOTES1),
            ("ppt/comments/comment1.xml", COMMENTS1),
        ];

        for (name, content) in parts {
            archive.start_file(name, options).unwrap();
            archive.write_all(content.as_bytes()).unwrap();
        }

        archive.finish().unwrap().into_inner()
    }

    fn open_fixture() -> PptxPackage {
        PptxPackage::open(Cursor::new(build_fixture()), "Quarterly Review.pptx").unwrap()
    }

    #[test]
    fn test_open_reads_model() {
        let mut package = open_fixture();

        assert_eq!(package.document.id(), "Quarterly Review");
        assert_eq!(package.document.page_size(), PageSize::new(9144000.0, 6858000.0));
        assert_eq!(package.document.slide_count(), 1);
        assert!(!package.is_dirty());

        // Title has no explicit transform, so only two shapes are exposed
        let slide = package.document.slide_mut(0);
        assert_eq!(slide.element_count(), 2);
        assert_eq!(slide.notes_text(), "Demo login is in the shared vault");

        let page = package
            .comments
            .list_page("Quarterly Review", None, 100)
            .unwrap();
        assert_eq!(page.ids.len(), 2);
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn test_full_cleanup_round_trip() {
        let mut package = open_fixture();

        {
            let mut session = HostSession {
                documents: &mut package.document,
                comments: &mut package.comments,
            };

            let purged = run_command(Command::PurgeComments, &mut session).unwrap();
            let cleared = run_command(Command::ClearSpeakerNotes, &mut session).unwrap();
            let removed = run_command(Command::RemoveOffCanvasElements, &mut session).unwrap();

            assert_eq!(purged.count, 2);
            assert_eq!(cleared.count, 1);
            assert_eq!(removed.count, 1);
        }

        assert!(package.is_dirty());

        let mut out = Cursor::new(Vec::new());
        package.save(&mut out).unwrap();

        let mut reopened =
            PptxPackage::open(Cursor::new(out.into_inner()), "Quarterly Review.pptx").unwrap();

        {
            let slide = reopened.document.slide_mut(0);
            assert_eq!(slide.element_count(), 1);
            assert_eq!(
                slide.element_bounds(0),
                Bounds::new(914400.0, 914400.0, 914400.0, 914400.0)
            );
            assert_eq!(slide.notes_text(), "");
        }

        // A second pass over the saved file finds nothing left to clean
        let mut session = HostSession {
            documents: &mut reopened.document,
            comments: &mut reopened.comments,
        };
        for command in Command::ALL {
            let summary = run_command(command, &mut session).unwrap();
            assert_eq!(summary.count, 0, "command {}", command.id());
        }
    }

    #[test]
    fn test_save_without_changes_is_a_faithful_copy() {
        let package = open_fixture();

        let mut out = Cursor::new(Vec::new());
        package.save(&mut out).unwrap();

        let mut reopened =
            PptxPackage::open(Cursor::new(out.into_inner()), "Quarterly Review.pptx").unwrap();

        assert_eq!(reopened.document.slide_count(), 1);
        assert_eq!(reopened.document.slide_mut(0).element_count(), 2);
        assert_eq!(
            reopened
                .comments
                .list_page("Quarterly Review", None, 100)
                .unwrap()
                .ids
                .len(),
            2
        );
    }

    #[test]
    fn test_partial_comment_deletion_survives_save() {
        let mut package = open_fixture();

        let page = package
            .comments
            .list_page("Quarterly Review", None, 1)
            .unwrap();
        assert_eq!(page.ids.len(), 1);
        assert!(page.next_page_token.is_some());

        package
            .comments
            .delete("Quarterly Review", &page.ids[0])
            .unwrap();

        let mut out = Cursor::new(Vec::new());
        package.save(&mut out).unwrap();

        let mut reopened =
            PptxPackage::open(Cursor::new(out.into_inner()), "Quarterly Review.pptx").unwrap();
        let remaining = reopened
            .comments
            .list_page("Quarterly Review", None, 100)
            .unwrap();
        assert_eq!(remaining.ids.len(), 1);

        // The saved part no longer carries the deleted comment's text
        let saved = entry_text(&reopened.entries, "ppt/comments/comment1.xml").unwrap();
        assert!(!saved.contains("Update the revenue figure"));
        assert!(saved.contains("Who owns this slide?"));
    }

    #[test]
    fn test_unknown_document_id_is_rejected() {
        let mut package = open_fixture();
        assert!(package.comments.list_page("Other Deck", None, 10).is_err());
        assert!(package.comments.delete("Other Deck", "x").is_err());
    }

    #[test]
    fn test_missing_presentation_part_is_an_error() {
        let mut archive = zip::ZipWriter::new(Cursor::new(Vec::new()));
        archive.start_file("hello.txt", FileOptions::default()).unwrap();
        archive.write_all(b"not a deck").unwrap();
        let bytes = archive.finish().unwrap().into_inner();

        let err = PptxPackage::open(Cursor::new(bytes), "x.pptx").unwrap_err();
        assert!(matches!(err, Error::ZipError(_)));
    }
}
