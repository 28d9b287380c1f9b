//! PPTX archive parsing: page size, slide order, shape bounds, notes
//! text, and comment parts.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Seek};
use sweep_core::{Bounds, Error, PageSize, Result};
use zip::ZipArchive;

/// Top-level children of `p:spTree` that count as page elements.
pub(crate) const SHAPE_ELEMENTS: &[&[u8]] =
    &[b"sp", b"pic", b"graphicFrame", b"cxnSp", b"grpSp"];

/// A relationship entry from a `.rels` part.
#[derive(Debug, Clone)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Read every file entry of the archive into memory, preserving order.
pub(crate) fn read_archive<R: Read + Seek>(reader: R) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", index, e)))?;

        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

        entries.push((name, data));
    }

    Ok(entries)
}

/// Parse all `Relationship` entries from a `.rels` part.
pub(crate) fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Type" => rel_type = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                        _ => {}
                    }
                }

                relationships.push(Relationship {
                    id,
                    rel_type,
                    target,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Resolve a relationship target against the directory it is relative to.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for component in target.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }

    parts.join("/")
}

/// The `_rels` part that describes a given part.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
        None => format!("_rels/{}.rels", part),
    }
}

/// Canvas dimensions from `p:sldSz` in `ppt/presentation.xml` (EMU).
pub(crate) fn parse_page_size(xml: &str) -> Result<PageSize> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldSz" =>
            {
                return match attr_pair(e, b"cx", b"cy") {
                    Some((width, height)) => Ok(PageSize::new(width, height)),
                    None => Err(Error::XmlError("sldSz is missing cx/cy".to_string())),
                };
            }
            Ok(Event::Eof) => {
                return Err(Error::XmlError(
                    "presentation.xml has no sldSz element".to_string(),
                ));
            }
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }
}

/// Slide part paths in presentation order, from `p:sldIdLst` joined with
/// the presentation relationships.
pub(crate) fn parse_slide_order(presentation_xml: &str, rels_xml: &str) -> Result<Vec<String>> {
    let relationships = parse_relationships(rels_xml)?;

    let mut parts = Vec::new();
    let mut reader = Reader::from_str(presentation_xml);
    let mut in_slide_list = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if name == b"sldIdLst" {
                    in_slide_list = true;
                } else if in_slide_list && name == b"sldId" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"r:id" {
                            let rel_id = String::from_utf8_lossy(&attr.value).to_string();
                            let relationship = relationships
                                .iter()
                                .find(|r| r.id == rel_id)
                                .ok_or_else(|| {
                                    Error::XmlError(format!(
                                        "sldId references unknown relationship: {}",
                                        rel_id
                                    ))
                                })?;
                            parts.push(resolve_target("ppt", &relationship.target));
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"sldIdLst" => break,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(parts)
}

/// Bounding boxes of the top-level shapes under `p:spTree`, one entry per
/// shape in document order.
///
/// A shape without an explicit `a:off`/`a:ext` transform inherits its
/// placement from the slide layout; it is reported as `None`.
pub(crate) fn parse_shape_bounds(xml: &str) -> Result<Vec<Option<Bounds>>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut in_tree = false;
    let mut depth = 0usize;
    let mut current: Option<PendingShape> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if !in_tree {
                    if name == b"spTree" {
                        in_tree = true;
                        depth = 0;
                    }
                    continue;
                }

                if depth == 0 && SHAPE_ELEMENTS.contains(&name) {
                    current = Some(PendingShape {
                        off: None,
                        ext: None,
                    });
                }

                capture_transform(&mut current, name, e);
                depth += 1;
            }
            Ok(Event::Empty(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if !in_tree {
                    continue;
                }

                if depth == 0 && SHAPE_ELEMENTS.contains(&name) {
                    // A content-less shape carries no transform of its own
                    shapes.push(None);
                    continue;
                }

                capture_transform(&mut current, name, e);
            }
            Ok(Event::End(_)) => {
                if !in_tree {
                    continue;
                }

                if depth == 0 {
                    // spTree itself closed
                    in_tree = false;
                } else {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(shape) = current.take() {
                            shapes.push(match (shape.off, shape.ext) {
                                (Some((x, y)), Some((w, h))) => Some(Bounds::new(x, y, w, h)),
                                _ => None,
                            });
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Transform attributes collected while walking one top-level shape.
struct PendingShape {
    off: Option<(f64, f64)>,
    ext: Option<(f64, f64)>,
}

/// Record the first `a:off`/`a:ext` seen inside the current top-level
/// shape; transforms of nested group children come later and are ignored.
fn capture_transform(current: &mut Option<PendingShape>, name: &[u8], e: &BytesStart) {
    if let Some(shape) = current.as_mut() {
        match name {
            b"off" if shape.off.is_none() => shape.off = attr_pair(e, b"x", b"y"),
            b"ext" if shape.ext.is_none() => shape.ext = attr_pair(e, b"cx", b"cy"),
            _ => {}
        }
    }
}

/// Text of the notes body placeholder, paragraphs joined with newlines.
pub(crate) fn parse_notes_text(xml: &str) -> Result<String> {
    let mut text = String::new();
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut shape_depth: Option<usize> = None;
    let mut in_body_shape = false;
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if name == b"sp" && shape_depth.is_none() {
                    shape_depth = Some(depth);
                    in_body_shape = false;
                } else if shape_depth.is_some() && name == b"ph" && is_body_placeholder(e) {
                    in_body_shape = true;
                } else if in_body_shape && name == b"p" && !text.is_empty() {
                    text.push('\n');
                } else if in_body_shape && name == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Empty(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                if shape_depth.is_some() && name == b"ph" && is_body_placeholder(e) {
                    in_body_shape = true;
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_text_run {
                    let fragment = e.unescape().unwrap_or_default();
                    text.push_str(&fragment);
                }
            }
            Ok(Event::End(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if name == b"t" {
                    in_text_run = false;
                } else if name == b"sp" && shape_depth == Some(depth) {
                    shape_depth = None;
                    in_body_shape = false;
                }

                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing notes: {}", e)));
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Number of `p:cm` records in a classic comments part.
pub(crate) fn parse_comment_count(xml: &str) -> Result<usize> {
    let mut count = 0;
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"cm" =>
            {
                count += 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing comments: {}", e)));
            }
            _ => {}
        }
    }

    Ok(count)
}

/// Whether a `p:ph` placeholder element is the notes body.
fn is_body_placeholder(e: &BytesStart) -> bool {
    e.attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"type" && attr.value.as_ref() == b"body")
}

/// Read a pair of float attributes, e.g. `x`/`y` or `cx`/`cy`.
fn attr_pair(e: &BytesStart, first: &[u8], second: &[u8]) -> Option<(f64, f64)> {
    let mut a = None;
    let mut b = None;

    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == first {
            a = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
        } else if key == second {
            b = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
        }
    }

    match (a, b) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
