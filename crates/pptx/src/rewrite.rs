//! Event-stream rewriting of XML parts.
//!
//! The save path never reformats markup it does not touch: each rewriter
//! streams the original events through a writer and only withholds the
//! subtrees or text it was asked to drop.

use std::collections::HashSet;
use std::io::Cursor;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use sweep_core::{Error, Result};

use crate::parser::local_name;

/// Copy `xml`, dropping the `remove`-indexed subtrees among the direct
/// `children` of the first `parent` element.
///
/// Indices count qualifying children in document order, matching the
/// order [`crate::parser::parse_shape_bounds`] and the comment parser
/// report them in.
pub(crate) fn strip_children(
    xml: &str,
    parent: &[u8],
    children: &[&[u8]],
    remove: &HashSet<usize>,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut in_parent = false;
    let mut depth = 0usize;
    let mut child_index = 0usize;
    let mut skip_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error rewriting part: {}", e)))?;

        if matches!(event, Event::Eof) {
            break;
        }

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            }
            continue;
        }

        let mut keep = true;

        match event {
            Event::Start(ref e) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if !in_parent {
                    if name == parent {
                        in_parent = true;
                        depth = 0;
                    }
                } else if depth == 0 && children.contains(&name) {
                    let index = child_index;
                    child_index += 1;
                    if remove.contains(&index) {
                        skip_depth = 1;
                        keep = false;
                    } else {
                        depth += 1;
                    }
                } else {
                    depth += 1;
                }
            }
            Event::Empty(ref e) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if in_parent && depth == 0 && children.contains(&name) {
                    let index = child_index;
                    child_index += 1;
                    if remove.contains(&index) {
                        keep = false;
                    }
                }
            }
            Event::End(_) => {
                if in_parent {
                    if depth == 0 {
                        in_parent = false;
                    } else {
                        depth -= 1;
                    }
                }
            }
            _ => {}
        }

        if keep {
            writer
                .write_event(event)
                .map_err(|e| Error::XmlError(format!("Error writing part: {}", e)))?;
        }
    }

    into_xml_string(writer)
}

/// Copy a notes part, dropping the text content of the body placeholder
/// shape. Paragraph and run structure stays in place; only the character
/// data inside `a:t` elements is withheld.
pub(crate) fn clear_notes_body_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut depth = 0usize;
    let mut shape_depth: Option<usize> = None;
    let mut in_body_shape = false;
    let mut in_text_run = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error rewriting notes: {}", e)))?;

        if matches!(event, Event::Eof) {
            break;
        }

        let mut keep = true;

        match event {
            Event::Start(ref e) => {
                depth += 1;
                let qname = e.name();
                let name = local_name(qname.as_ref());

                if name == b"sp" && shape_depth.is_none() {
                    shape_depth = Some(depth);
                    in_body_shape = false;
                } else if shape_depth.is_some() && name == b"ph" && is_body_placeholder(e) {
                    in_body_shape = true;
                } else if in_body_shape && name == b"t" {
                    in_text_run = true;
                }
            }
            Event::Empty(ref e) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                if shape_depth.is_some() && name == b"ph" && is_body_placeholder(e) {
                    in_body_shape = true;
                }
            }
            Event::Text(_) | Event::CData(_) => {
                if in_text_run {
                    keep = false;
                }
            }
            Event::End(ref e) => {
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
            _ => {}
        }

        if keep {
            writer
                .write_event(event)
                .map_err(|e| Error::XmlError(format!("Error writing notes: {}", e)))?;
        }
    }

    into_xml_string(writer)
}

fn is_body_placeholder(e: &quick_xml::events::BytesStart) -> bool {
    e.attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"type" && attr.value.as_ref() == b"body")
}

fn into_xml_string(writer: Writer<Cursor<Vec<u8>>>) -> Result<String> {
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| Error::XmlError(format!("Rewritten part is not UTF-8: {}", e)))
}
