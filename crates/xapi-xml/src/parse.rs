//! Build a [`Document`] from reply bytes using quick-xml.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::{Document, ElementId, XmlError};

/// Elements whose text servers emit with unescaped `<` and `>`.
const FREE_TEXT_ELEMENTS: [&str; 2] = ["reason", "uui_text"];

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Escape stray angle brackets inside free text elements so the reader does
/// not mistake them for markup.
fn escape_free_text(input: &[u8]) -> Cow<'_, [u8]> {
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0usize;
    let mut cursor = 0usize;
    loop {
        let next = FREE_TEXT_ELEMENTS
            .iter()
            .filter_map(|name| {
                let open = format!("<{name}>");
                find(&input[cursor..], open.as_bytes()).map(|at| (cursor + at, *name))
            })
            .min_by_key(|(at, _)| *at);
        let Some((at, name)) = next else {
            break;
        };
        let body_start = at + name.len() + 2;
        let close = format!("</{name}>");
        let Some(rel) = find(&input[body_start..], close.as_bytes()) else {
            break;
        };
        let body_end = body_start + rel;
        let body = &input[body_start..body_end];
        if body.iter().any(|b| *b == b'<' || *b == b'>') {
            let buf = out.get_or_insert_with(|| Vec::with_capacity(input.len() + 16));
            buf.extend_from_slice(&input[copied..body_start]);
            for byte in body {
                match byte {
                    b'<' => buf.extend_from_slice(b"&lt;"),
                    b'>' => buf.extend_from_slice(b"&gt;"),
                    other => buf.push(*other),
                }
            }
            copied = body_end;
        }
        cursor = body_end + close.len();
    }
    match out {
        Some(mut buf) => {
            buf.extend_from_slice(&input[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(input),
    }
}

fn open_element(
    doc: &mut Document,
    parent: Option<ElementId>,
    event: &BytesStart<'_>,
) -> Result<(ElementId, String), XmlError> {
    let name = String::from_utf8_lossy(event.name().as_ref()).into_owned();
    let id = doc.add_element(parent, &name, None)?;
    // Duplicate keywords are kept; lookups return the first.
    for attr in event.attributes().with_checks(false) {
        let attr = attr.map_err(|err| XmlError::Xml(err.to_string()))?;
        let keyword = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Xml(err.to_string()))?
            .into_owned();
        doc.push_parsed_attribute(id, keyword, value);
    }
    Ok((id, name))
}

/// Parse one complete XML document.
///
/// Text content is unescaped and attached to the innermost open element;
/// whitespace between elements is dropped. Declarations are retained.
pub fn parse(input: &[u8]) -> Result<Document, XmlError> {
    let source = escape_free_text(input);
    let mut reader = Reader::from_reader(source.as_ref());
    reader.trim_text(true);

    let mut doc = Document::new();
    let mut stack: Vec<(ElementId, String)> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let parent = stack.last().map(|(id, _)| *id);
                let opened = open_element(&mut doc, parent, &e)?;
                stack.push(opened);
            }
            Ok(Event::Empty(e)) => {
                let parent = stack.last().map(|(id, _)| *id);
                open_element(&mut doc, parent, &e)?;
            }
            Ok(Event::End(e)) => {
                let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match stack.pop() {
                    Some((_, expected)) if expected == found => {}
                    Some((_, expected)) => {
                        return Err(XmlError::MismatchedTag { expected, found });
                    }
                    None => {
                        return Err(XmlError::MismatchedTag {
                            expected: String::new(),
                            found,
                        });
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((id, _)) = stack.last() {
                    let text = e.unescape().map_err(|err| XmlError::Xml(err.to_string()))?;
                    doc.append_content(*id, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((id, _)) = stack.last() {
                    doc.append_content(*id, &String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Decl(e)) => {
                doc.add_declaration(&format!("<?{}?>", String::from_utf8_lossy(&e)));
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(XmlError::Xml(err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some((_, name)) = stack.pop() {
        return Err(XmlError::Unclosed(name));
    }
    if doc.root().is_none() {
        return Err(XmlError::NoRoot);
    }
    trace!(bytes = input.len(), elements = doc.len(), "parsed XML document");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_reply() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
            <libreply>
              <cap_data kind="x">
                <acs>00</acs>
                <state>ONLINE</state>
              </cap_data>
              <empty/>
            </libreply>"#;
        let doc = parse(xml).expect("parse");
        let root = doc.root().expect("root");
        assert_eq!(doc.name(root), Some("libreply"));
        assert_eq!(doc.declarations().len(), 1);
        let children = doc.children(root);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.attributes(children[0])[0].value(), "x");
        assert_eq!(doc.name(children[1]), Some("empty"));
        let grandchildren = doc.children(children[0]);
        assert_eq!(doc.content(grandchildren[1]), Some("ONLINE"));
    }

    #[test]
    fn stray_angle_brackets_in_reason_are_tolerated() {
        let xml = b"<libreply><exceptions><reason>SLS0010I <ACS> invalid</reason></exceptions></libreply>";
        let doc = parse(xml).expect("parse");
        let reason = doc.find_first_by_name(None, "reason").expect("reason");
        assert_eq!(doc.content(reason), Some("SLS0010I <ACS> invalid"));
    }

    #[test]
    fn escape_free_text_leaves_clean_input_borrowed() {
        let xml = b"<libreply><reason>plain</reason></libreply>";
        assert!(matches!(escape_free_text(xml), Cow::Borrowed(_)));
    }

    #[test]
    fn mismatched_and_unclosed_tags_fail() {
        assert!(parse(b"<a><b></a>").is_err());
        assert!(matches!(parse(b"<a><b></b>"), Err(XmlError::Unclosed(_))));
        assert!(matches!(parse(b"   "), Err(XmlError::NoRoot)));
        assert!(matches!(parse(b"<a></a><b></b>"), Err(XmlError::RootExists)));
    }
}
