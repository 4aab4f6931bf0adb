//! Two-pass serializer: size the output, then write it into one buffer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Document, ElementId};

fn escaped(byte: u8) -> Option<&'static [u8]> {
    match byte {
        b'\'' => Some(b"&apos;"),
        b'"' => Some(b"&quot;"),
        b'&' => Some(b"&amp;"),
        b'<' => Some(b"&lt;"),
        b'>' => Some(b"&gt;"),
        _ => None,
    }
}

fn escaped_len(text: &str) -> usize {
    text.bytes()
        .map(|b| escaped(b).map_or(1, <[u8]>::len))
        .sum()
}

fn element_len(doc: &Document, id: ElementId) -> usize {
    let Some(element) = doc.element(id) else {
        return 0;
    };
    let name = element.name().len();
    // "<name" ">" "</name>"
    let mut len = 1 + name + 1 + 2 + name + 1;
    for attr in element.attributes() {
        // ` keyword="value"`
        len += 1 + attr.keyword().len() + 2 + attr.value().len() + 1;
    }
    if let Some(content) = element.content() {
        len += escaped_len(content);
    }
    len + element
        .children()
        .iter()
        .map(|child| element_len(doc, *child))
        .sum::<usize>()
}

/// Exact number of bytes [`serialize`] will produce for `doc`.
pub fn serialized_len(doc: &Document) -> usize {
    let declarations: usize = doc.declarations().iter().map(String::len).sum();
    declarations + doc.root().map_or(0, |root| element_len(doc, root))
}

fn write_element(doc: &Document, id: ElementId, out: &mut BytesMut) {
    let Some(element) = doc.element(id) else {
        return;
    };
    out.put_u8(b'<');
    out.put_slice(element.name().as_bytes());
    for attr in element.attributes() {
        out.put_u8(b' ');
        out.put_slice(attr.keyword().as_bytes());
        out.put_slice(b"=\"");
        out.put_slice(attr.value().as_bytes());
        out.put_u8(b'"');
    }
    out.put_u8(b'>');
    if let Some(content) = element.content() {
        for byte in content.bytes() {
            match escaped(byte) {
                Some(entity) => out.put_slice(entity),
                None => out.put_u8(byte),
            }
        }
    }
    for child in element.children() {
        write_element(doc, *child, out);
    }
    out.put_slice(b"</");
    out.put_slice(element.name().as_bytes());
    out.put_u8(b'>');
}

/// Render `doc` as XML text.
///
/// Declarations come first, then the element tree in depth-first pre-order.
/// Element content is escaped; names and attribute values are written as is.
pub fn serialize(doc: &Document) -> Bytes {
    let len = serialized_len(doc);
    let mut out = BytesMut::with_capacity(len);
    for declaration in doc.declarations() {
        out.put_slice(declaration.as_bytes());
    }
    if let Some(root) = doc.root() {
        write_element(doc, root, &mut out);
    }
    debug_assert_eq!(out.len(), len);
    out.freeze()
}
