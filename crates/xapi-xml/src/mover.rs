//! Table driven copy of element and attribute content into fixed-width records.
//!
//! A record type implements [`RawRecord`] and names its fields with a small
//! `Copy` enum. A table of [`FieldDescriptor`]s maps XML names to those fields;
//! the `move_*` functions walk the table and fill each field according to its
//! [`FillPolicy`].

use tracing::warn;

use crate::{Document, ElementId};

/// How content shorter than the destination field is padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Left justify; bytes past the content keep their previous value.
    None,
    /// Left justify and pad with blanks; absent content leaves all blanks.
    Blank,
    /// Right justify and pad with `'0'`, but only when content is present.
    Zero,
    /// Right justify; the field is zero filled even for empty or absent content.
    ZeroAll,
}

/// One row of a field mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor<F> {
    /// Expected parent element name; empty matches any parent.
    pub parent: &'static str,
    /// Element name or attribute keyword.
    pub name: &'static str,
    pub field: F,
    pub fill: FillPolicy,
    /// Bit OR'd into a one byte field when the content is `Y`/`YES`; 0 disables.
    pub bit: u8,
}

impl<F> FieldDescriptor<F> {
    pub const fn new(parent: &'static str, name: &'static str, field: F, fill: FillPolicy) -> Self {
        Self {
            parent,
            name,
            field,
            fill,
            bit: 0,
        }
    }

    /// Descriptor for a one byte flag field.
    pub const fn flag(parent: &'static str, name: &'static str, field: F, bit: u8) -> Self {
        Self {
            parent,
            name,
            field,
            fill: FillPolicy::None,
            bit,
        }
    }
}

/// A record made of fixed-width byte fields addressed by `Field`.
pub trait RawRecord {
    type Field: Copy + 'static;

    fn field_mut(&mut self, field: Self::Field) -> &mut [u8];
}

fn is_yes(content: &str) -> bool {
    content.eq_ignore_ascii_case("Y") || content.eq_ignore_ascii_case("YES")
}

/// Copy `content` into `dest` according to `fill`; returns whether it was truncated.
pub fn fill_field(dest: &mut [u8], content: &str, fill: FillPolicy, bit: u8) -> bool {
    if bit != 0 && dest.len() == 1 {
        if is_yes(content) {
            dest[0] |= bit;
        }
        return false;
    }

    let bytes = content.as_bytes();
    let width = dest.len();
    let truncated = bytes.len() > width;
    let bytes = &bytes[..bytes.len().min(width)];
    match fill {
        FillPolicy::None => dest[..bytes.len()].copy_from_slice(bytes),
        FillPolicy::Blank => {
            dest.fill(b' ');
            dest[..bytes.len()].copy_from_slice(bytes);
        }
        FillPolicy::Zero | FillPolicy::ZeroAll => {
            if bytes.is_empty() && fill == FillPolicy::Zero {
                return false;
            }
            let pad = width - bytes.len();
            dest[..pad].fill(b'0');
            dest[pad..].copy_from_slice(bytes);
        }
    }
    truncated
}

fn apply<R: RawRecord>(
    record: &mut R,
    descriptor: &FieldDescriptor<R::Field>,
    content: &str,
) {
    let dest = record.field_mut(descriptor.field);
    let width = dest.len();
    if fill_field(dest, content, descriptor.fill, descriptor.bit) {
        warn!(
            field = descriptor.name,
            width,
            len = content.len(),
            "XML content truncated to field width"
        );
    }
}

/// Blank and zero-all fields start out as blanks and zeros before any content
/// is moved; the others are left alone.
fn initialise<R: RawRecord>(record: &mut R, table: &[FieldDescriptor<R::Field>]) {
    for descriptor in table.iter().filter(|descriptor| descriptor.bit == 0) {
        match descriptor.fill {
            FillPolicy::Blank => record.field_mut(descriptor.field).fill(b' '),
            FillPolicy::ZeroAll => record.field_mut(descriptor.field).fill(b'0'),
            FillPolicy::None | FillPolicy::Zero => {}
        }
    }
}

fn parent_matches(doc: &Document, element: ElementId, parent: &str) -> bool {
    parent.is_empty() || doc.name(element) == Some(parent)
}

/// Fill `record` from the children of `context`.
///
/// Descriptors whose parent name is empty or equals the context name read the
/// first immediate child with a matching name. A descriptor naming a different
/// parent widens the search to the first depth-first descendant of `context`
/// whose own parent carries that name. Returns the number of fields written.
pub fn move_children_to_fields<R: RawRecord>(
    doc: &Document,
    context: ElementId,
    table: &[FieldDescriptor<R::Field>],
    record: &mut R,
) -> usize {
    initialise(record, table);
    let mut moved = 0;
    for descriptor in table {
        let source = if parent_matches(doc, context, descriptor.parent) {
            doc.find_next_sibling_by_name(context, None, descriptor.name)
        } else {
            doc.find_first_with_parent(context, descriptor.parent, descriptor.name)
        };
        if let Some(id) = source {
            apply(record, descriptor, doc.content(id).unwrap_or(""));
            moved += 1;
        }
    }
    moved
}

/// Fill `record` from the attributes of `element`.
pub fn move_attributes_to_fields<R: RawRecord>(
    doc: &Document,
    element: ElementId,
    table: &[FieldDescriptor<R::Field>],
    record: &mut R,
) -> usize {
    initialise(record, table);
    let mut moved = 0;
    for descriptor in table {
        if !parent_matches(doc, element, descriptor.parent) {
            continue;
        }
        if let Some(attr) = doc.find_attribute(element, descriptor.name) {
            apply(record, descriptor, attr.value());
            moved += 1;
        }
    }
    moved
}

/// Fill `record` from anywhere in the document, matching each descriptor's
/// element name and parent name.
pub fn move_elements_to_fields<R: RawRecord>(
    doc: &Document,
    table: &[FieldDescriptor<R::Field>],
    record: &mut R,
) -> usize {
    initialise(record, table);
    let Some(root) = doc.root() else {
        return 0;
    };
    let mut moved = 0;
    for descriptor in table {
        let source = if descriptor.parent.is_empty() {
            doc.find_first_by_name(Some(root), descriptor.name)
        } else {
            doc.find_first_with_parent(root, descriptor.parent, descriptor.name)
        };
        if let Some(id) = source {
            apply(record, descriptor, doc.content(id).unwrap_or(""));
            moved += 1;
        }
    }
    moved
}
