#![cfg_attr(docsrs, feature(doc_cfg))]
//! Minimal XML toolkit for the XAPI wire protocol.
//!
//! A [`Document`] owns every element and attribute of one request or reply in
//! a single arena and is released as a unit. Requests are assembled with
//! [`Document::add_element`] / [`Document::add_attribute`] and rendered with
//! [`serialize`]; replies are read with [`parse`], searched with the navigator
//! methods, and copied into fixed-width records by the [`mover`] functions.
//!
//! ```rust
//! use xapi_xml::{parse, serialize, Document};
//!
//! let mut doc = Document::new();
//! let root = doc.add_element(None, "libtrans", None).expect("root");
//! let command = doc.add_element(Some(root), "command", None).expect("command");
//! doc.add_element(Some(command), "query_cap", None).expect("query");
//! let bytes = serialize(&doc);
//! assert_eq!(
//!     &bytes[..],
//!     b"<libtrans><command><query_cap></query_cap></command></libtrans>"
//! );
//!
//! let reply = parse(b"<libreply><cap_data><acs>00</acs></cap_data></libreply>").expect("parse");
//! let acs = reply.find_first_by_name(None, "acs").expect("acs");
//! assert_eq!(reply.content(acs), Some("00"));
//! ```

use thiserror::Error;

pub mod document;
pub mod mover;
pub mod navigator;
pub mod parse;
pub mod serialize;

pub use document::{Attribute, Document, Element, ElementId};
pub use mover::{
    move_attributes_to_fields, move_children_to_fields, move_elements_to_fields,
    FieldDescriptor, FillPolicy, RawRecord,
};
pub use parse::parse;
pub use serialize::{serialize, serialized_len};

/// Errors produced while building or parsing a [`Document`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum XmlError {
    #[error("xml: {0}")]
    Xml(String),
    #[error("document already has a root element")]
    RootExists,
    #[error("document has no root element")]
    NoRoot,
    #[error("element {0:?} does not belong to this document")]
    UnknownElement(ElementId),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("attribute {0:?} has an empty value")]
    EmptyAttribute(String),
    #[error("mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedTag { expected: String, found: String },
    #[error("unclosed element <{0}>")]
    Unclosed(String),
}
