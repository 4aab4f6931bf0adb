//! Aggregator for the XAPI gateway workspace; see the [`xapi`] crate.

pub use xapi::*;
