//! Building blocks of the `xapictl` binary.

pub mod cmd_parse;
pub mod cmd_query;
pub mod cmd_render;
pub mod common;
