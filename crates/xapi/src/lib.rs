#![cfg_attr(docsrs, feature(doc_cfg))]
//! ACSAPI to XAPI gateway.
//!
//! Each inbound ACSAPI [`Request`](acsapi::Request) is registered in the
//! [`RequestTable`], translated into one XAPI `<libtrans>` document, exchanged
//! with the library manager over TCP, and answered with one or more ACSAPI
//! response packets.
//!
//! ```rust,no_run
//! use xapi::acsapi::{CapId, QueryCriteria, Request, RequestBody};
//! use xapi::{Gateway, GatewayError};
//!
//! # async fn run() -> Result<(), GatewayError> {
//! let gateway = Gateway::from_env()?;
//! let request = Request::new(1, RequestBody::Query(QueryCriteria::Cap(vec![CapId::new(0, 0, 0)])));
//! let mut packets = Vec::new();
//! let status = gateway.process(&request, &mut packets).await;
//! println!("{status}: {} packets", packets.len());
//! # Ok(())
//! # }
//! ```

pub use acsapi;
pub use tl_xapi;
pub use xapi_xml;

pub mod common;
pub mod config;
pub mod gateway;
pub mod handler;
pub mod header;
pub mod local;
pub mod lookup;
pub mod mount;
pub mod names;
pub mod qacs;
pub mod qcap;
pub mod qdrv;
pub mod qlsm;
pub mod qserver;
pub mod qvol;
mod raw;
pub mod table;

use thiserror::Error;

pub use common::{DateFormat, ExceptionReason, ReplyHeader};
pub use config::{ConfigError, XapiConfig};
pub use gateway::{render_query, Gateway, GatewayState};
pub use handler::{
    run_action, run_query, ActionHandler, HandlerContext, QueryHandler, ResponseSink,
};
pub use lookup::{LookupError, LookupStore, LookupTables, StaticTables, TableLoader};
pub use table::{CancelOutcome, RequestFlags, RequestHandle, RequestTable, TableError};

/// Error type produced by the gateway outside the ACSAPI status channel.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Xml(#[from] xapi_xml::XmlError),
    #[error(transparent)]
    Session(#[from] tl_xapi::SessionError),
}
