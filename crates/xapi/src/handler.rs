//! Shared request/reply/pagination flow of the query-style commands.
//!
//! A [`QueryHandler`] supplies the command specific parts: how to describe the
//! selected ids in XML, which reply fragment carries one item, the field table
//! that extracts it, and the mapping into an ACSAPI status entry. [`run_query`]
//! does the rest. Single-item commands such as MOUNT implement
//! [`ActionHandler`] and go through [`run_action`].

use std::time::Instant;

use acsapi::{
    Command, DriveId, MessageOptions, ResponseBody, ResponseKind, ResponsePacket, Status, MAX_ID,
};
use bytes::Bytes;
use tl_xapi::{SessionStats, XapiSession};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};
use xapi_xml::{
    move_children_to_fields, serialize, Document, ElementId, FieldDescriptor, RawRecord, XmlError,
};

use crate::common::ReplyHeader;
use crate::config::XapiConfig;
use crate::header::start_request;
use crate::lookup::{LookupStore, LookupTables};
use crate::table::RequestHandle;

/// Destination of the packets produced for one request.
pub trait ResponseSink: Send {
    fn emit(&mut self, packet: ResponsePacket);
}

impl ResponseSink for Vec<ResponsePacket> {
    fn emit(&mut self, packet: ResponsePacket) {
        self.push(packet);
    }
}

impl ResponseSink for mpsc::UnboundedSender<ResponsePacket> {
    fn emit(&mut self, packet: ResponsePacket) {
        if self.send(packet).is_err() {
            warn!("response receiver dropped");
        }
    }
}

/// Everything a handler may consult while serving one request.
pub struct HandlerContext<'a> {
    /// Sequence number of the request as sent by the client.
    pub sequence: u32,
    pub config: &'a XapiConfig,
    pub store: &'a LookupStore,
    pub stats: &'a SessionStats,
    pub handle: &'a RequestHandle,
    pub command: Command,
    /// ACSAPI user id of the request, if any.
    pub user: Option<&'a str>,
}

impl HandlerContext<'_> {
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub(crate) fn packet(&self, kind: ResponseKind, status: Status, body: ResponseBody) -> ResponsePacket {
        ResponsePacket {
            sequence: self.sequence(),
            command: self.command,
            kind,
            status,
            body,
        }
    }
}

/// Command specific half of a query-style exchange.
pub trait QueryHandler {
    /// Identifier selected by the request.
    type Id: Clone + Send + Sync;
    /// Fixed-width record one reply fragment is extracted into.
    type Raw: RawRecord + Default;
    /// ACSAPI status entry produced per fragment.
    type Item: Send;

    /// Name of the command element, e.g. `query_cap`.
    const ELEMENT: &'static str;
    /// Name of the repeated reply fragment, e.g. `cap_data`.
    const FRAGMENT: &'static str;
    const FIELDS: &'static [FieldDescriptor<<Self::Raw as RawRecord>::Field>];
    const MIN_COUNT: usize = 0;
    const MAX_COUNT: usize = MAX_ID;

    /// Describe `ids` under the command element; an empty list selects all.
    fn build(doc: &mut Document, element: ElementId, ids: &[Self::Id]) -> Result<(), XmlError>;

    /// Map one extracted fragment. `requested` is the id at the same
    /// position in the request, if the request named ids. `tables` is the
    /// generation captured when the request registered.
    fn map(raw: &Self::Raw, requested: Option<Self::Id>, tables: &LookupTables) -> Self::Item;

    fn body(items: Vec<Self::Item>) -> ResponseBody;
}

/// Command specific half of a single-item exchange such as MOUNT.
///
/// Unlike a query, an escalated reply header fails the whole request.
pub trait ActionHandler {
    type Raw: RawRecord + Default;

    const ELEMENT: &'static str;
    /// Name of the reply fragment describing the outcome, e.g. `mount_data`.
    const FRAGMENT: &'static str;
    const FIELDS: &'static [FieldDescriptor<<Self::Raw as RawRecord>::Field>];

    fn build(
        &self,
        doc: &mut Document,
        element: ElementId,
        options: MessageOptions,
    ) -> Result<(), XmlError>;

    fn body(&self, raw: &Self::Raw) -> ResponseBody;
}

/// Add `<list>` holding one `<entry>` per id when there is more than one,
/// otherwise a bare `<entry>` directly under `parent`.
pub(crate) fn add_id_entries<T>(
    doc: &mut Document,
    parent: ElementId,
    list: &str,
    ids: &[T],
    mut add_entry: impl FnMut(&mut Document, ElementId, &T) -> Result<(), XmlError>,
) -> Result<(), XmlError> {
    let container = if ids.len() > 1 {
        doc.add_element(Some(parent), list, None)?
    } else {
        parent
    };
    for id in ids {
        add_entry(doc, container, id)?;
    }
    Ok(())
}

/// Two digit decimal rendering used for ACS, LSM and CAP numbers.
pub(crate) fn two_digits(value: u16) -> String {
    format!("{value:02}")
}

/// Location id of a real drive, `R:AA:LL:PP:DD`.
pub(crate) fn drive_location_id(id: DriveId) -> String {
    format!(
        "R:{:02}:{:02}:{:02}:{:02}",
        id.acs, id.lsm, id.panel, id.drive
    )
}

pub(crate) fn validate_count(count: usize, min: usize, max: usize) -> Result<(), Status> {
    if count < min {
        Err(Status::CountTooSmall)
    } else if count > max {
        Err(Status::CountTooLarge)
    } else {
        Ok(())
    }
}

/// Every fragment named `name`: the first depth-first match and its
/// same-named siblings, in document order.
pub(crate) fn fragments(doc: &Document, name: &str) -> Vec<ElementId> {
    let Some(first) = doc.find_first_by_name(None, name) else {
        return Vec::new();
    };
    let Some(parent) = doc.parent(first) else {
        return vec![first];
    };
    std::iter::successors(Some(first), |current| {
        doc.find_next_sibling_by_name(parent, Some(*current), name)
    })
    .collect()
}

fn render(
    config: &XapiConfig,
    seq: u32,
    user: Option<&str>,
    name: &str,
    fill: impl FnOnce(&mut Document, ElementId) -> Result<(), XmlError>,
) -> Result<Bytes, XmlError> {
    let (mut doc, command) = start_request(config, seq, user)?;
    let element = doc.add_element(Some(command), name, None)?;
    fill(&mut doc, element)?;
    trace!(seq, elements = doc.len(), "request document built");
    Ok(serialize(&doc))
}

/// Render the complete request document for `ids`.
pub fn build_request<H: QueryHandler>(
    config: &XapiConfig,
    seq: u32,
    user: Option<&str>,
    ids: &[H::Id],
) -> Result<Bytes, XmlError> {
    render(config, seq, user, H::ELEMENT, |doc, element| {
        H::build(doc, element, ids)
    })
}

/// Render the complete request document for one action.
pub fn build_action_request<A: ActionHandler>(
    config: &XapiConfig,
    seq: u32,
    user: Option<&str>,
    action: &A,
    options: MessageOptions,
) -> Result<Bytes, XmlError> {
    render(config, seq, user, A::ELEMENT, |doc, element| {
        action.build(doc, element, options)
    })
}

/// One network exchange plus reply header handling shared by both flows.
///
/// A server reporting a release below the configured floor is rejected
/// even when its reply is otherwise clean.
async fn exchange(
    ctx: &HandlerContext<'_>,
    element: &'static str,
    request: Bytes,
) -> Result<(Document, ReplyHeader), Status> {
    let seq = ctx.sequence();
    let started = Instant::now();
    let mut session = XapiSession::new(ctx.config.session_options(), ctx.stats.clone());
    let reply = session.transact(&request, ctx.handle).await.map_err(|err| {
        warn!(seq, command = element, error = %err, "XAPI exchange failed");
        err.status()
    })?;
    drop(request);
    debug!(seq, command = element, elapsed = ?started.elapsed(), "reply received");

    let header = ReplyHeader::parse(&reply);
    ctx.store.observe_config_token(&header.config_token);
    if header.escalated {
        warn!(
            seq,
            command = element,
            rc = header.return_code,
            reason = header.reason_code,
            status = %header.status(),
            "{}: {}",
            header.error_text(),
            header.reason_text()
        );
    }
    let floor = ctx.config.release();
    if header.release != 0 && header.release < floor {
        warn!(seq, server = header.release, floor, "server release below configured floor");
        return Err(Status::IncompatibleServer);
    }
    Ok((reply, header))
}

/// Build, send, extract and paginate one query-style request.
///
/// `Ok` means the final packet was emitted; on `Err` the caller emits a
/// status-only final packet. An ACKNOWLEDGE packet precedes any network
/// activity.
pub async fn run_query<H: QueryHandler>(
    ctx: &HandlerContext<'_>,
    ids: &[H::Id],
    sink: &mut dyn ResponseSink,
) -> Result<(), Status> {
    validate_count(ids.len(), H::MIN_COUNT, H::MAX_COUNT)?;
    let seq = ctx.sequence();

    let request = build_request::<H>(ctx.config, seq, ctx.user, ids).map_err(|err| {
        error!(seq, command = H::ELEMENT, error = %err, "failed to build request");
        Status::ProcessFailure
    })?;

    sink.emit(ResponsePacket::acknowledge(seq, ctx.command));
    let (reply, header) = exchange(ctx, H::ELEMENT, request).await?;
    let header_status = header.status();

    // Per-item errors arrive inside the fragments, so extraction proceeds
    // even when the header reports an error.
    let found = fragments(&reply, H::FRAGMENT);
    debug!(seq, fragments = found.len(), "reply fragments");
    if found.is_empty() {
        return Err(if header_status.is_success() {
            Status::ProcessFailure
        } else {
            header_status
        });
    }

    let tables = ctx.handle.snapshot().unwrap_or_default();
    let total = found.len();
    let mut items = Vec::with_capacity(total.min(MAX_ID));
    for (index, fragment) in found.into_iter().enumerate() {
        let mut raw = H::Raw::default();
        move_children_to_fields(&reply, fragment, H::FIELDS, &mut raw);
        items.push(H::map(&raw, ids.get(index).cloned(), &tables));
        if items.len() == MAX_ID && index + 1 < total {
            trace!(seq, items = items.len(), "intermediate response");
            let batch = std::mem::replace(&mut items, Vec::with_capacity(MAX_ID));
            sink.emit(ctx.packet(ResponseKind::Intermediate, Status::Success, H::body(batch)));
        }
    }
    sink.emit(ctx.packet(ResponseKind::Final, Status::Success, H::body(items)));
    Ok(())
}

/// Build, send and extract one single-item action.
///
/// Same contract as [`run_query`]: `Ok` means the final packet was emitted.
pub async fn run_action<A: ActionHandler>(
    ctx: &HandlerContext<'_>,
    action: &A,
    options: MessageOptions,
    sink: &mut dyn ResponseSink,
) -> Result<(), Status> {
    let seq = ctx.sequence();
    let request = build_action_request(ctx.config, seq, ctx.user, action, options).map_err(
        |err| {
            error!(seq, command = A::ELEMENT, error = %err, "failed to build request");
            Status::ProcessFailure
        },
    )?;

    sink.emit(ResponsePacket::acknowledge(seq, ctx.command));
    let (reply, header) = exchange(ctx, A::ELEMENT, request).await?;
    let status = header.status();
    if !status.is_success() {
        return Err(status);
    }
    let Some(fragment) = reply.find_first_by_name(None, A::FRAGMENT) else {
        warn!(seq, command = A::ELEMENT, fragment = A::FRAGMENT, "reply fragment missing");
        return Err(Status::ProcessFailure);
    };
    let mut raw = A::Raw::default();
    move_children_to_fields(&reply, fragment, A::FIELDS, &mut raw);
    sink.emit(ctx.packet(ResponseKind::Final, Status::Success, action.body(&raw)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xapi_xml::parse;

    #[test]
    fn count_bounds() {
        assert_eq!(validate_count(0, 0, MAX_ID), Ok(()));
        assert_eq!(validate_count(0, 1, MAX_ID), Err(Status::CountTooSmall));
        assert_eq!(validate_count(43, 0, MAX_ID), Err(Status::CountTooLarge));
        assert_eq!(validate_count(2, 1, 1), Err(Status::CountTooLarge));
    }

    #[test]
    fn drive_location_id_is_zero_padded() {
        assert_eq!(drive_location_id(DriveId::new(0, 1, 10, 3)), "R:00:01:10:03");
    }

    #[tokio::test]
    async fn channel_sink_forwards_packets() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        tx.emit(ResponsePacket::acknowledge(4, Command::Query));
        drop(tx);
        let packet = rx.recv().await.expect("packet");
        assert_eq!(packet.kind, ResponseKind::Acknowledge);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn fragments_follow_first_match_siblings() {
        let doc = parse(
            b"<libreply><header/><data><cap_data>1</cap_data><x/><cap_data>2</cap_data></data>\
              <cap_data>elsewhere</cap_data></libreply>",
        )
        .expect("parse");
        let found = fragments(&doc, "cap_data");
        let contents: Vec<_> = found.iter().filter_map(|id| doc.content(*id)).collect();
        assert_eq!(contents, vec!["1", "2"]);
        assert!(fragments(&doc, "lsm_data").is_empty());
    }

    #[test]
    fn id_entries_wrap_only_multiple_ids() {
        let mut doc = Document::new();
        let root = doc.add_element(None, "query", None).expect("root");
        add_id_entries(&mut doc, root, "list", &[1u16], |doc, parent, id| {
            doc.add_element(Some(parent), "id", Some(&two_digits(*id)))
                .map(|_| ())
        })
        .expect("single");
        assert_eq!(doc.children(root).len(), 1);
        assert_eq!(doc.content(doc.children(root)[0]), Some("01"));

        let mut doc = Document::new();
        let root = doc.add_element(None, "query", None).expect("root");
        add_id_entries(&mut doc, root, "list", &[1u16, 2], |doc, parent, id| {
            doc.add_element(Some(parent), "id", Some(&two_digits(*id)))
                .map(|_| ())
        })
        .expect("multiple");
        let list = doc.children(root)[0];
        assert_eq!(doc.name(list), Some("list"));
        assert_eq!(doc.children(list).len(), 2);
    }
}
