//! QUERY SERVER.

use acsapi::{ResponseBody, ServerStatus, State, Status};
use xapi_xml::{Document, ElementId, FieldDescriptor, FillPolicy, XmlError};

use crate::handler::QueryHandler;
use crate::lookup::LookupTables;
use crate::names::*;
use crate::raw::{self, raw_record};

raw_record! {
    /// The `<server_data>` fragment.
    pub struct RawServer, field RawServerField {
        ServerType => server_type: 8,
        ServiceLevel => service_level: 8,
        Subsystem => subsystem: 4,
        StartDate => start_date: 10,
        StartTime => start_time: 8,
        Terminating => terminating: 1,
        VtcsAvailable => vtcs_available: 1,
    }
}

pub struct QueryServer;

impl QueryHandler for QueryServer {
    type Id = ();
    type Raw = RawServer;
    type Item = ServerStatus;

    const ELEMENT: &'static str = QUERY_SERVER;
    const FRAGMENT: &'static str = SERVER_DATA;
    const FIELDS: &'static [FieldDescriptor<RawServerField>] = &[
        FieldDescriptor::new(SERVER_DATA, SERVER_TYPE, RawServerField::ServerType, FillPolicy::Blank),
        FieldDescriptor::new(SERVER_DATA, SERVICE_LEVEL, RawServerField::ServiceLevel, FillPolicy::Blank),
        FieldDescriptor::new(SERVER_DATA, SUBSYSTEM_NAME, RawServerField::Subsystem, FillPolicy::Blank),
        FieldDescriptor::new(SERVER_DATA, SUBSYSTEM_START_DATE, RawServerField::StartDate, FillPolicy::Blank),
        FieldDescriptor::new(SERVER_DATA, SUBSYSTEM_START_TIME, RawServerField::StartTime, FillPolicy::Blank),
        FieldDescriptor::new(
            SERVER_DATA,
            TERMINATION_IN_PROGRESS,
            RawServerField::Terminating,
            FillPolicy::Blank,
        ),
        FieldDescriptor::new(SERVER_DATA, VTCS_AVAILABLE, RawServerField::VtcsAvailable, FillPolicy::Blank),
    ];
    const MAX_COUNT: usize = 0;

    fn build(_doc: &mut Document, _element: ElementId, _ids: &[()]) -> Result<(), XmlError> {
        Ok(())
    }

    /// Full service means RUN, anything less IDLE; a termination in
    /// progress overrides both. Free cells are not reported by the server.
    fn map(raw: &RawServer, _requested: Option<()>, _tables: &LookupTables) -> ServerStatus {
        let state = if raw::starts_with(&raw.terminating, content::YES) {
            State::IdlePending
        } else if raw::starts_with(&raw.service_level, "FULL") {
            State::Run
        } else {
            State::Idle
        };
        ServerStatus {
            status: Status::Success,
            state,
            freecells: 0,
        }
    }

    fn body(items: Vec<ServerStatus>) -> ResponseBody {
        items
            .into_iter()
            .next()
            .map_or(ResponseBody::Empty, ResponseBody::Server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xapi_xml::{move_children_to_fields, parse, serialize};

    fn state(fragment: &str) -> State {
        let doc = parse(format!("<libreply>{fragment}</libreply>").as_bytes()).expect("parse");
        let data = doc.find_first_by_name(None, SERVER_DATA).expect("server_data");
        let mut raw = RawServer::default();
        move_children_to_fields(&doc, data, QueryServer::FIELDS, &mut raw);
        QueryServer::map(&raw, None, &LookupTables::default()).state
    }

    #[test]
    fn request_has_no_selection() {
        let mut doc = Document::new();
        let element = doc.add_element(None, QUERY_SERVER, None).expect("root");
        QueryServer::build(&mut doc, element, &[]).expect("build");
        assert_eq!(&serialize(&doc)[..], &b"<query_server></query_server>"[..]);
    }

    #[test]
    fn service_level_and_termination_pick_state() {
        assert_eq!(
            state("<server_data><service_level>FULL</service_level></server_data>"),
            State::Run
        );
        assert_eq!(
            state("<server_data><service_level>BASE</service_level></server_data>"),
            State::Idle
        );
        assert_eq!(
            state(
                "<server_data><service_level>FULL</service_level>\
                 <termination_in_progress>Y</termination_in_progress></server_data>"
            ),
            State::IdlePending
        );
        assert_eq!(state("<server_data/>"), State::Idle);
    }

    #[test]
    fn body_carries_one_entry() {
        let status = ServerStatus {
            status: Status::Success,
            state: State::Run,
            freecells: 0,
        };
        assert_eq!(
            QueryServer::body(vec![status.clone()]),
            ResponseBody::Server(status)
        );
        assert_eq!(QueryServer::body(Vec::new()), ResponseBody::Empty);
    }
}
