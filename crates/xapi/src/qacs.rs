//! QUERY ACS.

use acsapi::{AcsStatus, ResponseBody, State, Status};
use xapi_xml::{Document, ElementId, FieldDescriptor, FillPolicy, XmlError};

use crate::handler::{add_id_entries, two_digits, QueryHandler};
use crate::lookup::LookupTables;
use crate::names::*;
use crate::raw::{self, raw_record};

raw_record! {
    /// One `<acs_data>` fragment.
    pub struct RawAcs, field RawAcsField {
        Acs => acs: 2,
        LsmCount => lsm_count: 4,
        Status => status: 16,
        State => state: 9,
        FreeCellCount => free_cell_count: 8,
        ScratchCount => scratch_count: 7,
        DualLmu => dual_lmu: 3,
        CapCount => cap_count: 3,
        Result => result: 8,
        Error => error: 8,
        Reason => reason: 124,
    }
}

pub struct QueryAcs;

impl QueryHandler for QueryAcs {
    type Id = u16;
    type Raw = RawAcs;
    type Item = AcsStatus;

    const ELEMENT: &'static str = QUERY_ACS;
    const FRAGMENT: &'static str = ACS_DATA;
    const FIELDS: &'static [FieldDescriptor<RawAcsField>] = &[
        FieldDescriptor::new(ACS_DATA, ACS, RawAcsField::Acs, FillPolicy::None),
        FieldDescriptor::new(ACS_DATA, ACS_STATUS, RawAcsField::Status, FillPolicy::None),
        FieldDescriptor::new(ACS_DATA, LSM_COUNT, RawAcsField::LsmCount, FillPolicy::Zero),
        FieldDescriptor::new(ACS_DATA, SCRATCH_COUNT, RawAcsField::ScratchCount, FillPolicy::Zero),
        FieldDescriptor::new(ACS_DATA, FREE_CELL_COUNT, RawAcsField::FreeCellCount, FillPolicy::Zero),
        FieldDescriptor::new(ACS_DATA, DUAL_LMU_CONFIG, RawAcsField::DualLmu, FillPolicy::None),
        FieldDescriptor::new(ACS_DATA, STATE, RawAcsField::State, FillPolicy::None),
        FieldDescriptor::new(ACS_DATA, CAP_COUNT, RawAcsField::CapCount, FillPolicy::Zero),
        FieldDescriptor::new(ACS_DATA, RESULT, RawAcsField::Result, FillPolicy::None),
        FieldDescriptor::new(ACS_DATA, ERROR, RawAcsField::Error, FillPolicy::None),
        FieldDescriptor::new(ACS_DATA, REASON, RawAcsField::Reason, FillPolicy::None),
    ];

    fn build(doc: &mut Document, element: ElementId, ids: &[u16]) -> Result<(), XmlError> {
        add_id_entries(doc, element, ACS_LIST, ids, |doc, parent, acs| {
            doc.add_element(Some(parent), ACS, Some(&two_digits(*acs)))
                .map(|_| ())
        })
    }

    fn map(raw: &RawAcs, requested: Option<u16>, _tables: &LookupTables) -> AcsStatus {
        let acs = if raw::present(&raw.acs) {
            raw::number(&raw.acs) as u16
        } else {
            requested.unwrap_or_default()
        };
        if raw.result[0] == b'F' {
            return AcsStatus {
                acs,
                status: Status::AcsNotInLibrary,
                state: State::Unknown(0),
                freecells: 0,
            };
        }
        let state = if raw::starts_with(&raw.status, "CON") && !raw::starts_with(&raw.state, "OFF") {
            State::Online
        } else {
            State::Offline
        };
        AcsStatus {
            acs,
            status: Status::Success,
            state,
            freecells: raw::number(&raw.free_cell_count),
        }
    }

    fn body(items: Vec<AcsStatus>) -> ResponseBody {
        ResponseBody::Acs(items)
    }
}
