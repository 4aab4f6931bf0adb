//! QUERY CAP.

use acsapi::{CapId, CapMode, CapStatus, ResponseBody, State, Status};
use xapi_xml::{Document, ElementId, FieldDescriptor, FillPolicy, XmlError};

use crate::handler::{add_id_entries, two_digits, QueryHandler};
use crate::lookup::LookupTables;
use crate::names::*;
use crate::raw::{self, raw_record};

raw_record! {
    /// One `<cap_data>` fragment.
    pub struct RawCap, field RawCapField {
        Acs => acs: 2,
        Lsm => lsm: 2,
        Cap => cap: 2,
        HostName => host_name: 8,
        CellCount => cell_count: 4,
        Priority => priority: 1,
        Mode => mode: 20,
        Status => status: 16,
        State => state: 9,
        PartId => part_id: 8,
        RowCount => row_count: 4,
        ColumnCount => column_count: 4,
        MagazineCount => magazine_count: 4,
        CellsPerMagazine => cells_per_magazine: 4,
        CapType => cap_type: 16,
        JobnameOwner => jobname_owner: 8,
        Result => result: 8,
        Error => error: 8,
        Reason => reason: 124,
    }
}

pub struct QueryCap;

impl QueryHandler for QueryCap {
    type Id = CapId;
    type Raw = RawCap;
    type Item = CapStatus;

    const ELEMENT: &'static str = QUERY_CAP;
    const FRAGMENT: &'static str = CAP_DATA;
    const FIELDS: &'static [FieldDescriptor<RawCapField>] = &[
        FieldDescriptor::new(CAP_DATA, HOST_NAME, RawCapField::HostName, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, CELL_COUNT, RawCapField::CellCount, FillPolicy::Zero),
        FieldDescriptor::new(CAP_DATA, MODE, RawCapField::Mode, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, STATUS, RawCapField::Status, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, STATE, RawCapField::State, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, PRIORITY, RawCapField::Priority, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, PART_ID, RawCapField::PartId, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, ROW_COUNT, RawCapField::RowCount, FillPolicy::Zero),
        FieldDescriptor::new(CAP_DATA, COLUMN_COUNT, RawCapField::ColumnCount, FillPolicy::Zero),
        FieldDescriptor::new(CAP_DATA, MAGAZINE_COUNT, RawCapField::MagazineCount, FillPolicy::Zero),
        FieldDescriptor::new(
            CAP_DATA,
            CELLS_PER_MAGAZINE,
            RawCapField::CellsPerMagazine,
            FillPolicy::Zero,
        ),
        FieldDescriptor::new(CAP_DATA, CAP_TYPE, RawCapField::CapType, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, CAP_JOBNAME_OWNER, RawCapField::JobnameOwner, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, RESULT, RawCapField::Result, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, ERROR, RawCapField::Error, FillPolicy::None),
        FieldDescriptor::new(CAP_DATA, REASON, RawCapField::Reason, FillPolicy::None),
        FieldDescriptor::new(CAP_LOCATION_DATA, ACS, RawCapField::Acs, FillPolicy::None),
        FieldDescriptor::new(CAP_LOCATION_DATA, LSM, RawCapField::Lsm, FillPolicy::None),
        FieldDescriptor::new(CAP_LOCATION_DATA, CAP, RawCapField::Cap, FillPolicy::None),
    ];

    fn build(doc: &mut Document, element: ElementId, ids: &[CapId]) -> Result<(), XmlError> {
        add_id_entries(doc, element, CAP_LIST, ids, |doc, parent, id| {
            let location = doc.add_element(Some(parent), CAP_LOCATION_DATA, None)?;
            doc.add_element(Some(location), ACS, Some(&two_digits(id.acs)))?;
            doc.add_element(Some(location), LSM, Some(&two_digits(id.lsm)))?;
            doc.add_element(Some(location), CAP, Some(&two_digits(id.cap)))?;
            Ok(())
        })
    }

    fn map(raw: &RawCap, requested: Option<CapId>, _tables: &LookupTables) -> CapStatus {
        let mut cap_id = CapId::default();
        if raw::present(&raw.acs) {
            cap_id.acs = raw::number(&raw.acs) as u16;
            if raw::present(&raw.lsm) {
                cap_id.lsm = raw::number(&raw.lsm) as u16;
                if raw::present(&raw.cap) {
                    cap_id.cap = raw::number(&raw.cap) as u16;
                }
            }
        } else if let Some(requested) = requested {
            cap_id = requested;
        }

        if raw.result[0] == b'F' {
            return CapStatus {
                cap_id,
                status: Status::CapNotInLibrary,
                priority: 0,
                size: 0,
                state: State::Unknown(0),
                mode: CapMode::Unknown(0),
            };
        }
        CapStatus {
            cap_id,
            status: Status::Success,
            priority: raw::number(&raw.priority) as u8,
            size: raw::number(&raw.cell_count) as u16,
            state: if raw::starts_with(&raw.state, "ONL") {
                State::Online
            } else {
                State::Offline
            },
            mode: if raw::starts_with(&raw.mode, "MAN") {
                CapMode::Manual
            } else {
                CapMode::Automatic
            },
        }
    }

    fn body(items: Vec<CapStatus>) -> ResponseBody {
        ResponseBody::Caps(items)
    }
}
