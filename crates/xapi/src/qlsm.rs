//! QUERY LSM.

use acsapi::{LsmId, LsmStatus, ResponseBody, State, Status};
use xapi_xml::{Document, ElementId, FieldDescriptor, FillPolicy, XmlError};

use crate::handler::{add_id_entries, two_digits, QueryHandler};
use crate::lookup::LookupTables;
use crate::names::*;
use crate::raw::{self, raw_record};

raw_record! {
    /// One `<lsm_data>` fragment.
    pub struct RawLsm, field RawLsmField {
        Acs => acs: 2,
        Lsm => lsm: 2,
        Model => model: 8,
        Status => status: 16,
        State => state: 9,
        Mode => mode: 20,
        CellCount => cell_count: 4,
        FreeCellCount => free_cell_count: 8,
        ScratchCount => scratch_count: 7,
        CleanerCount => cleaner_count: 4,
        AdjacentCount => adjacent_count: 3,
        CapCount => cap_count: 3,
        PanelCount => panel_count: 3,
        Result => result: 8,
        Error => error: 8,
        Reason => reason: 124,
    }
}

pub struct QueryLsm;

impl QueryHandler for QueryLsm {
    type Id = LsmId;
    type Raw = RawLsm;
    type Item = LsmStatus;

    const ELEMENT: &'static str = QUERY_LSM;
    const FRAGMENT: &'static str = LSM_DATA;
    const FIELDS: &'static [FieldDescriptor<RawLsmField>] = &[
        FieldDescriptor::new(LSM_DATA, MODEL, RawLsmField::Model, FillPolicy::None),
        FieldDescriptor::new(LSM_DATA, STATUS, RawLsmField::Status, FillPolicy::None),
        FieldDescriptor::new(LSM_DATA, STATE, RawLsmField::State, FillPolicy::None),
        FieldDescriptor::new(LSM_DATA, MODE, RawLsmField::Mode, FillPolicy::None),
        FieldDescriptor::new(LSM_DATA, CELL_COUNT, RawLsmField::CellCount, FillPolicy::Zero),
        FieldDescriptor::new(LSM_DATA, FREE_CELL_COUNT, RawLsmField::FreeCellCount, FillPolicy::Zero),
        FieldDescriptor::new(LSM_DATA, SCRATCH_COUNT, RawLsmField::ScratchCount, FillPolicy::Zero),
        FieldDescriptor::new(LSM_DATA, CLEANER_COUNT, RawLsmField::CleanerCount, FillPolicy::Zero),
        FieldDescriptor::new(LSM_DATA, ADJACENT_COUNT, RawLsmField::AdjacentCount, FillPolicy::Zero),
        FieldDescriptor::new(LSM_DATA, CAP_COUNT, RawLsmField::CapCount, FillPolicy::Zero),
        FieldDescriptor::new(LSM_DATA, PANEL_COUNT, RawLsmField::PanelCount, FillPolicy::Zero),
        FieldDescriptor::new(LSM_DATA, RESULT, RawLsmField::Result, FillPolicy::None),
        FieldDescriptor::new(LSM_DATA, ERROR, RawLsmField::Error, FillPolicy::None),
        FieldDescriptor::new(LSM_DATA, REASON, RawLsmField::Reason, FillPolicy::None),
        FieldDescriptor::new(LSM_LOCATION_DATA, ACS, RawLsmField::Acs, FillPolicy::None),
        FieldDescriptor::new(LSM_LOCATION_DATA, LSM, RawLsmField::Lsm, FillPolicy::None),
    ];

    fn build(doc: &mut Document, element: ElementId, ids: &[LsmId]) -> Result<(), XmlError> {
        doc.add_element(Some(element), DETAIL_REQUEST, Some(crate::names::content::NO))?;
        add_id_entries(doc, element, LSM_LIST, ids, |doc, parent, id| {
            let location = doc.add_element(Some(parent), LSM_LOCATION_DATA, None)?;
            doc.add_element(Some(location), ACS, Some(&two_digits(id.acs)))?;
            doc.add_element(Some(location), LSM, Some(&two_digits(id.lsm)))?;
            Ok(())
        })
    }

    fn map(raw: &RawLsm, requested: Option<LsmId>, _tables: &LookupTables) -> LsmStatus {
        let mut lsm_id = LsmId::default();
        if raw::present(&raw.acs) {
            lsm_id.acs = raw::number(&raw.acs) as u16;
            if raw::present(&raw.lsm) {
                lsm_id.lsm = raw::number(&raw.lsm) as u16;
            }
        } else if let Some(requested) = requested {
            lsm_id = requested;
        }
        if raw.result[0] == b'F' {
            return LsmStatus {
                lsm_id,
                status: Status::LsmNotInLibrary,
                state: State::Unknown(0),
                freecells: 0,
            };
        }
        LsmStatus {
            lsm_id,
            status: Status::Success,
            state: if raw::starts_with(&raw.state, "ONL") {
                State::Online
            } else {
                State::Offline
            },
            freecells: raw::number(&raw.free_cell_count),
        }
    }

    fn body(items: Vec<LsmStatus>) -> ResponseBody {
        ResponseBody::Lsms(items)
    }
}
