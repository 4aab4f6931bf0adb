//! QUERY DRIVE.

use acsapi::{DriveId, DriveStatus, ResponseBody, State, Status};
use xapi_xml::{Document, ElementId, FieldDescriptor, FillPolicy, XmlError};

use crate::handler::{add_id_entries, drive_location_id, QueryHandler};
use crate::lookup::LookupTables;
use crate::names::*;
use crate::raw::{self, raw_record};

raw_record! {
    /// One `<drive_info>` fragment.
    pub struct RawDrive, field RawDriveField {
        Volser => volser: 6,
        DriveName => drive_name: 4,
        LocationId => location_id: 16,
        Model => model: 8,
        Rectech => rectech: 8,
        VtssName => vtss_name: 8,
        SerialNumber => serial_number: 12,
        Status => status: 16,
        State => state: 16,
        Acs => acs: 2,
        Lsm => lsm: 2,
        Panel => panel: 2,
        Drive => drive: 2,
        Result => result: 8,
        Error => error: 8,
        Reason => reason: 124,
    }
}

/// Drive address from `<drive_library_address>`, falling back to the id
/// the request named when the reply omits it.
pub(crate) fn reported_drive(
    acs: &[u8],
    lsm: &[u8],
    panel: &[u8],
    drive: &[u8],
    requested: Option<DriveId>,
) -> Option<DriveId> {
    if !raw::present(acs) {
        return requested;
    }
    Some(DriveId::new(
        raw::number(acs) as u16,
        raw::number(lsm) as u16,
        raw::number(panel) as u16,
        raw::number(drive) as u16,
    ))
}

pub struct QueryDrive;

impl QueryHandler for QueryDrive {
    type Id = DriveId;
    type Raw = RawDrive;
    type Item = DriveStatus;

    const ELEMENT: &'static str = QUERY_DRIVE_INFO;
    const FRAGMENT: &'static str = DRIVE_INFO;
    const FIELDS: &'static [FieldDescriptor<RawDriveField>] = &[
        FieldDescriptor::new(DRIVE_INFO, VOLSER, RawDriveField::Volser, FillPolicy::Blank),
        FieldDescriptor::new(DRIVE_INFO, DRIVE_NAME, RawDriveField::DriveName, FillPolicy::None),
        FieldDescriptor::new(DRIVE_INFO, DRIVE_LOCATION_ID, RawDriveField::LocationId, FillPolicy::None),
        FieldDescriptor::new(DRIVE_INFO, MODEL, RawDriveField::Model, FillPolicy::Blank),
        FieldDescriptor::new(DRIVE_INFO, RECTECH, RawDriveField::Rectech, FillPolicy::Blank),
        FieldDescriptor::new(DRIVE_INFO, VTSS_NAME, RawDriveField::VtssName, FillPolicy::Blank),
        FieldDescriptor::new(DRIVE_INFO, SERIAL_NUMBER, RawDriveField::SerialNumber, FillPolicy::None),
        FieldDescriptor::new(DRIVE_INFO, STATUS, RawDriveField::Status, FillPolicy::Blank),
        FieldDescriptor::new(DRIVE_INFO, STATE, RawDriveField::State, FillPolicy::Blank),
        FieldDescriptor::new(DRIVE_INFO, RESULT, RawDriveField::Result, FillPolicy::None),
        FieldDescriptor::new(DRIVE_INFO, ERROR, RawDriveField::Error, FillPolicy::None),
        FieldDescriptor::new(DRIVE_INFO, REASON, RawDriveField::Reason, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, ACS, RawDriveField::Acs, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, LSM, RawDriveField::Lsm, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, PANEL, RawDriveField::Panel, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, DRIVE_NUMBER, RawDriveField::Drive, FillPolicy::None),
    ];
    const MIN_COUNT: usize = 1;

    fn build(doc: &mut Document, element: ElementId, ids: &[DriveId]) -> Result<(), XmlError> {
        add_id_entries(doc, element, DRIVE_LIST, ids, |doc, parent, id| {
            doc.add_element(Some(parent), DRIVE_LOCATION_ID, Some(&drive_location_id(*id)))
                .map(|_| ())
        })
    }

    fn map(raw: &RawDrive, requested: Option<DriveId>, tables: &LookupTables) -> DriveStatus {
        let drive_id = reported_drive(&raw.acs, &raw.lsm, &raw.panel, &raw.drive, requested)
            .unwrap_or_default();
        if raw.result[0] == b'F' {
            return DriveStatus {
                drive_id,
                status: Status::DriveNotInLibrary,
                state: State::Unknown(0),
                volume: None,
                drive_type: 0,
            };
        }

        let volume = raw::present(&raw.volser).then(|| raw::text(&raw.volser));
        let in_use = volume.is_some()
            || raw::starts_with(&raw.status, "MOU")
            || raw::starts_with(&raw.status, "ON ");
        DriveStatus {
            drive_id,
            status: if in_use {
                Status::DriveInUse
            } else {
                Status::DriveAvailable
            },
            state: if raw::starts_with(&raw.state, "OFF") {
                State::Offline
            } else {
                State::Online
            },
            volume,
            // Unknown models report type 0.
            drive_type: tables
                .drive_type_code(&raw::text(&raw.model))
                .unwrap_or_default(),
        }
    }

    fn body(items: Vec<DriveStatus>) -> ResponseBody {
        ResponseBody::Drives(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::DriveType;
    use xapi_xml::{move_children_to_fields, parse, serialize};

    fn tables() -> LookupTables {
        LookupTables::new(
            vec![
                DriveType { code: 1, name: "T9840D".into() },
                DriveType { code: 2, name: "T10000D".into() },
            ],
            vec![],
            vec![],
        )
    }

    fn item(fragment: &str, requested: Option<DriveId>) -> DriveStatus {
        let doc = parse(format!("<libreply>{fragment}</libreply>").as_bytes()).expect("parse");
        let info = doc.find_first_by_name(None, DRIVE_INFO).expect("drive_info");
        let mut raw = RawDrive::default();
        move_children_to_fields(&doc, info, QueryDrive::FIELDS, &mut raw);
        QueryDrive::map(&raw, requested, &tables())
    }

    #[test]
    fn drives_are_addressed_by_location_id() {
        let mut doc = Document::new();
        let element = doc.add_element(None, QUERY_DRIVE_INFO, None).expect("root");
        QueryDrive::build(&mut doc, element, &[DriveId::new(0, 0, 10, 3)]).expect("build");
        assert_eq!(
            &serialize(&doc)[..],
            &b"<query_drive_info><drive_location_id>R:00:00:10:03</drive_location_id>\
               </query_drive_info>"[..]
        );

        let mut doc = Document::new();
        let element = doc.add_element(None, QUERY_DRIVE_INFO, None).expect("root");
        QueryDrive::build(&mut doc, element, &[DriveId::default(), DriveId::new(1, 0, 2, 0)])
            .expect("build");
        let list = doc.children(element)[0];
        assert_eq!(doc.name(list), Some(DRIVE_LIST));
        assert_eq!(doc.children(list).len(), 2);
    }

    #[test]
    fn mounted_drive_is_in_use_with_known_type() {
        let drive = item(
            "<drive_info><volser>EVT001</volser><model>T10000D</model><status>MOUNTED</status>\
             <state>ONLINE</state><drive_library_address><acs>01</acs><lsm>02</lsm>\
             <panel>10</panel><drive_number>03</drive_number></drive_library_address>\
             <result>SUCCESS</result></drive_info>",
            None,
        );
        assert_eq!(drive.drive_id, DriveId::new(1, 2, 10, 3));
        assert_eq!(drive.status, Status::DriveInUse);
        assert_eq!(drive.state, State::Online);
        assert_eq!(drive.volume.as_deref(), Some("EVT001"));
        assert_eq!(drive.drive_type, 2);
    }

    #[test]
    fn idle_offline_drive_is_available() {
        let requested = DriveId::new(0, 0, 1, 1);
        let drive = item(
            "<drive_info><model>LTO9</model><status>READY</status><state>OFFLINE</state>\
             <result>SUCCESS</result></drive_info>",
            Some(requested),
        );
        assert_eq!(drive.drive_id, requested);
        assert_eq!(drive.status, Status::DriveAvailable);
        assert_eq!(drive.state, State::Offline);
        assert_eq!(drive.volume, None);
        assert_eq!(drive.drive_type, 0);

        let drive = item("<drive_info><status>ON</status></drive_info>", Some(requested));
        assert_eq!(drive.status, Status::DriveInUse);
    }

    #[test]
    fn failure_reports_drive_not_in_library() {
        let requested = DriveId::new(9, 0, 0, 0);
        let drive = item(
            "<drive_info><result>FAILURE</result><reason>Drive not found</reason></drive_info>",
            Some(requested),
        );
        assert_eq!(drive.drive_id, requested);
        assert_eq!(drive.status, Status::DriveNotInLibrary);
    }
}
