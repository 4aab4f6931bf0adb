//! QUERY VOLUME.

use acsapi::{ResponseBody, Status, VolumeStatus};
use xapi_xml::{Document, ElementId, FieldDescriptor, FillPolicy, XmlError};

use crate::handler::QueryHandler;
use crate::lookup::LookupTables;
use crate::names::*;
use crate::qdrv::reported_drive;
use crate::raw::{self, raw_record};

raw_record! {
    /// One `<volume_data>` fragment.
    pub struct RawVolume, field RawVolumeField {
        Volser => volser: 6,
        Status => status: 16,
        Media => media: 8,
        MediaType => media_type: 8,
        HomeCell => home_cell: 14,
        DeviceAddress => device_address: 4,
        Acs => acs: 2,
        Lsm => lsm: 2,
        Panel => panel: 2,
        Drive => drive: 2,
        Result => result: 8,
        Error => error: 8,
        Reason => reason: 124,
    }
}

pub struct QueryVolume;

impl QueryHandler for QueryVolume {
    type Id = String;
    type Raw = RawVolume;
    type Item = VolumeStatus;

    const ELEMENT: &'static str = QUERY_VOLUME_INFO;
    const FRAGMENT: &'static str = VOLUME_DATA;
    const FIELDS: &'static [FieldDescriptor<RawVolumeField>] = &[
        FieldDescriptor::new(VOLUME_DATA, VOLSER, RawVolumeField::Volser, FillPolicy::Blank),
        FieldDescriptor::new(VOLUME_DATA, STATUS, RawVolumeField::Status, FillPolicy::Blank),
        FieldDescriptor::new(VOLUME_DATA, MEDIA, RawVolumeField::Media, FillPolicy::Blank),
        FieldDescriptor::new(VOLUME_DATA, MEDIA_TYPE, RawVolumeField::MediaType, FillPolicy::Blank),
        FieldDescriptor::new(VOLUME_DATA, HOME_CELL, RawVolumeField::HomeCell, FillPolicy::Blank),
        FieldDescriptor::new(
            VOLUME_DATA,
            DEVICE_ADDRESS,
            RawVolumeField::DeviceAddress,
            FillPolicy::Blank,
        ),
        FieldDescriptor::new(VOLUME_DATA, RESULT, RawVolumeField::Result, FillPolicy::None),
        FieldDescriptor::new(VOLUME_DATA, ERROR, RawVolumeField::Error, FillPolicy::None),
        FieldDescriptor::new(VOLUME_DATA, REASON, RawVolumeField::Reason, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, ACS, RawVolumeField::Acs, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, LSM, RawVolumeField::Lsm, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, PANEL, RawVolumeField::Panel, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, DRIVE_NUMBER, RawVolumeField::Drive, FillPolicy::None),
    ];
    const MIN_COUNT: usize = 1;

    fn build(doc: &mut Document, element: ElementId, ids: &[String]) -> Result<(), XmlError> {
        let list = doc.add_element(Some(element), VOLUME_LIST, None)?;
        for volser in ids {
            doc.add_element(Some(list), VOLSER, Some(volser.trim()))?;
        }
        Ok(())
    }

    /// Location follows the reply: virtual media and volumes with a home
    /// cell are home, a mounted status or a device address puts the volume
    /// in a drive, anything else is in transit.
    fn map(raw: &RawVolume, requested: Option<String>, tables: &LookupTables) -> VolumeStatus {
        let volume = if raw::present(&raw.volser) {
            raw::text(&raw.volser)
        } else {
            requested.unwrap_or_else(|| content::UNKNOWN_VOLSER.to_string())
        };
        if raw.result[0] == b'F' {
            return VolumeStatus {
                volume,
                status: Status::VolumeNotInLibrary,
                media_type: 0,
                drive_id: None,
            };
        }

        let media_type = tables
            .media_type_code(&raw::text(&raw.media))
            .unwrap_or_default();
        let mounted = raw::starts_with(&raw.status, "M") || raw::present(&raw.device_address);
        let (status, drive_id) = if raw::starts_with(&raw.media, content::VIRTUAL) {
            (Status::VolumeHome, None)
        } else if mounted {
            let drive = reported_drive(&raw.acs, &raw.lsm, &raw.panel, &raw.drive, None);
            (Status::VolumeInDrive, drive)
        } else if raw::starts_with(&raw.status, "E") || raw::present(&raw.home_cell) {
            (Status::VolumeHome, None)
        } else {
            (Status::VolumeInTransit, None)
        };
        VolumeStatus {
            volume,
            status,
            media_type,
            drive_id,
        }
    }

    fn body(items: Vec<VolumeStatus>) -> ResponseBody {
        ResponseBody::Volumes(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MediaType;
    use acsapi::DriveId;
    use xapi_xml::{move_children_to_fields, parse, serialize};

    fn item(fragment: &str, requested: Option<&str>) -> VolumeStatus {
        let doc = parse(format!("<libreply>{fragment}</libreply>").as_bytes()).expect("parse");
        let data = doc.find_first_by_name(None, VOLUME_DATA).expect("volume_data");
        let mut raw = RawVolume::default();
        move_children_to_fields(&doc, data, QueryVolume::FIELDS, &mut raw);
        let tables = LookupTables::new(
            vec![],
            vec![MediaType { code: 7, name: "T10000T2".into() }],
            vec![],
        );
        QueryVolume::map(&raw, requested.map(str::to_string), &tables)
    }

    #[test]
    fn volumes_are_always_listed() {
        let mut doc = Document::new();
        let element = doc.add_element(None, QUERY_VOLUME_INFO, None).expect("root");
        QueryVolume::build(&mut doc, element, &["ABC123".to_string()]).expect("build");
        assert_eq!(
            &serialize(&doc)[..],
            &b"<query_volume_info><volume_list><volser>ABC123</volser></volume_list>\
               </query_volume_info>"[..]
        );
    }

    #[test]
    fn home_volume_resolves_media_type() {
        let volume = item(
            "<volume_data><volser>ABC123</volser><status>HOME</status><media>T10000T2</media>\
             <home_cell>00:00:10:02:05</home_cell><result>SUCCESS</result></volume_data>",
            None,
        );
        assert_eq!(volume.volume, "ABC123");
        assert_eq!(volume.status, Status::VolumeHome);
        assert_eq!(volume.media_type, 7);
        assert_eq!(volume.drive_id, None);
    }

    #[test]
    fn mounted_volume_reports_its_drive() {
        let volume = item(
            "<volume_data><volser>ABC124</volser><status>MOUNTED</status><media>LTO8</media>\
             <device_address>0A40</device_address><mount_data><drive_library_address>\
             <acs>00</acs><lsm>01</lsm><panel>10</panel><drive_number>02</drive_number>\
             </drive_library_address></mount_data><result>SUCCESS</result></volume_data>",
            None,
        );
        assert_eq!(volume.status, Status::VolumeInDrive);
        assert_eq!(volume.drive_id, Some(DriveId::new(0, 1, 10, 2)));
        assert_eq!(volume.media_type, 0);
    }

    #[test]
    fn virtual_and_unplaced_volumes() {
        let volume = item(
            "<volume_data><volser>VTV001</volser><status>MOUNTED</status><media>VIRTUAL</media>\
             </volume_data>",
            None,
        );
        assert_eq!(volume.status, Status::VolumeHome);

        let volume = item("<volume_data><status>SELECTED</status></volume_data>", Some("XYZ999"));
        assert_eq!(volume.volume, "XYZ999");
        assert_eq!(volume.status, Status::VolumeInTransit);
    }

    #[test]
    fn failure_is_not_in_library() {
        let volume = item("<volume_data><result>FAILURE</result></volume_data>", None);
        assert_eq!(volume.volume, "??????");
        assert_eq!(volume.status, Status::VolumeNotInLibrary);
    }
}
