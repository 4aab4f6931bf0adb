//! MOUNT and DISMOUNT.

use acsapi::{DriveId, MessageOptions, ResponseBody, Status};
use tracing::debug;
use xapi_xml::{Document, ElementId, FieldDescriptor, FillPolicy, XmlError};

use crate::handler::{
    drive_location_id, run_action, validate_count, ActionHandler, HandlerContext, ResponseSink,
};
use crate::names::*;
use crate::qdrv::reported_drive;
use crate::raw::{self, raw_record};

raw_record! {
    /// The `<mount_data>` or `<dismount_data>` fragment.
    pub struct RawMount, field RawMountField {
        Volser => volser: 6,
        DeviceAddress => device_address: 4,
        DriveName => drive_name: 4,
        LocationId => location_id: 16,
        Acs => acs: 2,
        Lsm => lsm: 2,
        Panel => panel: 2,
        Drive => drive: 2,
    }
}

const fn fields(parent: &'static str) -> [FieldDescriptor<RawMountField>; 8] {
    [
        FieldDescriptor::new(parent, VOLSER, RawMountField::Volser, FillPolicy::Blank),
        FieldDescriptor::new(parent, DEVICE_ADDRESS, RawMountField::DeviceAddress, FillPolicy::Blank),
        FieldDescriptor::new(parent, DRIVE_NAME, RawMountField::DriveName, FillPolicy::None),
        FieldDescriptor::new(parent, DRIVE_LOCATION_ID, RawMountField::LocationId, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, ACS, RawMountField::Acs, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, LSM, RawMountField::Lsm, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, PANEL, RawMountField::Panel, FillPolicy::None),
        FieldDescriptor::new(DRIVE_LIBRARY_ADDRESS, DRIVE_NUMBER, RawMountField::Drive, FillPolicy::None),
    ]
}

const MOUNT_FIELDS: [FieldDescriptor<RawMountField>; 8] = fields(MOUNT_DATA);
const DISMOUNT_FIELDS: [FieldDescriptor<RawMountField>; 8] = fields(DISMOUNT_DATA);

/// Volume and drive the server reports, defaulting to what was asked for.
fn outcome(raw: &RawMount, drive: DriveId) -> (String, DriveId) {
    let volume = if raw::present(&raw.volser) {
        raw::text(&raw.volser)
    } else {
        content::UNKNOWN_VOLSER.to_string()
    };
    let drive_id =
        reported_drive(&raw.acs, &raw.lsm, &raw.panel, &raw.drive, Some(drive)).unwrap_or(drive);
    (volume, drive_id)
}

fn add_target(
    doc: &mut Document,
    element: ElementId,
    volume: &str,
    flag: Option<&str>,
    drive: DriveId,
) -> Result<(), XmlError> {
    doc.add_element(Some(element), VOLSER, Some(volume.trim()))?;
    if let Some(flag) = flag {
        doc.add_element(Some(element), flag, Some(content::YES))?;
    }
    doc.add_element(Some(element), DRIVE_LOCATION_ID, Some(&drive_location_id(drive)))?;
    Ok(())
}

/// Mount `volume` on `drive`; READONLY asks for a write protected mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub volume: String,
    pub drive: DriveId,
}

impl ActionHandler for Mount {
    type Raw = RawMount;

    const ELEMENT: &'static str = MOUNT;
    const FRAGMENT: &'static str = MOUNT_DATA;
    const FIELDS: &'static [FieldDescriptor<RawMountField>] = &MOUNT_FIELDS;

    fn build(
        &self,
        doc: &mut Document,
        element: ElementId,
        options: MessageOptions,
    ) -> Result<(), XmlError> {
        let read_only = options.contains(MessageOptions::READONLY).then_some(READ_ONLY);
        add_target(doc, element, &self.volume, read_only, self.drive)
    }

    fn body(&self, raw: &RawMount) -> ResponseBody {
        let (volume, drive_id) = outcome(raw, self.drive);
        ResponseBody::Mount { volume, drive_id }
    }
}

/// Dismount `volume` from `drive`; FORCE unloads even if the volume differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dismount {
    pub volume: String,
    pub drive: DriveId,
}

impl ActionHandler for Dismount {
    type Raw = RawMount;

    const ELEMENT: &'static str = DISMOUNT;
    const FRAGMENT: &'static str = DISMOUNT_DATA;
    const FIELDS: &'static [FieldDescriptor<RawMountField>] = &DISMOUNT_FIELDS;

    fn build(
        &self,
        doc: &mut Document,
        element: ElementId,
        options: MessageOptions,
    ) -> Result<(), XmlError> {
        let force = options.contains(MessageOptions::FORCE).then_some(REWIND_UNLOAD);
        add_target(doc, element, &self.volume, force, self.drive)
    }

    fn body(&self, raw: &RawMount) -> ResponseBody {
        let (volume, drive_id) = outcome(raw, self.drive);
        ResponseBody::Dismount { volume, drive_id }
    }
}

/// MOUNT: exactly one drive per request.
pub async fn mount(
    ctx: &HandlerContext<'_>,
    volume: &str,
    drives: &[DriveId],
    options: MessageOptions,
    sink: &mut dyn ResponseSink,
) -> Result<(), Status> {
    validate_count(drives.len(), 1, 1)?;
    let action = Mount {
        volume: volume.to_string(),
        drive: drives[0],
    };
    debug!(seq = ctx.sequence(), volume, drive = %drive_location_id(action.drive), "mount");
    run_action(ctx, &action, options, sink).await
}

pub async fn dismount(
    ctx: &HandlerContext<'_>,
    volume: &str,
    drive: DriveId,
    options: MessageOptions,
    sink: &mut dyn ResponseSink,
) -> Result<(), Status> {
    let action = Dismount {
        volume: volume.to_string(),
        drive,
    };
    debug!(seq = ctx.sequence(), volume, drive = %drive_location_id(drive), "dismount");
    run_action(ctx, &action, options, sink).await
}
