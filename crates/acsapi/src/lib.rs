#![cfg_attr(docsrs, feature(doc_cfg))]
//! ACSAPI vocabulary: status and state codes, command codes, option flags, and
//! typed request/response packets exchanged with the gateway's upstream caller.

use core::fmt;

use bitflags::bitflags;

pub mod request;
pub mod response;

pub use request::{CapId, DriveId, LsmId, QueryCriteria, Request, RequestBody, RequestHeader};
pub use response::{
    AcsStatus, CapStatus, DriveStatus, LsmStatus, PoolStatus, ResponseBody, ResponseKind,
    ResponsePacket, ServerStatus, VolumeStatus,
};

/// Maximum number of identifiers carried by one request or response packet.
pub const MAX_ID: usize = 42;

bitflags! {
    /// Message level options carried in every ACSAPI request header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MessageOptions: u8 {
        const FORCE = 0x01;
        const INTERMEDIATE = 0x02;
        const ACKNOWLEDGE = 0x04;
        const READONLY = 0x08;
        const BYPASS = 0x10;
        /// The request carries an [`ExtendedOptions`] word.
        const EXTENDED = 0x20;
    }
}

bitflags! {
    /// Extended options, only meaningful when [`MessageOptions::EXTENDED`] is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExtendedOptions: u32 {
        const WAIT = 0x01;
        const RESET = 0x02;
        const VIRTUAL = 0x04;
        const CONTINUOUS = 0x08;
        const RANGE = 0x10;
    }
}

/// Status codes reported to ACSAPI clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Status {
    Success,
    AcsNotInLibrary,
    Cancelled,
    CountTooSmall,
    CountTooLarge,
    DriveAvailable,
    DriveInUse,
    DriveNotInLibrary,
    DriveOffline,
    IdlePending,
    InvalidCommand,
    InvalidType,
    InvalidValue,
    InvalidDrive,
    LsmNotInLibrary,
    MessageNotFound,
    MisplacedTape,
    ProcessFailure,
    VolumeHome,
    VolumeInDrive,
    VolumeInTransit,
    VolumeNotInDrive,
    VolumeNotInLibrary,
    VolumeInUse,
    VolumeAvailable,
    UnsupportedOption,
    /// Network interface failure between the gateway and the library server.
    NiFailure,
    NiTimedOut,
    /// The request addressed by a CANCEL already completed.
    Complete,
    PoolNotFound,
    LockIdNotFound,
    CapNotInLibrary,
    UnsupportedCommand,
    Idle,
    /// A bounded network wait expired.
    NiTimeout,
    NoDrivesFound,
    MalformedXml,
    IncompatibleServer,
    MaxRequestsExceeded,
    /// A status code not known to this implementation.
    Other(u16),
}

impl Status {
    /// Convert from the raw status field of a packet.
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Status::Success,
            2 => Status::AcsNotInLibrary,
            9 => Status::Cancelled,
            20 => Status::CountTooSmall,
            21 => Status::CountTooLarge,
            28 => Status::DriveAvailable,
            29 => Status::DriveInUse,
            30 => Status::DriveNotInLibrary,
            31 => Status::DriveOffline,
            37 => Status::IdlePending,
            41 => Status::InvalidCommand,
            42 => Status::InvalidDrive,
            51 => Status::InvalidType,
            52 => Status::InvalidValue,
            60 => Status::LsmNotInLibrary,
            62 => Status::MessageNotFound,
            65 => Status::MisplacedTape,
            74 => Status::ProcessFailure,
            90 => Status::VolumeHome,
            91 => Status::VolumeInDrive,
            92 => Status::VolumeInTransit,
            93 => Status::VolumeNotInDrive,
            94 => Status::VolumeNotInLibrary,
            96 => Status::UnsupportedOption,
            99 => Status::VolumeInUse,
            104 => Status::NiFailure,
            105 => Status::NiTimedOut,
            107 => Status::Complete,
            118 => Status::PoolNotFound,
            128 => Status::VolumeAvailable,
            133 => Status::LockIdNotFound,
            141 => Status::CapNotInLibrary,
            152 => Status::UnsupportedCommand,
            166 => Status::Idle,
            204 => Status::NiTimeout,
            218 => Status::NoDrivesFound,
            223 => Status::MalformedXml,
            227 => Status::IncompatibleServer,
            228 => Status::MaxRequestsExceeded,
            other => Status::Other(other),
        }
    }

    /// Convert to the raw value stored in the packet.
    pub const fn to_raw(self) -> u16 {
        match self {
            Status::Success => 0,
            Status::AcsNotInLibrary => 2,
            Status::Cancelled => 9,
            Status::CountTooSmall => 20,
            Status::CountTooLarge => 21,
            Status::DriveAvailable => 28,
            Status::DriveInUse => 29,
            Status::DriveNotInLibrary => 30,
            Status::DriveOffline => 31,
            Status::IdlePending => 37,
            Status::InvalidCommand => 41,
            Status::InvalidType => 51,
            Status::InvalidValue => 52,
            Status::InvalidDrive => 42,
            Status::LsmNotInLibrary => 60,
            Status::MessageNotFound => 62,
            Status::MisplacedTape => 65,
            Status::ProcessFailure => 74,
            Status::VolumeHome => 90,
            Status::VolumeInDrive => 91,
            Status::VolumeInTransit => 92,
            Status::VolumeNotInDrive => 93,
            Status::VolumeNotInLibrary => 94,
            Status::VolumeInUse => 99,
            Status::VolumeAvailable => 128,
            Status::UnsupportedOption => 96,
            Status::NiFailure => 104,
            Status::NiTimedOut => 105,
            Status::Complete => 107,
            Status::PoolNotFound => 118,
            Status::LockIdNotFound => 133,
            Status::CapNotInLibrary => 141,
            Status::UnsupportedCommand => 152,
            Status::Idle => 166,
            Status::NiTimeout => 204,
            Status::NoDrivesFound => 218,
            Status::MalformedXml => 223,
            Status::IncompatibleServer => 227,
            Status::MaxRequestsExceeded => 228,
            Status::Other(code) => code,
        }
    }

    /// Conventional upper-case name, e.g. `STATUS_CAP_NOT_IN_LIBRARY`.
    pub const fn name(self) -> &'static str {
        match self {
            Status::Success => "STATUS_SUCCESS",
            Status::AcsNotInLibrary => "STATUS_ACS_NOT_IN_LIBRARY",
            Status::Cancelled => "STATUS_CANCELLED",
            Status::CountTooSmall => "STATUS_COUNT_TOO_SMALL",
            Status::CountTooLarge => "STATUS_COUNT_TOO_LARGE",
            Status::DriveAvailable => "STATUS_DRIVE_AVAILABLE",
            Status::DriveInUse => "STATUS_DRIVE_IN_USE",
            Status::DriveNotInLibrary => "STATUS_DRIVE_NOT_IN_LIBRARY",
            Status::DriveOffline => "STATUS_DRIVE_OFFLINE",
            Status::IdlePending => "STATUS_IDLE_PENDING",
            Status::InvalidCommand => "STATUS_INVALID_COMMAND",
            Status::InvalidType => "STATUS_INVALID_TYPE",
            Status::InvalidValue => "STATUS_INVALID_VALUE",
            Status::InvalidDrive => "STATUS_INVALID_DRIVE",
            Status::LsmNotInLibrary => "STATUS_LSM_NOT_IN_LIBRARY",
            Status::MessageNotFound => "STATUS_MESSAGE_NOT_FOUND",
            Status::MisplacedTape => "STATUS_MISPLACED_TAPE",
            Status::ProcessFailure => "STATUS_PROCESS_FAILURE",
            Status::VolumeHome => "STATUS_VOLUME_HOME",
            Status::VolumeInDrive => "STATUS_VOLUME_IN_DRIVE",
            Status::VolumeInTransit => "STATUS_VOLUME_IN_TRANSIT",
            Status::VolumeNotInDrive => "STATUS_VOLUME_NOT_IN_DRIVE",
            Status::VolumeNotInLibrary => "STATUS_VOLUME_NOT_IN_LIBRARY",
            Status::VolumeInUse => "STATUS_VOLUME_IN_USE",
            Status::VolumeAvailable => "STATUS_VOLUME_AVAILABLE",
            Status::UnsupportedOption => "STATUS_UNSUPPORTED_OPTION",
            Status::NiFailure => "STATUS_NI_FAILURE",
            Status::NiTimedOut => "STATUS_NI_TIMEDOUT",
            Status::Complete => "STATUS_COMPLETE",
            Status::PoolNotFound => "STATUS_POOL_NOT_FOUND",
            Status::LockIdNotFound => "STATUS_LOCKID_NOT_FOUND",
            Status::CapNotInLibrary => "STATUS_CAP_NOT_IN_LIBRARY",
            Status::UnsupportedCommand => "STATUS_UNSUPPORTED_COMMAND",
            Status::Idle => "STATUS_IDLE",
            Status::NiTimeout => "STATUS_NI_TIMEOUT",
            Status::NoDrivesFound => "STATUS_NO_DRIVES_FOUND",
            Status::MalformedXml => "STATUS_MALFORMED_XML",
            Status::IncompatibleServer => "STATUS_INCOMPATIBLE_SERVER",
            Status::MaxRequestsExceeded => "STATUS_MAX_REQUESTS_EXCEEDED",
            Status::Other(_) => "STATUS_OTHER",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Other(code) => f.pad(&format!("STATUS_{code}")),
            other => f.pad(other.name()),
        }
    }
}

/// Operational state of a library component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum State {
    Cancelled,
    Diagnostic,
    Idle,
    IdlePending,
    Offline,
    OfflinePending,
    Online,
    Recovery,
    Run,
    Unknown(u16),
}

impl State {
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            1 => State::Cancelled,
            2 => State::Diagnostic,
            3 => State::Idle,
            4 => State::IdlePending,
            5 => State::Offline,
            6 => State::OfflinePending,
            7 => State::Online,
            8 => State::Recovery,
            9 => State::Run,
            other => State::Unknown(other),
        }
    }

    pub const fn to_raw(self) -> u16 {
        match self {
            State::Cancelled => 1,
            State::Diagnostic => 2,
            State::Idle => 3,
            State::IdlePending => 4,
            State::Offline => 5,
            State::OfflinePending => 6,
            State::Online => 7,
            State::Recovery => 8,
            State::Run => 9,
            State::Unknown(code) => code,
        }
    }
}

/// Operating mode of a cartridge access port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CapMode {
    Automatic,
    Manual,
    Unknown(u16),
}

impl CapMode {
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            1 => CapMode::Automatic,
            2 => CapMode::Manual,
            other => CapMode::Unknown(other),
        }
    }

    pub const fn to_raw(self) -> u16 {
        match self {
            CapMode::Automatic => 1,
            CapMode::Manual => 2,
            CapMode::Unknown(code) => code,
        }
    }
}

/// ACSAPI command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Command {
    Audit,
    Cancel,
    Dismount,
    Eject,
    Enter,
    Idle,
    Mount,
    Query,
    Recovery,
    Start,
    Vary,
    UnsolicitedEvent,
    SetScratch,
    DefinePool,
    DeletePool,
    SetClean,
    MountScratch,
    Unlock,
    Lock,
    ClearLock,
    QueryLock,
    SetCap,
    Register,
    Unregister,
    CheckRegistration,
    Display,
    MountPinfo,
    /// A command code not known to this implementation.
    Unknown(u16),
}

impl Command {
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            1 => Command::Audit,
            2 => Command::Cancel,
            3 => Command::Dismount,
            4 => Command::Eject,
            5 => Command::Enter,
            6 => Command::Idle,
            7 => Command::Mount,
            8 => Command::Query,
            9 => Command::Recovery,
            10 => Command::Start,
            11 => Command::Vary,
            12 => Command::UnsolicitedEvent,
            13 => Command::SetScratch,
            14 => Command::DefinePool,
            15 => Command::DeletePool,
            16 => Command::SetClean,
            17 => Command::MountScratch,
            18 => Command::Unlock,
            19 => Command::Lock,
            20 => Command::ClearLock,
            21 => Command::QueryLock,
            22 => Command::SetCap,
            23 => Command::Register,
            24 => Command::Unregister,
            25 => Command::CheckRegistration,
            26 => Command::Display,
            27 => Command::MountPinfo,
            other => Command::Unknown(other),
        }
    }

    pub const fn to_raw(self) -> u16 {
        match self {
            Command::Audit => 1,
            Command::Cancel => 2,
            Command::Dismount => 3,
            Command::Eject => 4,
            Command::Enter => 5,
            Command::Idle => 6,
            Command::Mount => 7,
            Command::Query => 8,
            Command::Recovery => 9,
            Command::Start => 10,
            Command::Vary => 11,
            Command::UnsolicitedEvent => 12,
            Command::SetScratch => 13,
            Command::DefinePool => 14,
            Command::DeletePool => 15,
            Command::SetClean => 16,
            Command::MountScratch => 17,
            Command::Unlock => 18,
            Command::Lock => 19,
            Command::ClearLock => 20,
            Command::QueryLock => 21,
            Command::SetCap => 22,
            Command::Register => 23,
            Command::Unregister => 24,
            Command::CheckRegistration => 25,
            Command::Display => 26,
            Command::MountPinfo => 27,
            Command::Unknown(code) => code,
        }
    }

    /// Commands that remain admissible while the gateway is idle or going idle.
    pub const fn allowed_while_idle(self) -> bool {
        matches!(
            self,
            Command::Cancel
                | Command::Idle
                | Command::Query
                | Command::QueryLock
                | Command::Start
                | Command::Vary
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_raw_values_are_stable() {
        assert_eq!(Status::Success.to_raw(), 0);
        assert_eq!(Status::CapNotInLibrary.to_raw(), 141);
        assert_eq!(Status::from_raw(62), Status::MessageNotFound);
        assert_eq!(Status::from_raw(204), Status::NiTimeout);
        assert_eq!(Status::from_raw(29), Status::DriveInUse);
        assert_eq!(Status::VolumeAvailable.to_raw(), 128);
        assert_eq!(Status::from_raw(9999), Status::Other(9999));
        assert_eq!(Status::Other(9999).to_raw(), 9999);
    }

    #[test]
    fn every_named_status_survives_raw_conversion() {
        for raw in 0u16..300 {
            let status = Status::from_raw(raw);
            assert_eq!(status.to_raw(), raw);
            if !matches!(status, Status::Other(_)) {
                assert!(status.name().starts_with("STATUS_"));
            }
        }
    }

    #[test]
    fn status_display_uses_conventional_name() {
        assert_eq!(Status::CountTooLarge.to_string(), "STATUS_COUNT_TOO_LARGE");
        assert_eq!(Status::Other(500).to_string(), "STATUS_500");
    }

    #[test]
    fn idle_admission_list() {
        assert!(Command::Cancel.allowed_while_idle());
        assert!(Command::Vary.allowed_while_idle());
        assert!(!Command::Mount.allowed_while_idle());
        assert!(!Command::DefinePool.allowed_while_idle());
    }

    #[test]
    fn command_codes_survive_raw_conversion() {
        for raw in 0u16..40 {
            assert_eq!(Command::from_raw(raw).to_raw(), raw);
        }
        assert_eq!(State::from_raw(7), State::Online);
        assert_eq!(CapMode::from_raw(2), CapMode::Manual);
    }

    #[test]
    fn option_bits() {
        let options = MessageOptions::FORCE | MessageOptions::EXTENDED;
        assert_eq!(options.bits(), 0x21);
        assert!(ExtendedOptions::from_bits_truncate(0x14).contains(ExtendedOptions::RANGE));
    }
}
