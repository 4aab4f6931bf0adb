//! Typed ACSAPI request packets.

use crate::{Command, ExtendedOptions, MessageOptions};

/// Identifier of one LSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LsmId {
    pub acs: u16,
    pub lsm: u16,
}

/// Identifier of one cartridge access port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CapId {
    pub acs: u16,
    pub lsm: u16,
    pub cap: u16,
}

impl CapId {
    pub const fn new(acs: u16, lsm: u16, cap: u16) -> Self {
        Self { acs, lsm, cap }
    }

    pub const fn lsm_id(self) -> LsmId {
        LsmId {
            acs: self.acs,
            lsm: self.lsm,
        }
    }
}

/// Identifier of one tape drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DriveId {
    pub acs: u16,
    pub lsm: u16,
    pub panel: u16,
    pub drive: u16,
}

impl DriveId {
    pub const fn new(acs: u16, lsm: u16, panel: u16, drive: u16) -> Self {
        Self {
            acs,
            lsm,
            panel,
            drive,
        }
    }
}

/// Fields common to every request packet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestHeader {
    /// Correlation id chosen by the client; 0 is never cancellable.
    pub sequence: u32,
    pub options: MessageOptions,
    pub extended: ExtendedOptions,
    /// ACSAPI access control user id, if any.
    pub user: Option<String>,
}

/// Selection criteria of a QUERY request. An empty list selects everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCriteria {
    Server,
    Acs(Vec<u16>),
    Lsm(Vec<LsmId>),
    Cap(Vec<CapId>),
    Drive(Vec<DriveId>),
    /// Six character volume serials.
    Volume(Vec<String>),
}

impl QueryCriteria {
    /// Number of identifiers named by the request.
    pub fn count(&self) -> usize {
        match self {
            QueryCriteria::Server => 0,
            QueryCriteria::Acs(ids) => ids.len(),
            QueryCriteria::Lsm(ids) => ids.len(),
            QueryCriteria::Cap(ids) => ids.len(),
            QueryCriteria::Drive(ids) => ids.len(),
            QueryCriteria::Volume(ids) => ids.len(),
        }
    }
}

/// Command specific request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Query(QueryCriteria),
    Cancel { request_id: u32 },
    /// Scratch pool ids to define.
    DefinePool { pools: Vec<u16> },
    Idle,
    Start,
    /// Exactly one drive is expected; the list keeps the client's count visible.
    Mount {
        volume: String,
        drives: Vec<DriveId>,
    },
    Dismount {
        volume: String,
        drive: DriveId,
    },
    /// A command whose payload the gateway never inspects.
    Opaque(Command),
}

/// One inbound ACSAPI request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub header: RequestHeader,
    pub body: RequestBody,
}

impl Request {
    pub fn new(sequence: u32, body: RequestBody) -> Self {
        Self {
            header: RequestHeader {
                sequence,
                ..RequestHeader::default()
            },
            body,
        }
    }

    /// Command code implied by the payload.
    pub fn command(&self) -> Command {
        match &self.body {
            RequestBody::Query(_) => Command::Query,
            RequestBody::Cancel { .. } => Command::Cancel,
            RequestBody::DefinePool { .. } => Command::DefinePool,
            RequestBody::Idle => Command::Idle,
            RequestBody::Start => Command::Start,
            RequestBody::Mount { .. } => Command::Mount,
            RequestBody::Dismount { .. } => Command::Dismount,
            RequestBody::Opaque(command) => *command,
        }
    }

    pub fn with_options(mut self, options: MessageOptions) -> Self {
        self.header.options = options;
        self
    }
}
