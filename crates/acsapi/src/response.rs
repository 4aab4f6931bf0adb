//! Typed ACSAPI response packets.

use crate::{CapId, CapMode, Command, DriveId, LsmId, State, Status};

/// Position of a packet within the response stream of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ResponseKind {
    /// Sent before any network activity to tell the client the request was accepted.
    Acknowledge,
    /// One of several data packets; more follow.
    Intermediate,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CapStatus {
    pub cap_id: CapId,
    pub status: Status,
    pub priority: u8,
    /// Number of cells in the CAP.
    pub size: u16,
    pub state: State,
    pub mode: CapMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AcsStatus {
    pub acs: u16,
    pub status: Status,
    pub state: State,
    pub freecells: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LsmStatus {
    pub lsm_id: LsmId,
    pub status: Status,
    pub state: State,
    pub freecells: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStatus {
    pub pool_id: u16,
    pub status: Status,
    pub volumes: u32,
    pub low_water_mark: u32,
    pub high_water_mark: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ServerStatus {
    pub status: Status,
    pub state: State,
    pub freecells: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DriveStatus {
    pub drive_id: DriveId,
    pub status: Status,
    pub state: State,
    /// Mounted volume, when the drive is in use.
    pub volume: Option<String>,
    pub drive_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VolumeStatus {
    pub volume: String,
    pub status: Status,
    pub media_type: u8,
    /// Drive holding the volume, when mounted.
    pub drive_id: Option<DriveId>,
}

/// Command specific response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ResponseBody {
    Empty,
    Caps(Vec<CapStatus>),
    Acs(Vec<AcsStatus>),
    Lsms(Vec<LsmStatus>),
    Pools(Vec<PoolStatus>),
    Server(ServerStatus),
    Drives(Vec<DriveStatus>),
    Volumes(Vec<VolumeStatus>),
    Cancel { request_id: u32 },
    Mount { volume: String, drive_id: DriveId },
    Dismount { volume: String, drive_id: DriveId },
}

impl ResponseBody {
    /// Number of per-item entries carried by the packet.
    pub fn len(&self) -> usize {
        match self {
            ResponseBody::Empty | ResponseBody::Cancel { .. } => 0,
            ResponseBody::Server(_)
            | ResponseBody::Mount { .. }
            | ResponseBody::Dismount { .. } => 1,
            ResponseBody::Caps(items) => items.len(),
            ResponseBody::Acs(items) => items.len(),
            ResponseBody::Lsms(items) => items.len(),
            ResponseBody::Pools(items) => items.len(),
            ResponseBody::Drives(items) => items.len(),
            ResponseBody::Volumes(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One outbound ACSAPI response packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResponsePacket {
    /// Sequence number of the request being answered.
    pub sequence: u32,
    pub command: Command,
    pub kind: ResponseKind,
    pub status: Status,
    pub body: ResponseBody,
}

impl ResponsePacket {
    pub fn acknowledge(sequence: u32, command: Command) -> Self {
        Self {
            sequence,
            command,
            kind: ResponseKind::Acknowledge,
            status: Status::Success,
            body: ResponseBody::Empty,
        }
    }

    /// Final packet carrying only a status.
    pub fn status_only(sequence: u32, command: Command, status: Status) -> Self {
        Self {
            sequence,
            command,
            kind: ResponseKind::Final,
            status,
            body: ResponseBody::Empty,
        }
    }

    pub fn is_final(&self) -> bool {
        self.kind == ResponseKind::Final
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_packet_is_final_and_empty() {
        let packet = ResponsePacket::status_only(3, Command::Vary, Status::UnsupportedCommand);
        assert!(packet.is_final());
        assert!(packet.body.is_empty());
        assert_eq!(packet.status, Status::UnsupportedCommand);
    }

    #[test]
    fn acknowledge_is_not_final() {
        let packet = ResponsePacket::acknowledge(3, Command::Query);
        assert_eq!(packet.kind, ResponseKind::Acknowledge);
        assert!(!packet.is_final());
    }
}
