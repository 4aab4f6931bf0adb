//! Fixed-capacity table of in-flight requests and out-of-band cancellation.
//!
//! Slot claim and the cancel scan are serialised by one mutex; the flag byte
//! of each slot is atomic so the owning task observes a CANCEL set by another
//! task without taking that lock.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use acsapi::Command;
use bitflags::bitflags;
use thiserror::Error;
use tl_xapi::CancelSignal;
use tracing::{debug, trace};

use crate::lookup::LookupTables;

bitflags! {
    /// Life-cycle bits of one request slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RequestFlags: u8 {
        const START = 0x01;
        const END = 0x02;
        const CANCEL = 0x04;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("request table full ({0} slots)")]
    Full(usize),
    #[error("sequence number {0} already active")]
    DuplicateSequence(u32),
}

/// Result of [`RequestTable::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The CANCEL bit was set on an active request.
    Cancelled,
    /// The target was found but had already ended.
    AlreadyCompleted,
    NotFound,
}

#[derive(Debug, Default)]
struct SlotMeta {
    command: Option<Command>,
    started: Option<SystemTime>,
    last_event: Option<SystemTime>,
    snapshot: Option<Arc<LookupTables>>,
}

#[derive(Debug, Default)]
struct Slot {
    flags: AtomicU8,
    seq: AtomicU32,
    meta: Mutex<SlotMeta>,
}

impl Slot {
    fn flags(&self) -> RequestFlags {
        RequestFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// Free, or ended and therefore reclaimable.
    fn is_free(&self) -> bool {
        let flags = self.flags();
        flags.is_empty() || flags.contains(RequestFlags::END)
    }

    fn meta(&self) -> std::sync::MutexGuard<'_, SlotMeta> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The in-flight request table shared by every handler.
#[derive(Debug)]
pub struct RequestTable {
    slots: Box<[Slot]>,
    claim: Mutex<()>,
}

impl RequestTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            claim: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim a slot for request `seq` and stamp START.
    ///
    /// Sequence 0 is never matched by [`RequestTable::cancel`] and may be
    /// registered any number of times.
    pub fn register(
        self: &Arc<Self>,
        seq: u32,
        command: Command,
        snapshot: Option<Arc<LookupTables>>,
    ) -> Result<RequestHandle, TableError> {
        let _claim = self.claim.lock().unwrap_or_else(PoisonError::into_inner);
        if seq != 0
            && self
                .slots
                .iter()
                .any(|slot| !slot.is_free() && slot.seq.load(Ordering::Acquire) == seq)
        {
            return Err(TableError::DuplicateSequence(seq));
        }
        let index = self
            .reclaimable()
            .ok_or(TableError::Full(self.slots.len()))?;
        let slot = &self.slots[index];
        let now = SystemTime::now();
        {
            let mut meta = slot.meta();
            *meta = SlotMeta {
                command: Some(command),
                started: Some(now),
                last_event: Some(now),
                snapshot,
            };
        }
        slot.seq.store(seq, Ordering::Release);
        slot.flags.store(RequestFlags::START.bits(), Ordering::Release);
        trace!(seq, slot = index, ?command, "request registered");
        Ok(RequestHandle {
            table: Arc::clone(self),
            index,
            seq,
        })
    }

    /// Slot to claim next: a never used slot, otherwise the ended slot whose
    /// last event is oldest, so recently finished requests stay visible to
    /// [`RequestTable::cancel`] as long as possible.
    fn reclaimable(&self) -> Option<usize> {
        if let Some(index) = self.slots.iter().position(|slot| slot.flags().is_empty()) {
            return Some(index);
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_free())
            .min_by_key(|(_, slot)| slot.meta().last_event)
            .map(|(index, _)| index)
    }

    /// Set the CANCEL bit of the active request with sequence `seq`.
    pub fn cancel(&self, seq: u32) -> CancelOutcome {
        if seq == 0 {
            return CancelOutcome::NotFound;
        }
        let _claim = self.claim.lock().unwrap_or_else(PoisonError::into_inner);
        let matching = |slot: &&Slot| slot.seq.load(Ordering::Acquire) == seq;
        let Some(slot) = self
            .slots
            .iter()
            .filter(matching)
            .find(|slot| !slot.is_free())
        else {
            return if self
                .slots
                .iter()
                .filter(matching)
                .any(|slot| slot.flags().contains(RequestFlags::END))
            {
                CancelOutcome::AlreadyCompleted
            } else {
                CancelOutcome::NotFound
            };
        };
        let updated = slot
            .flags
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                let flags = RequestFlags::from_bits_truncate(raw);
                (!flags.contains(RequestFlags::END)).then(|| (flags | RequestFlags::CANCEL).bits())
            });
        match updated {
            Ok(_) => {
                slot.meta().last_event = Some(SystemTime::now());
                debug!(seq, "request cancel flagged");
                CancelOutcome::Cancelled
            }
            Err(_) => CancelOutcome::AlreadyCompleted,
        }
    }

    /// Requests that have started and not yet ended.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| {
                let flags = slot.flags();
                flags.contains(RequestFlags::START) && !flags.contains(RequestFlags::END)
            })
            .count()
    }

    fn finish(&self, index: usize) {
        let slot = &self.slots[index];
        {
            let mut meta = slot.meta();
            meta.last_event = Some(SystemTime::now());
            meta.snapshot = None;
        }
        slot.flags
            .fetch_or(RequestFlags::END.bits(), Ordering::AcqRel);
    }
}

impl Default for RequestTable {
    fn default() -> Self {
        Self::new(crate::config::consts::MAX_REQUESTS)
    }
}

/// Ownership of one claimed slot; dropping it sets END.
#[derive(Debug)]
pub struct RequestHandle {
    table: Arc<RequestTable>,
    index: usize,
    seq: u32,
}

impl RequestHandle {
    pub fn sequence(&self) -> u32 {
        self.seq
    }

    pub fn flags(&self) -> RequestFlags {
        self.table.slots[self.index].flags()
    }

    /// Lookup tables captured when the request was registered.
    pub fn snapshot(&self) -> Option<Arc<LookupTables>> {
        self.table.slots[self.index].meta().snapshot.clone()
    }

    pub fn command(&self) -> Option<Command> {
        self.table.slots[self.index].meta().command
    }

    /// Time the request was registered.
    pub fn started(&self) -> Option<SystemTime> {
        self.table.slots[self.index].meta().started
    }

    /// Time of the most recent registration or cancel event.
    pub fn last_event(&self) -> Option<SystemTime> {
        self.table.slots[self.index].meta().last_event
    }
}

impl CancelSignal for RequestHandle {
    fn is_cancelled(&self) -> bool {
        self.flags().contains(RequestFlags::CANCEL)
    }
}

impl Drop for RequestHandle {
    fn drop(&mut self) {
        self.table.finish(self.index);
        trace!(seq = self.seq, slot = self.index, "request finished");
    }
}
