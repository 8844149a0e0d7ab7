//! slot_store.rs
//! Latest-value-wins mailboxes for the two player slots.
//!
//! - One writer (the receive thread), any number of readers (consumer ticks).
//! - A single coarse `parking_lot::Mutex` covers both slots; contention is low
//!   (two slots, telemetry-rate traffic) and one lock cannot deadlock against itself.
//! - Samples are stored behind `Arc`, so a critical section is one pointer swap or
//!   one pointer clone. Decoding, mapping and smoothing all run outside the lock.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::ingest::packet::{MotionSample, PlayerSlot};

#[derive(Debug, Default, Clone)]
struct SlotMailbox {
    latest: Option<Arc<MotionSample>>,
    // Flips to true once and never reverts.
    has_data: bool,
}

/// Copy of one mailbox taken under the lock.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    pub latest: Option<Arc<MotionSample>>,
    pub has_data: bool,
}

#[derive(Debug, Default)]
pub struct SlotStore {
    slots: Mutex<[SlotMailbox; 2]>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot's latest sample. Last writer wins; sender timestamps are ignored.
    #[inline]
    pub fn put(&self, slot: PlayerSlot, sample: Arc<MotionSample>) {
        let mut slots = self.slots.lock();
        let mailbox = &mut slots[slot.index()];
        mailbox.latest = Some(sample);
        mailbox.has_data = true;
    }

    #[inline]
    pub fn get(&self, slot: PlayerSlot) -> SlotSnapshot {
        let slots = self.slots.lock();
        let mailbox = &slots[slot.index()];
        SlotSnapshot {
            latest: mailbox.latest.clone(),
            has_data: mailbox.has_data,
        }
    }

    #[inline]
    pub fn has_data(&self, slot: PlayerSlot) -> bool {
        self.slots.lock()[slot.index()].has_data
    }

    /// Latest sample for the slot, if one has ever been accepted.
    #[inline]
    pub fn latest(&self, slot: PlayerSlot) -> Option<Arc<MotionSample>> {
        self.slots.lock()[slot.index()].latest.clone()
    }
}
