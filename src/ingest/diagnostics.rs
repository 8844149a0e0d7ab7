//! diagnostics.rs
//! Receiver counters for the optional once-per-second stats reporter.
//!
//! Per-counter atomics keep the receive thread contention-free; nothing here
//! touches the slot store lock. The last device id is the only non-`Copy` value
//! and sits behind its own small mutex.

use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use std::{
    net::SocketAddr,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::ingest::packet::DecodeError;

/// Slot value reported before any packet was parsed.
pub const NO_SLOT: i64 = -999;

#[derive(Debug)]
pub struct ReceiverDiagnostics {
    interval_packets: AtomicU64,
    accepted: AtomicU64,
    malformed: AtomicU64,
    missing_device: AtomicU64,
    invalid_slot: AtomicU64,
    transport_errors: AtomicU64,
    last_sender: AtomicCell<Option<SocketAddr>>,
    last_slot: AtomicCell<i64>,
    last_device: Mutex<String>,
}

/// Point-in-time copy of the counters; `packets` covers the last interval only.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub packets: u64,
    pub accepted: u64,
    pub malformed: u64,
    pub missing_device: u64,
    pub invalid_slot: u64,
    pub transport_errors: u64,
    pub last_sender: String,
    pub last_slot: i64,
    pub last_device: String,
}

impl Default for ReceiverDiagnostics {
    fn default() -> Self {
        Self {
            interval_packets: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            missing_device: AtomicU64::new(0),
            invalid_slot: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            last_sender: AtomicCell::new(None),
            last_slot: AtomicCell::new(NO_SLOT),
            last_device: Mutex::new(String::new()),
        }
    }
}

impl ReceiverDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every datagram, valid or not.
    #[inline]
    pub fn record_datagram(&self, from: SocketAddr) {
        self.interval_packets.fetch_add(1, Ordering::Relaxed);
        self.last_sender.store(Some(from));
    }

    /// Routing fields of a structurally valid record.
    pub fn record_routing(&self, slot: i64, device_id: &str) {
        self.last_slot.store(slot);
        let mut last = self.last_device.lock();
        last.clear();
        last.push_str(device_id);
    }

    #[inline]
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a rejection; routing fields are recorded when the record parsed.
    pub fn record_rejected(&self, err: &DecodeError) {
        match err {
            DecodeError::MalformedPayload(_) => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
            }
            DecodeError::MissingDeviceId { slot } => {
                self.missing_device.fetch_add(1, Ordering::Relaxed);
                self.record_routing(*slot, "");
            }
            DecodeError::InvalidSlot { slot, device_id } => {
                self.invalid_slot.fetch_add(1, Ordering::Relaxed);
                self.record_routing(*slot, device_id);
            }
        }
    }

    #[inline]
    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_sender(&self) -> Option<SocketAddr> {
        self.last_sender.load()
    }

    pub fn last_slot(&self) -> i64 {
        self.last_slot.load()
    }

    pub fn last_device(&self) -> String {
        self.last_device.lock().clone()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Snapshot and reset the per-interval packet counter.
    pub fn take_interval(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets: self.interval_packets.swap(0, Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            missing_device: self.missing_device.load(Ordering::Relaxed),
            invalid_slot: self.invalid_slot.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            last_sender: self.last_sender().map(|a| a.to_string()).unwrap_or_default(),
            last_slot: self.last_slot.load(),
            last_device: self.last_device(),
        }
    }
}
