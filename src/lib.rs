//! # Motion Ingest
//! Receives orientation telemetry from up to two wireless motion devices over UDP
//! and hands the freshest sample per player slot to a consumer tick loop.
//!
//! ## Pipeline
//! UDP datagram → `ingest::packet` (decode + validate) → `ingest::slot_store` (latest value wins)
//! → consumer tick → `orientation::mapper` (axis preset) → `orientation::smoother` (frame-rate
//! independent slerp) → orientation applied by the external collaborator.
//!
//! ## Concurrency
//! - One dedicated receive thread per process (bounded 1s receive timeout, cooperative shutdown).
//! - One coarse `parking_lot::Mutex` over both slot mailboxes; no I/O or math under the lock.
//! - Diagnostics are atomics kept apart from the slot lock.

pub mod ingest;
pub mod orientation;
pub mod tracker;
pub mod utils;

pub use ingest::packet::{MotionSample, PlayerSlot};
pub use orientation::mapper::MappingPreset;
pub use tracker::MotionTracker;
pub use utils::config::Config;
