//! tracker.rs
//! Consumer-facing API: one object the render/physics tick talks to.
//!
//! Owns the SlotStore, the Receiver and one Smoother per slot. Every call is
//! non-blocking apart from the brief slot lock; mapping and smoothing run on the
//! snapshot after the lock is released. A bind failure leaves the tracker
//! disabled (every slot reports no data) instead of retrying.

use glam::Quat;
use log::{error, info, warn};
use std::sync::Arc;

use crate::ingest::{
    diagnostics::ReceiverDiagnostics,
    packet::{MotionSample, PlayerSlot},
    receiver::Receiver,
    slot_store::SlotStore,
};
use crate::orientation::{mapper, smoother::Smoother};
use crate::utils::config::Config;

pub struct MotionTracker {
    config: Config,
    store: Arc<SlotStore>,
    receiver: Option<Receiver>,
    smoothers: [Smoother; 2],
}

impl MotionTracker {
    /// Binds the configured port and starts ingesting.
    pub fn start(config: Config) -> Self {
        let store = Arc::new(SlotStore::new());
        let addr = config.listen_addr();

        let receiver = match Receiver::start(addr, store.clone(), config.verbose_logs) {
            Ok(rx) => Some(rx),
            Err(e) => {
                error!("[Tracker] FAILED to bind UDP port {}: {}. Tracking disabled.", config.listen_port, e);
                None
            }
        };

        Self::with_parts(config, store, receiver)
    }

    /// Builds a tracker over an externally fed store, without a network endpoint.
    pub fn detached(config: Config, store: Arc<SlotStore>) -> Self {
        Self::with_parts(config, store, None)
    }

    fn with_parts(mut config: Config, store: Arc<SlotStore>, receiver: Option<Receiver>) -> Self {
        if let Err(e) = config.sanitize() {
            warn!("[Tracker] {}; using rotationLerp = {}", e, config.rotation_lerp);
        }
        Self {
            config,
            store,
            receiver,
            smoothers: [Smoother::new(), Smoother::new()],
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// False when the receiver could not bind.
    pub fn is_enabled(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn diagnostics(&self) -> Option<Arc<ReceiverDiagnostics>> {
        self.receiver.as_ref().map(Receiver::diagnostics)
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.receiver.as_ref().map(Receiver::local_addr)
    }

    pub fn has_data(&self, slot: PlayerSlot) -> bool {
        self.store.has_data(slot)
    }

    pub fn latest_sample(&self, slot: PlayerSlot) -> Option<Arc<MotionSample>> {
        self.store.latest(slot)
    }

    /// Magnitude of the latest angular velocity (swing speed input for collaborators).
    pub fn angular_speed(&self, slot: PlayerSlot) -> Option<f32> {
        self.store.latest(slot).map(|s| s.angular_velocity.length())
    }

    /// Maps and smooths the slot's latest orientation for a tick of `dt_seconds`.
    /// `None` until the slot has received its first sample.
    pub fn current_orientation(&mut self, slot: PlayerSlot, dt_seconds: f32) -> Option<Quat> {
        let sample = self.store.latest(slot)?;
        let target = mapper::map(sample.orientation, self.config.preset, self.config.flip_front_back);
        Some(self.smoothers[slot.index()].step(target, dt_seconds, self.config.rotation_lerp))
    }

    /// Next orientation for this slot is taken unsmoothed.
    pub fn reset_smoothing(&mut self, slot: PlayerSlot) {
        self.smoothers[slot.index()].reset();
    }

    /// Stops the receiver with a bounded wait. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(mut rx) = self.receiver.take() {
            rx.stop();
            info!("[Tracker] stopped");
        }
    }
}

impl Drop for MotionTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::mapper::{MappingPreset, YAW_180};
    use glam::Vec3;

    fn sample(slot: PlayerSlot, q: Quat) -> Arc<MotionSample> {
        Arc::new(MotionSample {
            timestamp: 0.0,
            device_id: "dev1".into(),
            slot,
            orientation: q,
            angular_velocity: Vec3::new(3.0, 4.0, 0.0),
            linear_acceleration: Vec3::ZERO,
        })
    }

    fn config(preset: MappingPreset, flip: bool, lerp: f32) -> Config {
        Config {
            preset,
            flip_front_back: flip,
            rotation_lerp: lerp,
            ..Config::default()
        }
    }

    #[test]
    fn no_orientation_before_first_sample() {
        let store = Arc::new(SlotStore::new());
        let mut t = MotionTracker::detached(Config::default(), store);
        assert!(!t.has_data(PlayerSlot::One));
        assert_eq!(t.current_orientation(PlayerSlot::One, 0.016), None);
        assert_eq!(t.angular_speed(PlayerSlot::One), None);
        assert!(!t.is_enabled());
    }

    #[test]
    fn first_orientation_is_mapped_target() {
        let store = Arc::new(SlotStore::new());
        let raw = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        store.put(PlayerSlot::Two, sample(PlayerSlot::Two, raw));

        let mut t = MotionTracker::detached(config(MappingPreset::A, true, 0.35), store);
        let q = t.current_orientation(PlayerSlot::Two, 0.016).unwrap();
        assert_eq!(q, YAW_180 * Quat::from_xyzw(0.1, 0.2, -0.3, 0.9));
        assert_eq!(t.angular_speed(PlayerSlot::Two), Some(5.0));
        assert_eq!(t.current_orientation(PlayerSlot::One, 0.016), None);
    }

    #[test]
    fn slots_smooth_independently() {
        let store = Arc::new(SlotStore::new());
        let a = Quat::from_rotation_y(0.0);
        let b = Quat::from_rotation_y(1.0);
        store.put(PlayerSlot::One, sample(PlayerSlot::One, a));
        store.put(PlayerSlot::Two, sample(PlayerSlot::Two, b));

        let mut t = MotionTracker::detached(config(MappingPreset::C, false, 0.0), store.clone());
        let first_one = t.current_orientation(PlayerSlot::One, 0.016).unwrap();
        let first_two = t.current_orientation(PlayerSlot::Two, 0.016).unwrap();

        // rate 0 freezes each slot at its own seed.
        store.put(PlayerSlot::One, sample(PlayerSlot::One, b));
        assert_eq!(t.current_orientation(PlayerSlot::One, 0.016), Some(first_one));
        assert_eq!(t.current_orientation(PlayerSlot::Two, 0.016), Some(first_two));

        t.reset_smoothing(PlayerSlot::One);
        let reseeded = t.current_orientation(PlayerSlot::One, 0.016).unwrap();
        assert_eq!(reseeded, MappingPreset::C.apply(b));
    }

    #[test]
    fn unusable_lerp_is_repaired_before_smoothing() {
        let store = Arc::new(SlotStore::new());
        store.put(PlayerSlot::One, sample(PlayerSlot::One, Quat::from_rotation_y(0.0)));

        let mut t = MotionTracker::detached(config(MappingPreset::A, false, f32::NAN), store.clone());
        assert_eq!(t.config().rotation_lerp, crate::utils::config::DEFAULT_ROTATION_LERP);

        assert!(t.current_orientation(PlayerSlot::One, 0.016).unwrap().is_finite());
        store.put(PlayerSlot::One, sample(PlayerSlot::One, Quat::from_rotation_y(1.0)));
        for _ in 0..10 {
            assert!(t.current_orientation(PlayerSlot::One, 1.0 / 60.0).unwrap().is_finite());
        }

        let clamped = MotionTracker::detached(config(MappingPreset::A, false, 7.0), Arc::new(SlotStore::new()));
        assert_eq!(clamped.config().rotation_lerp, 1.0);
    }

    #[test]
    fn bind_failure_disables_tracker() {
        let holder = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = holder.local_addr().unwrap().port();
        let cfg = Config {
            listen_port: port,
            bind_address: "127.0.0.1".parse().unwrap(),
            ..Config::default()
        };
        let mut t = MotionTracker::start(cfg);
        assert!(!t.is_enabled());
        assert!(t.diagnostics().is_none());
        assert!(!t.has_data(PlayerSlot::One));
        t.stop();
        t.stop();
    }
}
