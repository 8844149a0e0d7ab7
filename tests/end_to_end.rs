//! Loopback UDP tests driving the full receive → store → map → smooth path.

use glam::Quat;
use motion_ingest::{
    Config, MappingPreset, MotionTracker, PlayerSlot,
    ingest::receiver::RECV_TIMEOUT,
};
use std::{
    net::{SocketAddr, UdpSocket},
    thread,
    time::{Duration, Instant},
};

fn loopback_config() -> Config {
    Config {
        listen_port: 0,
        bind_address: "127.0.0.1".parse().unwrap(),
        verbose_logs: false,
        ..Config::default()
    }
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn send(to: SocketAddr, payload: &str) {
    let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
    tx.send_to(payload.as_bytes(), to).unwrap();
}

#[test]
fn latest_packet_wins_and_other_slot_stays_empty() {
    let mut tracker = MotionTracker::start(loopback_config());
    assert!(tracker.is_enabled());
    let addr = tracker.local_addr().unwrap();
    let diag = tracker.diagnostics().unwrap();

    let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
    tx.send_to(
        br#"{"t":0,"deviceId":"dev1","playerSlot":1,"qx":0,"qy":0,"qz":0,"qw":1,"gx":0,"gy":0,"gz":0,"ax":0,"ay":0,"az":0}"#,
        addr,
    )
    .unwrap();
    tx.send_to(
        br#"{"t":0,"deviceId":"dev1","playerSlot":1,"qx":0,"qy":0,"qz":1,"qw":0,"gx":0,"gy":0,"gz":0,"ax":0,"ay":0,"az":0}"#,
        addr,
    )
    .unwrap();

    assert!(wait_for(|| diag.accepted() == 2));

    let latest = tracker.latest_sample(PlayerSlot::One).unwrap();
    assert_eq!(latest.orientation, Quat::from_xyzw(0.0, 0.0, 1.0, 0.0));
    assert_eq!(latest.device_id, "dev1");
    assert!(tracker.has_data(PlayerSlot::One));
    assert!(!tracker.has_data(PlayerSlot::Two));
    assert_eq!(diag.last_slot(), 1);
    assert_eq!(diag.last_device(), "dev1");
    assert_eq!(diag.last_sender(), Some(tx.local_addr().unwrap()));

    tracker.stop();
}

#[test]
fn invalid_packets_never_reach_the_consumer() {
    let mut tracker = MotionTracker::start(loopback_config());
    let addr = tracker.local_addr().unwrap();
    let diag = tracker.diagnostics().unwrap();

    send(addr, r#"{"deviceId":"dev1","playerSlot":3,"qw":1}"#);
    send(addr, r#"{"deviceId":"dev1","playerSlot":-1,"qw":1}"#);
    send(addr, r#"{"deviceId":"","playerSlot":2,"qw":1}"#);
    send(addr, r#"{"deviceId":"dev1","play"#);
    send(addr, r#"{"deviceId":"dev2","playerSlot":2,"qw":1}"#);

    assert!(wait_for(|| tracker.has_data(PlayerSlot::Two)));
    assert!(wait_for(|| {
        let s = diag.take_interval();
        s.invalid_slot == 2 && s.missing_device == 1 && s.malformed == 1
    }));

    assert!(!tracker.has_data(PlayerSlot::One));
    assert_eq!(tracker.current_orientation(PlayerSlot::One, 0.016), None);
    assert_eq!(tracker.latest_sample(PlayerSlot::Two).unwrap().device_id, "dev2");

    tracker.stop();
}

#[test]
fn consumer_sees_mapped_and_smoothed_orientation() {
    let cfg = Config {
        preset: MappingPreset::A,
        flip_front_back: false,
        rotation_lerp: 1.0,
        ..loopback_config()
    };
    let mut tracker = MotionTracker::start(cfg);
    let addr = tracker.local_addr().unwrap();

    send(addr, r#"{"deviceId":"dev1","playerSlot":1,"qx":0.5,"qy":0.5,"qz":0.5,"qw":0.5}"#);
    assert!(wait_for(|| tracker.has_data(PlayerSlot::One)));

    let q = tracker.current_orientation(PlayerSlot::One, 1.0 / 60.0).unwrap();
    assert_eq!(q, Quat::from_xyzw(0.5, 0.5, -0.5, 0.5));

    tracker.stop();
}

#[test]
fn shutdown_is_bounded_while_receive_is_pending() {
    let mut tracker = MotionTracker::start(loopback_config());
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    tracker.stop();
    assert!(started.elapsed() < RECV_TIMEOUT);

    // Repeated stop and drop are both no-ops.
    tracker.stop();
    drop(tracker);
}
