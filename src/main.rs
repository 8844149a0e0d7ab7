//! # Motion Ingest Entry Point
//! Headless consumer for the UDP motion telemetry pipeline.
//!
//! Binds the configured port, then runs a 60 Hz tick loop standing in for the
//! render loop: each tick reads both slots, maps and smooths the orientation and
//! logs it once per second. Press Enter to shut down.
//!
//! ## Usage
//! `motion_ingest [config.json]`, logging through `RUST_LOG` (e.g. `RUST_LOG=info`).

use log::{error, info, warn};
use motion_ingest::{
    MotionTracker, PlayerSlot,
    utils::{config::Config, stats::StatsReporter},
};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    env,
    io::{self, stdin},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

const TICK_HZ: u64 = 60;
const REPORT_EVERY_TICKS: u64 = TICK_HZ;

fn main() {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => match Config::load(&path) {
            Ok(c) => c,
            Err(e) => {
                error!("[Main] {}", e);
                return;
            }
        },
        None => Config::default(),
    };
    info!("[Main] config: {:?}", config);

    let tracker = MotionTracker::start(config.clone());
    let diagnostics = match tracker.diagnostics() {
        Some(d) => d,
        None => {
            error!("[Main] receiver disabled, exiting");
            return;
        }
    };

    let mut stats = StatsReporter::spawn(diagnostics, config.verbose_logs, config.stats_csv.clone());

    let running = Arc::new(AtomicBool::new(true));
    let consumer = {
        let running = running.clone();
        thread::spawn(move || run_consumer(tracker, running))
    };

    println!("Listening on port {}. Press Enter to stop.", config.listen_port);
    let mut line = String::new();
    if !stdin_requests_shutdown(stdin().read_line(&mut line)) {
        // Detached or redirected from /dev/null: keep serving until killed.
        loop {
            thread::park();
        }
    }

    running.store(false, Ordering::Release);
    if consumer.join().is_err() {
        error!("[Main] consumer thread panicked");
    }
    stats.stop();
    info!("[Main] shutdown complete");
}

/// True when the operator pressed Enter. A closed or unreadable stdin is not a
/// shutdown request.
fn stdin_requests_shutdown(read: io::Result<usize>) -> bool {
    match read {
        Ok(0) => {
            warn!("[Main] stdin closed; running until the process is terminated");
            false
        }
        Ok(_) => true,
        Err(e) => {
            warn!("[Main] cannot read stdin ({}); running until the process is terminated", e);
            false
        }
    }
}

/// Fixed-rate tick loop; the tracker is stopped when the loop ends.
fn run_consumer(mut tracker: MotionTracker, running: Arc<AtomicBool>) {
    let period = Duration::from_nanos(1_000_000_000 / TICK_HZ);
    let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

    let mut next_deadline = Instant::now() + period;
    let mut last_tick = Instant::now();
    let mut tick: u64 = 0;

    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < next_deadline {
            sleeper.sleep(next_deadline - now);
        }

        let actual = Instant::now();
        let dt = actual.duration_since(last_tick).as_secs_f32();
        last_tick = actual;

        for slot in PlayerSlot::ALL {
            if !tracker.has_data(slot) {
                continue;
            }
            if let Some(q) = tracker.current_orientation(slot, dt) {
                if tick % REPORT_EVERY_TICKS == 0 {
                    let (yaw, pitch, roll) = q.to_euler(glam::EulerRot::YXZ);
                    info!(
                        "[Consumer] {} yaw={:.1} pitch={:.1} roll={:.1} swing={:.2}",
                        slot,
                        yaw.to_degrees(),
                        pitch.to_degrees(),
                        roll.to_degrees(),
                        tracker.angular_speed(slot).unwrap_or(0.0),
                    );
                }
            }
        }

        next_deadline += period;
        // Don't try to catch up after a long stall.
        if next_deadline < actual {
            next_deadline = actual + period;
        }
        tick += 1;
    }

    tracker.stop();
}
