//! Synthetic motion device: streams JSON telemetry packets over UDP.
//!
//! Stands in for a real racket sensor when testing the receiver locally. The
//! simulated device yaws at a steady rate with a little sensor noise.
//!
//! Usage: `motion_sender [target] [slot] [device_id] [rate_hz] [duration_s]`
//! Defaults: `127.0.0.1:9000 1 sim-1 100 10`.

use log::{debug, info, warn};
use motion_ingest::ingest::packet::WirePacket;
use rand::random_range;
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    env,
    net::{SocketAddr, UdpSocket},
    time::{Duration, Instant},
};

const YAW_RATE_RAD_S: f64 = std::f64::consts::FRAC_PI_2;
const GRAVITY: f64 = 9.81;
const GYRO_NOISE: f64 = 0.02;
const ACCEL_NOISE: f64 = 0.05;

struct SenderArgs {
    target: SocketAddr,
    slot: i64,
    device_id: String,
    rate_hz: u64,
    duration: Duration,
}

fn parse_args() -> Result<SenderArgs, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let get = |i: usize, default: &str| args.get(i).cloned().unwrap_or_else(|| default.to_string());

    let target = get(0, "127.0.0.1:9000")
        .parse()
        .map_err(|e| format!("bad target address: {}", e))?;
    let slot = get(1, "1").parse().map_err(|e| format!("bad slot: {}", e))?;
    let device_id = get(2, "sim-1");
    let rate_hz: u64 = get(3, "100").parse().map_err(|e| format!("bad rate: {}", e))?;
    let secs: u64 = get(4, "10").parse().map_err(|e| format!("bad duration: {}", e))?;

    if rate_hz == 0 {
        return Err("rate must be > 0".into());
    }

    Ok(SenderArgs {
        target,
        slot,
        device_id,
        rate_hz,
        duration: Duration::from_secs(secs),
    })
}

/// Packet for time `t` seconds into the run.
fn synth_packet(args: &SenderArgs, t: f64) -> WirePacket {
    let half = 0.5 * YAW_RATE_RAD_S * t;
    WirePacket {
        t,
        device_id: Some(args.device_id.clone()),
        player_slot: args.slot,
        qx: 0.0,
        qy: half.sin(),
        qz: 0.0,
        qw: half.cos(),
        gx: random_range(-GYRO_NOISE..GYRO_NOISE),
        gy: YAW_RATE_RAD_S + random_range(-GYRO_NOISE..GYRO_NOISE),
        gz: random_range(-GYRO_NOISE..GYRO_NOISE),
        ax: random_range(-ACCEL_NOISE..ACCEL_NOISE),
        ay: GRAVITY + random_range(-ACCEL_NOISE..ACCEL_NOISE),
        az: random_range(-ACCEL_NOISE..ACCEL_NOISE),
    }
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let socket = match UdpSocket::bind("0.0.0.0:0") {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot open UDP socket: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "[Sender] {} → {} slot={} at {} Hz for {:?}",
        args.device_id, args.target, args.slot, args.rate_hz, args.duration
    );

    let period = Duration::from_nanos(1_000_000_000 / args.rate_hz);
    let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
    let start = Instant::now();
    let mut next_deadline = start + period;
    let mut sent: u64 = 0;

    while start.elapsed() < args.duration {
        let now = Instant::now();
        if now < next_deadline {
            sleeper.sleep(next_deadline - now);
        }

        let packet = synth_packet(&args, start.elapsed().as_secs_f64());
        match packet.to_bytes() {
            Ok(bytes) => match socket.send_to(&bytes, args.target) {
                Ok(_) => sent += 1,
                Err(e) => warn!("[Sender] send failed: {}", e),
            },
            Err(e) => warn!("[Sender] encode failed: {}", e),
        }

        next_deadline += period;
    }

    debug!("[Sender] elapsed {:?}", start.elapsed());
    info!("[Sender] done, {} packets sent", sent);
}
