//! Once-per-second receiver statistics: log line plus optional CSV trail.
//!
//! Pulls `ReceiverDiagnostics::take_interval()` on its own thread; the receive
//! loop never waits on it. Stop is signalled through a crossbeam channel so the
//! reporter wakes immediately instead of finishing its sleep.

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use csv::Writer;
use log::{error, info};
use serde::Serialize;
use std::{
    fs::{File, OpenOptions},
    io::BufWriter,
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::ingest::diagnostics::{ReceiverDiagnostics, StatsSnapshot};

pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

// Flat on purpose: the csv writer rejects flattened (map) fields.
#[derive(Debug, Serialize)]
struct StatsRow<'a> {
    ts_epoch_us: u64,
    packets: u64,
    accepted: u64,
    malformed: u64,
    missing_device: u64,
    invalid_slot: u64,
    transport_errors: u64,
    last_sender: &'a str,
    last_slot: i64,
    last_device: &'a str,
}

impl<'a> StatsRow<'a> {
    fn new(ts_epoch_us: u64, s: &'a StatsSnapshot) -> Self {
        Self {
            ts_epoch_us,
            packets: s.packets,
            accepted: s.accepted,
            malformed: s.malformed,
            missing_device: s.missing_device,
            invalid_slot: s.invalid_slot,
            transport_errors: s.transport_errors,
            last_sender: &s.last_sender,
            last_slot: s.last_slot,
            last_device: &s.last_device,
        }
    }
}

/// Human-readable summary of one interval.
pub fn format_snapshot(s: &StatsSnapshot) -> String {
    format!(
        "~{} pkt/s | lastSender={} | lastSlot={} | lastDevice={}",
        s.packets, s.last_sender, s.last_slot, s.last_device
    )
}

pub struct StatsReporter {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatsReporter {
    pub fn spawn(
        diagnostics: Arc<ReceiverDiagnostics>,
        verbose: bool,
        csv_path: Option<PathBuf>,
    ) -> Self {
        Self::spawn_with_interval(diagnostics, verbose, csv_path, REPORT_INTERVAL)
    }

    pub fn spawn_with_interval(
        diagnostics: Arc<ReceiverDiagnostics>,
        verbose: bool,
        csv_path: Option<PathBuf>,
        interval: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || {
            let mut csv = csv_path.and_then(|p| match open_csv(&p) {
                Ok(w) => Some(w),
                Err(e) => {
                    error!("[Stats] cannot open {:?}: {}", p, e);
                    None
                }
            });

            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let snap = diagnostics.take_interval();
                if snap.packets > 0 || verbose {
                    info!("[Stats] {}", format_snapshot(&snap));
                }

                if let Some(w) = csv.as_mut() {
                    let ts_epoch_us = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_micros() as u64;
                    if let Err(e) = write_row(w, &StatsRow::new(ts_epoch_us, &snap)) {
                        error!("[Stats] csv write failed, disabling: {}", e);
                        csv = None;
                    }
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn write_row(w: &mut Writer<BufWriter<File>>, row: &StatsRow<'_>) -> Result<(), csv::Error> {
    w.serialize(row)?;
    w.flush()?;
    Ok(())
}

fn open_csv(path: &PathBuf) -> Result<Writer<BufWriter<File>>, std::io::Error> {
    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(BufWriter::new(file)))
}
