//! receiver.rs
//! Owns the UDP endpoint and the dedicated ingestion thread; sole writer into the SlotStore.
//! - Blocking receive bounded by a 1s timeout so the loop re-checks its running flag
//! - Per-packet failures are dropped (optionally logged); transport hiccups never end the loop
//! - Shutdown: flag + wake datagram + socket shutdown, then a bounded join

use crossbeam::channel::{bounded, Receiver as DoneReceiver, RecvTimeoutError};
use log::{debug, error, info, warn};
use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, UdpSocket},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use thiserror::Error;

use crate::ingest::{
    diagnostics::ReceiverDiagnostics,
    packet::{self, DecodeError},
    slot_store::SlotStore,
};

/// Receive wait; exists only so the loop re-evaluates its running flag.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);
/// Upper bound on how long `stop()` waits for the loop to exit.
pub const JOIN_TIMEOUT: Duration = Duration::from_millis(200);

const MAX_DATAGRAM_SIZE: usize = 65_535;

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("failed to bind UDP {addr} (is the port already in use?): {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("UDP socket setup failed: {0}")]
    Socket(#[from] io::Error),
}

/// Running ingestion loop plus the handles needed to stop it.
pub struct Receiver {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    done_rx: DoneReceiver<()>,
    diagnostics: Arc<ReceiverDiagnostics>,
}

impl Receiver {
    /// Binds `bind_addr` and spawns the receive loop.
    ///
    /// A bind failure is returned as-is and never retried: it is a configuration
    /// problem (duplicate listener, privileged port), not a transient fault.
    pub fn start(
        bind_addr: SocketAddr,
        store: Arc<SlotStore>,
        verbose: bool,
    ) -> Result<Self, ReceiverError> {
        let socket = Arc::new(bind_socket(bind_addr, RECV_TIMEOUT)?);
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let diagnostics = Arc::new(ReceiverDiagnostics::new());
        let (done_tx, done_rx) = bounded::<()>(1);

        let mut ingest = ReceiveLoop {
            socket: socket.clone(),
            store,
            diagnostics: diagnostics.clone(),
            running: running.clone(),
            verbose,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        };

        let handle = thread::Builder::new()
            .name("motion-rx".into())
            .spawn(move || {
                ingest.run();
                // A panic drops the sender instead, which stop() treats the same way.
                let _ = done_tx.send(());
            })?;

        info!("[Receiver] Listening UDP on {}", local_addr);

        Ok(Self {
            socket,
            local_addr,
            running,
            handle: Some(handle),
            done_rx,
            diagnostics,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn diagnostics(&self) -> Arc<ReceiverDiagnostics> {
        self.diagnostics.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.running.load(Ordering::Acquire)
    }

    /// Signals the loop, unblocks a pending receive and waits at most `JOIN_TIMEOUT`.
    ///
    /// Returns `true` when the loop was joined (or was already stopped). Safe to call
    /// any number of times.
    pub fn stop(&mut self) -> bool {
        let handle = match self.handle.take() {
            Some(h) => h,
            None => return true,
        };

        self.running.store(false, Ordering::Release);

        // Wake a blocked recv_from: a datagram to ourselves, then shut the socket down.
        let _ = self.socket.send_to(&[], wake_addr(self.local_addr));
        if let Err(e) = SockRef::from(&*self.socket).shutdown(Shutdown::Both) {
            // Unconnected UDP sockets report ENOTCONN on some platforms but still wake.
            debug!("[Receiver] socket shutdown: {}", e);
        }

        match self.done_rx.recv_timeout(JOIN_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    error!("[Receiver] receive thread panicked");
                }
                info!("[Receiver] stopped ({})", self.local_addr);
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "[Receiver] loop did not exit within {:?}; detaching thread",
                    JOIN_TIMEOUT
                );
                false
            }
        }
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Creates the datagram socket through socket2 so the read timeout is set before
/// any receive can block. No address reuse: a second listener must fail to bind.
fn bind_socket(addr: SocketAddr, read_timeout: Duration) -> Result<UdpSocket, ReceiverError> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket
        .bind(&SockAddr::from(addr))
        .map_err(|source| ReceiverError::Bind { addr, source })?;
    socket.set_read_timeout(Some(read_timeout))?;
    Ok(socket.into())
}

fn wake_addr(local: SocketAddr) -> SocketAddr {
    match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local.port())
        }
        _ => local,
    }
}

/// What the receive loop does after a failed `recv_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecvOutcome {
    /// Read timeout elapsed; re-check the running flag.
    Timeout,
    /// Socket was torn down by `stop()`.
    Shutdown,
    /// Counted and logged; the loop keeps going.
    TransportError,
}

fn classify_recv_error(err: &io::Error, running: bool) -> RecvOutcome {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => RecvOutcome::Timeout,
        _ if !running => RecvOutcome::Shutdown,
        _ => RecvOutcome::TransportError,
    }
}

struct ReceiveLoop {
    socket: Arc<UdpSocket>,
    store: Arc<SlotStore>,
    diagnostics: Arc<ReceiverDiagnostics>,
    running: Arc<AtomicBool>,
    verbose: bool,
    buf: Vec<u8>,
}

impl ReceiveLoop {
    fn run(&mut self) {
        while self.running.load(Ordering::Acquire) {
            match self.socket.recv_from(&mut self.buf) {
                Ok((len, from)) => {
                    // Wake datagram or a packet racing shutdown.
                    if !self.running.load(Ordering::Acquire) {
                        break;
                    }
                    self.handle_datagram(len, from);
                }
                Err(e) => match classify_recv_error(&e, self.running.load(Ordering::Acquire)) {
                    RecvOutcome::Timeout => continue,
                    RecvOutcome::Shutdown => break,
                    RecvOutcome::TransportError => {
                        self.diagnostics.record_transport_error();
                        warn!("[Receiver] UDP error: {}", e);
                    }
                },
            }
        }
        debug!("[Receiver] loop exited");
    }

    fn handle_datagram(&mut self, len: usize, from: SocketAddr) {
        self.diagnostics.record_datagram(from);
        let payload = &self.buf[..len];

        match packet::decode(payload) {
            Ok(sample) => {
                self.diagnostics
                    .record_routing(sample.slot.number(), &sample.device_id);
                let slot = sample.slot;
                self.store.put(slot, Arc::new(sample));
                self.diagnostics.record_accepted();
            }
            Err(err) => {
                self.diagnostics.record_rejected(&err);
                if self.verbose {
                    log_rejection(&err, payload);
                }
            }
        }
    }
}

fn log_rejection(err: &DecodeError, payload: &[u8]) {
    let raw = String::from_utf8_lossy(payload);
    match err {
        DecodeError::MalformedPayload(reason) => {
            warn!("[Receiver] JSON parse failed: {} | raw={}", reason, raw);
        }
        DecodeError::MissingDeviceId { slot } => {
            warn!("[Receiver] Missing deviceId | slot={} | raw={}", slot, raw);
        }
        DecodeError::InvalidSlot { slot, device_id } => {
            // A misconfigured device produces no visible effect downstream, so say so.
            warn!(
                "[Receiver] playerSlot={} from device '{}' (expected 1 or 2). Nothing will update.",
                slot, device_id
            );
        }
    }
}
