//! TT replicator (§4.2): two background tasks per node — a transmit task
//! that drains the TT's bounded enqueue of recently-committed exact entries
//! onto a UDP broadcast socket, and a receive task that ingests broadcast
//! entries from peers into the local TT tagged remote. Loss is acceptable
//! (§6: "no framing, no sequence numbers, no authentication"); both tasks
//! are best-effort and simply log and move on when the network hiccups.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::EngineError;
use crate::tt::{RawEntry, TranspositionTable};

/// Default UDP port for TT replication broadcasts.
pub const DEFAULT_REPLICATION_PORT: u16 = 2318;

/// Bound on the transmit queue; §4.1 "when the queue is full the oldest
/// pending entry is dropped and a counter increments" — `try_send` on a
/// `SyncSender` gives us exactly that backpressure at the TT's call site.
const QUEUE_CAPACITY: usize = 1024;

/// Poll timeout on the receive socket (§5: "poll on the UDP socket with
/// 500 ms timeout"), so the rx task can observe `stop` without blocking
/// forever on a socket nobody is writing to.
const RECV_POLL_MS: u64 = 500;

/// Handles to the replicator's background threads. Dropping this without
/// calling [`Replicator::join`] leaves the threads running until `stop` is
/// observed; the destructor does not block.
pub struct Replicator {
    tx_handle: Option<JoinHandle<()>>,
    rx_handle: Option<JoinHandle<()>>,
}

impl Replicator {
    /// Wait for both background threads to exit. Callers should set their
    /// `stop` flag first.
    pub fn join(mut self) {
        if let Some(h) = self.tx_handle.take() {
            let _ = h.join();
        }
        if let Some(h) = self.rx_handle.take() {
            let _ = h.join();
        }
    }
}

/// Build a TT wired up to the replicator and start both background tasks.
/// `stop` is shared with the rest of the process's shutdown path; both
/// tasks exit once it's observed set.
#[must_use]
pub fn spawn(size_mb: usize, port: u16, stop: Arc<AtomicBool>) -> (Arc<TranspositionTable>, Replicator) {
    let (tx, rx): (SyncSender<RawEntry>, Receiver<RawEntry>) = sync_channel(QUEUE_CAPACITY);
    let tt = Arc::new(TranspositionTable::with_replication(size_mb, Some(tx)));

    let tx_handle = spawn_transmitter(rx, port, Arc::clone(&stop));
    let rx_handle = spawn_receiver(Arc::clone(&tt), port, stop);

    (
        tt,
        Replicator {
            tx_handle: Some(tx_handle),
            rx_handle: Some(rx_handle),
        },
    )
}

fn spawn_transmitter(rx: Receiver<RawEntry>, port: u16, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("replicator-tx".to_string())
        .spawn(move || {
            let socket = match UdpSocket::bind("0.0.0.0:0") {
                Ok(s) => s,
                Err(source) => {
                    let err = EngineError::SocketBind { purpose: "replicator tx", port: 0, source };
                    log::warn!("{err}");
                    return;
                }
            };
            if let Err(e) = socket.set_broadcast(true) {
                log::warn!("replicator tx: set_broadcast failed: {e}");
                return;
            }
            let dest = (std::net::Ipv4Addr::BROADCAST, port);

            while !stop.load(Ordering::Relaxed) {
                match rx.recv_timeout(Duration::from_millis(RECV_POLL_MS)) {
                    Ok(entry) => {
                        let bytes = entry.to_bytes();
                        if let Err(e) = socket.send_to(&bytes, dest) {
                            log::debug!("replicator tx: broadcast send failed: {e}");
                        }
                    }
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
        })
        .expect("failed to spawn replicator tx thread")
}

fn spawn_receiver(tt: Arc<TranspositionTable>, port: u16, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("replicator-rx".to_string())
        .spawn(move || {
            let socket = match UdpSocket::bind(("0.0.0.0", port)) {
                Ok(s) => s,
                Err(source) => {
                    let err = EngineError::SocketBind { purpose: "replicator rx", port, source };
                    log::warn!("{err}");
                    return;
                }
            };
            if let Err(e) = socket.set_read_timeout(Some(Duration::from_millis(RECV_POLL_MS))) {
                log::warn!("replicator rx: set_read_timeout failed: {e}");
                return;
            }
            let mut buf = [0u8; 16];

            while !stop.load(Ordering::Relaxed) {
                match socket.recv(&mut buf) {
                    Ok(16) => {
                        if let Some(raw) = RawEntry::from_bytes(&buf) {
                            tt.receive_remote(raw);
                        }
                    }
                    Ok(_) => log::debug!("replicator rx: dropping datagram of unexpected size"),
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => log::debug!("replicator rx: recv failed: {e}"),
                }
            }
        })
        .expect("failed to spawn replicator rx thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_shutdown_round_trips() {
        let stop = Arc::new(AtomicBool::new(false));
        // Use an ephemeral-ish port to avoid clashing with a real engine
        // instance running replication on the default port.
        let (tt, replicator) = spawn(1, 23180, Arc::clone(&stop));
        assert_eq!(tt.stats().stores_exact, 0);
        stop.store(true, Ordering::Relaxed);
        replicator.join();
    }
}
