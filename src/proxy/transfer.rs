//! Bidirectional byte relay between two streams.
//!
//! # Responsibilities
//! - Copy bytes client→backend and backend→client concurrently
//! - Accumulate per-direction throughput counters
//! - Tear both directions down as soon as either one finishes
//! - Optionally bound each read by an idle timeout
//!
//! # Design Decisions
//! - Cross-termination via a shared watch flag: the first loop to exit
//!   (EOF, error, idle timeout) flips it, and the other loop races both
//!   its pending read and its pending write against the flag. The flag
//!   is a level, so it cannot double-fire no matter which loop ends
//!   first.
//! - An I/O error observed after the peer loop already started teardown
//!   is self-induced and reported as clean termination.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::proxy::stats::ThroughputStats;

/// Fixed chunk size for each copy loop.
pub const BUFFER_SIZE: usize = 16 * 1024;

/// Shared handles to both directions' counters.
///
/// Cloned out of the transfer before it runs, so throughput can be
/// observed while the relay is in flight and after it returns.
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// Counters for the client→backend direction.
    pub client_to_backend: Arc<ThroughputStats>,
    /// Counters for the backend→client direction.
    pub backend_to_client: Arc<ThroughputStats>,
}

impl TransferStats {
    fn new() -> Self {
        Self {
            client_to_backend: Arc::new(ThroughputStats::new()),
            backend_to_client: Arc::new(ThroughputStats::new()),
        }
    }
}

/// Relays bytes between a client stream and a backend stream until
/// either side closes, then force-terminates the other direction.
///
/// Owns both streams for its entire lifetime; by the time [`run`]
/// returns, both have been shut down and dropped.
///
/// [`run`]: ProxyTransfer::run
#[derive(Debug)]
pub struct ProxyTransfer<C, B> {
    client: C,
    backend: B,
    idle_timeout: Option<Duration>,
    stats: TransferStats,
}

impl<C, B> ProxyTransfer<C, B>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a transfer over an accepted client stream and a dialed
    /// backend stream. `idle_timeout`, when set, bounds every read in
    /// both directions; a window with no bytes moved aborts the relay.
    pub fn new(client: C, backend: B, idle_timeout: Option<Duration>) -> Self {
        Self {
            client,
            backend,
            idle_timeout,
            stats: TransferStats::new(),
        }
    }

    /// Handles to the per-direction counters.
    pub fn stats(&self) -> TransferStats {
        self.stats.clone()
    }

    /// Run both copy loops to completion.
    ///
    /// Returns the first genuine error observed. If both loops report
    /// one, the error of the loop that was interrupted wins over the
    /// error of the loop that initiated the teardown.
    pub async fn run(self) -> io::Result<()> {
        let Self {
            client,
            backend,
            idle_timeout,
            stats,
        } = self;

        let (client_read, client_write) = tokio::io::split(client);
        let (backend_read, backend_write) = tokio::io::split(backend);
        let (stop_tx, stop_rx) = watch::channel(false);
        let teardown_started = AtomicBool::new(false);

        let client_to_backend = copy_direction(
            client_read,
            backend_write,
            &stats.client_to_backend,
            idle_timeout,
            &stop_tx,
            stop_rx.clone(),
            &teardown_started,
        );
        let backend_to_client = copy_direction(
            backend_read,
            client_write,
            &stats.backend_to_client,
            idle_timeout,
            &stop_tx,
            stop_rx,
            &teardown_started,
        );

        let ((c2b_result, c2b_initiated), (b2c_result, _)) =
            tokio::join!(client_to_backend, backend_to_client);

        match (c2b_result, b2c_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(c2b_err), Err(b2c_err)) => {
                if c2b_initiated {
                    Err(b2c_err)
                } else {
                    Err(c2b_err)
                }
            }
        }
    }
}

/// One directional copy loop.
///
/// Reads a chunk, writes it in full, repeats until EOF, error, idle
/// timeout, or the peer loop's teardown. Both the read and the write
/// can be interrupted by the teardown. Returns the loop's result and
/// whether this loop was the one that initiated the teardown.
async fn copy_direction<R, W>(
    mut reader: R,
    mut writer: W,
    stats: &ThroughputStats,
    idle_timeout: Option<Duration>,
    stop_tx: &watch::Sender<bool>,
    mut stop_rx: watch::Receiver<bool>,
    teardown_started: &AtomicBool,
) -> (io::Result<()>, bool)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];

    let mut result = loop {
        let read = tokio::select! {
            res = read_chunk(&mut reader, &mut buf, idle_timeout) => res,
            _ = stopped(&mut stop_rx) => break Ok(()),
        };

        match read {
            Ok(0) => break Ok(()),
            Ok(n) => {
                stats.add_rx(n as u64);
                // The whole chunk goes out before the next read; bytes
                // are never reordered or dropped within a direction.
                // The write races the stop flag too: a loop stuck on a
                // peer that stopped reading must still be interruptible,
                // and a partial chunk is fine on a pipe being torn down.
                let wrote = tokio::select! {
                    res = writer.write_all(&buf[..n]) => res,
                    _ = stopped(&mut stop_rx) => break Ok(()),
                };
                if let Err(e) = wrote {
                    break Err(e);
                }
                stats.add_tx(n as u64);
            }
            Err(e) => break Err(e),
        }
    };

    // An error after the peer loop already tore the pipe down is the
    // interruption working as intended, not a transfer failure.
    if result.is_err() && *stop_rx.borrow() {
        result = Ok(());
    }

    let initiated = !teardown_started.swap(true, Ordering::SeqCst);

    // Interrupt the peer loop's pending read. Harmless if it already
    // fired from the other side.
    let _ = stop_tx.send(true);
    let _ = writer.shutdown().await;

    (result, initiated)
}

async fn read_chunk<R>(reader: &mut R, buf: &mut [u8], idle_timeout: Option<Duration>) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match idle_timeout {
        Some(window) => match tokio::time::timeout(window, reader.read(buf)).await {
            Ok(res) => res,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no bytes moved within the idle window",
            )),
        },
        None => reader.read(buf).await,
    }
}

/// Resolves once the stop flag has been raised.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn relays_bytes_in_both_directions() {
        let (mut client, client_side) = duplex(1024);
        let (mut backend, backend_side) = duplex(1024);

        let transfer = ProxyTransfer::new(client_side, backend_side, None);
        let task = tokio::spawn(transfer.run());

        client.write_all(b"hello backend").await.unwrap();
        let mut buf = [0u8; 13];
        backend.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello backend");

        backend.write_all(b"hello client!").await.unwrap();
        let mut buf = [0u8; 13];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello client!");

        // Client hangs up; the relay must finish cleanly.
        drop(client);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn preserves_order_across_many_chunks() {
        let (mut client, client_side) = duplex(4096);
        let (mut backend, backend_side) = duplex(4096);

        let transfer = ProxyTransfer::new(client_side, backend_side, None);
        let stats = transfer.stats();
        let task = tokio::spawn(transfer.run());

        // Payload larger than one copy buffer so several chunks flow.
        let payload: Vec<u8> = (0..3 * BUFFER_SIZE + 17).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let writer = tokio::spawn(async move {
            client.write_all(&payload).await.unwrap();
            client.shutdown().await.unwrap();
            client
        });

        let mut received = vec![0u8; expected.len()];
        backend.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected);

        drop(writer.await.unwrap());
        assert!(task.await.unwrap().is_ok());

        assert_eq!(stats.client_to_backend.rx(), expected.len() as u64);
        assert_eq!(stats.client_to_backend.tx(), expected.len() as u64);
        assert_eq!(stats.backend_to_client.rx(), 0);
        assert_eq!(stats.backend_to_client.tx(), 0);
    }

    #[tokio::test]
    async fn eof_on_one_side_interrupts_the_other() {
        let (client, client_side) = duplex(1024);
        let (backend, backend_side) = duplex(1024);

        let transfer = ProxyTransfer::new(client_side, backend_side, None);
        let task = tokio::spawn(transfer.run());

        // Backend closes without a single byte; the client→backend loop
        // is blocked on a read and must be interrupted.
        drop(backend);

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("transfer did not terminate after peer close")
            .unwrap();
        assert!(result.is_ok());
        drop(client);
    }

    #[tokio::test]
    async fn interrupts_a_write_blocked_direction() {
        let (mut client, client_side) = duplex(1024);
        let (mut backend, backend_side) = duplex(1024);

        let transfer = ProxyTransfer::new(client_side, backend_side, None);
        let task = tokio::spawn(transfer.run());

        // Flood the client while it reads nothing, until the
        // backend→client loop is stuck mid-write on the full pipe.
        let flood = tokio::spawn(async move {
            let _ = backend.write_all(&[0u8; 8192]).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Client hangs up; the write-blocked loop must be interrupted
        // rather than left waiting on a reader that never comes back.
        client.shutdown().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("relay did not terminate while a write was blocked")
            .unwrap();
        assert!(result.is_ok());

        drop(client);
        flood.abort();
    }

    #[tokio::test]
    async fn idle_timeout_aborts_a_silent_connection() {
        let (client, client_side) = duplex(1024);
        let (backend, backend_side) = duplex(1024);

        let transfer = ProxyTransfer::new(client_side, backend_side, Some(Duration::from_millis(50)));
        let task = tokio::spawn(transfer.run());

        let err = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("idle transfer did not time out")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        drop((client, backend));
    }
}
