//! Draining TCP listener.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept connections and count them while they stay open
//! - On close, stop accepting and wait for the count to reach zero,
//!   bounded by the configured drain wait
//!
//! # Design Decisions
//! - The drained signal fires from two sites (drain request with zero
//!   open connections, last tracked connection dropping) and must be
//!   observed once; a watch level absorbs both without faulting
//! - close(self) consumes the listener: no accept after a drain was
//!   requested, and no double close

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::net::connection::TrackedStream;

/// Default upper bound on the drain wait.
pub const DEFAULT_DRAIN_WAIT: Duration = Duration::from_secs(5);

/// The drain wait elapsed with connections still open.
#[derive(Debug, Error)]
#[error("cannot complete graceful shutdown in {bound:?}")]
pub struct DrainTimeoutError {
    /// The configured drain bound that was exceeded.
    pub bound: Duration,
}

/// Open-connection accounting shared between a listener, its accepted
/// streams, and whoever coordinates shutdown.
///
/// Lifecycle: `Accepting → DrainRequested → Drained`, terminal. The
/// open count never goes negative: each decrement is the drop of a
/// stream whose construction did the increment.
#[derive(Debug)]
pub struct DrainState {
    open: AtomicU64,
    draining: AtomicBool,
    drained_tx: watch::Sender<bool>,
}

impl DrainState {
    pub fn new() -> Arc<Self> {
        let (drained_tx, _) = watch::channel(false);
        Arc::new(Self {
            open: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            drained_tx,
        })
    }

    /// Number of currently open tracked connections.
    pub fn open_connections(&self) -> u64 {
        self.open.load(Ordering::SeqCst)
    }

    /// Whether a drain has been requested.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub(crate) fn track(&self) {
        self.open.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        let remaining = self.open.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 && self.draining.load(Ordering::SeqCst) {
            let _ = self.drained_tx.send(true);
        }
    }

    /// Mark the drain as requested. Fires the drained signal right away
    /// if nothing is open.
    pub fn request_drain(&self) {
        self.draining.store(true, Ordering::SeqCst);
        if self.open.load(Ordering::SeqCst) == 0 {
            let _ = self.drained_tx.send(true);
        }
    }

    /// Wait for the drained signal, up to `bound`.
    pub async fn wait_drained(&self, bound: Duration) -> Result<(), DrainTimeoutError> {
        let mut rx = self.drained_tx.subscribe();
        let drained = async move {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    return;
                }
            }
        };

        tokio::time::timeout(bound, drained)
            .await
            .map_err(|_| DrainTimeoutError { bound })
    }
}

/// Wraps a bound TCP listener with open-connection tracking so shutdown
/// can drain in-flight connections instead of severing them.
#[derive(Debug)]
pub struct GracefulListener {
    inner: TcpListener,
    state: Arc<DrainState>,
    max_drain_wait: Duration,
}

impl GracefulListener {
    /// Wrap an already-bound listener, sharing the given drain state.
    pub fn new(inner: TcpListener, state: Arc<DrainState>, max_drain_wait: Duration) -> Self {
        Self {
            inner,
            state,
            max_drain_wait,
        }
    }

    /// Bind to `addr` with a fresh drain state.
    pub async fn bind(addr: SocketAddr, max_drain_wait: Duration) -> io::Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        tracing::info!(address = %inner.local_addr()?, "Listener bound");
        Ok(Self::new(inner, DrainState::new(), max_drain_wait))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Handle to the shared drain state.
    pub fn drain_state(&self) -> Arc<DrainState> {
        Arc::clone(&self.state)
    }

    /// Accept the next connection and start tracking it.
    ///
    /// Errors are returned to the caller for logging; the caller's
    /// accept loop is expected to continue.
    pub async fn accept(&self) -> io::Result<TrackedStream> {
        let (stream, peer_addr) = self.inner.accept().await?;
        let tracked = TrackedStream::new(stream, Arc::clone(&self.state));
        tracing::debug!(
            peer_addr = %peer_addr,
            connection_id = %tracked.id(),
            open_connections = self.state.open_connections(),
            "Connection accepted"
        );
        Ok(tracked)
    }

    /// Stop accepting and drain.
    ///
    /// Consuming `self` drops the socket first, so no connection can be
    /// accepted once the drain is requested, and a second close cannot
    /// be expressed. Returns as soon as every tracked connection has
    /// closed, or [`DrainTimeoutError`] after `max_drain_wait`.
    pub async fn close(self) -> Result<(), DrainTimeoutError> {
        let Self {
            inner,
            state,
            max_drain_wait,
        } = self;
        drop(inner);

        state.request_drain();
        state.wait_drained(max_drain_wait).await
    }
}
