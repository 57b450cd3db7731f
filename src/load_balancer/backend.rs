//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single configured upstream address
//! - Track currently active transfers (RAII guard)
//! - Accumulate lifetime connection and throughput totals

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A single upstream server the balancer may forward connections to.
///
/// The address is immutable after load; every counter is mutated
/// concurrently by the transfers routed here, so all of them are atomic.
#[derive(Debug)]
pub struct Backend {
    address: String,
    total_connections: AtomicU64,
    total_rx: AtomicU64,
    total_tx: AtomicU64,
    active_transfers: AtomicUsize,
}

impl Backend {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            total_connections: AtomicU64::new(0),
            total_rx: AtomicU64::new(0),
            total_tx: AtomicU64::new(0),
            active_transfers: AtomicUsize::new(0),
        }
    }

    /// The `host:port` this backend is dialed on.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Register a transfer routed to this backend. The returned guard
    /// keeps the active count accurate even if the transfer task bails
    /// out early.
    pub fn begin_transfer(self: &Arc<Self>) -> TransferGuard {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_transfers.fetch_add(1, Ordering::Relaxed);
        TransferGuard {
            backend: Arc::clone(self),
        }
    }

    /// Fold one finished connection's totals into the aggregates:
    /// `rx` is what the client sent this backend, `tx` what the backend
    /// sent back.
    pub fn record_throughput(&self, rx: u64, tx: u64) {
        self.total_rx.fetch_add(rx, Ordering::Relaxed);
        self.total_tx.fetch_add(tx, Ordering::Relaxed);
    }

    /// Connections ever routed to this backend.
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Lifetime bytes received from clients for this backend.
    pub fn total_rx(&self) -> u64 {
        self.total_rx.load(Ordering::Relaxed)
    }

    /// Lifetime bytes sent back to clients from this backend.
    pub fn total_tx(&self) -> u64 {
        self.total_tx.load(Ordering::Relaxed)
    }

    /// Transfers currently in flight to this backend.
    pub fn active_transfers(&self) -> usize {
        self.active_transfers.load(Ordering::Relaxed)
    }
}

/// RAII guard for one in-flight transfer.
/// Decrements the backend's active count when dropped.
#[derive(Debug)]
pub struct TransferGuard {
    backend: Arc<Backend>,
}

impl Deref for TransferGuard {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.backend.active_transfers.fetch_sub(1, Ordering::Relaxed);
    }
}
