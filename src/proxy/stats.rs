//! Per-direction throughput counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Byte counters for one direction of one proxied connection.
///
/// Written by exactly one copy loop; may be read concurrently for
/// reporting, so both counters are atomic.
#[derive(Debug, Default)]
pub struct ThroughputStats {
    /// Bytes read from the source stream.
    rx: AtomicU64,
    /// Bytes written to the destination stream.
    tx: AtomicU64,
}

impl ThroughputStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record bytes read from the source.
    pub fn add_rx(&self, n: u64) {
        self.rx.fetch_add(n, Ordering::Relaxed);
    }

    /// Record bytes written to the destination.
    pub fn add_tx(&self, n: u64) {
        self.tx.fetch_add(n, Ordering::Relaxed);
    }

    /// Bytes received so far.
    pub fn rx(&self) -> u64 {
        self.rx.load(Ordering::Relaxed)
    }

    /// Bytes transmitted so far.
    pub fn tx(&self) -> u64 {
        self.tx.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = ThroughputStats::new();
        assert_eq!(stats.rx(), 0);
        assert_eq!(stats.tx(), 0);

        stats.add_rx(100);
        stats.add_rx(24);
        stats.add_tx(124);

        assert_eq!(stats.rx(), 124);
        assert_eq!(stats.tx(), 124);
    }
}
