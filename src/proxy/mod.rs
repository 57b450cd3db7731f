//! Byte relay subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection + dialed backend
//!     → transfer.rs (ProxyTransfer over the two streams)
//!         → one copy loop per direction, run concurrently
//!         → stats.rs (per-direction rx/tx counters)
//!     → either loop ends (EOF, error, idle timeout)
//!         → cross-termination: the other loop is interrupted
//!     → both streams closed, stats final
//! ```
//!
//! # Design Decisions
//! - The relay is a pure byte pipe; payload is never inspected
//! - Generic over any AsyncRead + AsyncWrite stream (TLS or plain)
//! - Errors caused by the relay tearing itself down are not failures

pub mod stats;
pub mod transfer;

pub use stats::ThroughputStats;
pub use transfer::ProxyTransfer;
