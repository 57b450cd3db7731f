//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, open-connection accounting)
//!     → connection.rs (tracked stream, id for tracing)
//!     → Hand off to the proxy transfer
//!
//! Shutdown:
//!     close() → stop accepting → drain wait → drained or timeout
//!
//! Listener states:
//!     Accepting → DrainRequested → Drained (terminal)
//! ```
//!
//! # Design Decisions
//! - Every accepted connection is counted; the count reaching zero
//!   after a drain request fires the drained signal exactly once
//! - Closing the listener consumes it, so a second close is
//!   unrepresentable
//! - The drained signal is a watch level, immune to double-fire

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, TrackedStream};
pub use listener::{DrainState, DrainTimeoutError, GracefulListener};
