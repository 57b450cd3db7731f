//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse flags → Load config → Init logging → load() → listen()
//!
//! Shutdown (shutdown.rs):
//!     Signal received → trigger → stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful stop
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - The drain has a timeout; remaining connections are reported to the
//!   caller rather than killed

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
