//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Connection accepted
//!     → registry.rs (atomic round-robin cursor → Backend)
//!     → balancer.rs (dial backend, spawn transfer task)
//!     → backend.rs (active-transfer guard, aggregate counters)
//!     → transfer finished → counters folded into the backend
//! ```
//!
//! # Design Decisions
//! - The registry is immutable after load; no hot reload while listening
//! - Cursor advance is a single fetch_add: concurrent accepts can never
//!   observe the same index or lose an update
//! - Per-connection failures (dial, transfer) stay inside that
//!   connection's task and never stop the accept loop

pub mod backend;
pub mod balancer;
pub mod registry;

pub use backend::Backend;
pub use balancer::{BalancerError, LoadBalancer};
pub use registry::BackendRegistry;
