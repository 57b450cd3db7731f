//! Layer-4 TCP load balancer with graceful drain.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────┐
//!                       │               TCP BALANCER               │
//!                       │                                          │
//!  Client connection    │  ┌──────────┐     ┌───────────────────┐  │
//!  ─────────────────────┼─▶│   net    │────▶│   load_balancer   │  │
//!                       │  │ graceful │     │  round-robin +    │  │
//!                       │  │ listener │     │  dispatch loop    │  │
//!                       │  └──────────┘     └─────────┬─────────┘  │
//!                       │                             │            │
//!                       │                             ▼            │
//!  Client bytes         │  ┌──────────────────────────────────┐    │     Backend
//!  ◀────────────────────┼──│  proxy transfer (two copy loops, │◀───┼──── server
//!  ─────────────────────┼─▶│  cross-termination, throughput)  │────┼───▶
//!                       │  └──────────────────────────────────┘    │
//!                       │                                          │
//!                       │  ┌────────────────────────────────────┐  │
//!                       │  │        Cross-Cutting Concerns       │ │
//!                       │  │  config    lifecycle   observability │ │
//!                       │  └────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────┘
//! ```
//!
//! The relay never inspects payload: it is a byte-for-byte pipe over
//! any bidirectional stream. Shutdown stops accepting, then drains
//! in-flight connections up to a configurable bound instead of
//! severing them.

// Core subsystems
pub mod config;
pub mod net;
pub mod proxy;

// Traffic management
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::BalancerConfig;
pub use load_balancer::balancer::{BalancerError, LoadBalancer};
pub use net::listener::GracefulListener;
pub use proxy::transfer::ProxyTransfer;
