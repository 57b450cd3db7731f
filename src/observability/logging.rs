//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Configure log level from config and environment
//!
//! # Design Decisions
//! - Uses tracing for structured logging
//! - Pretty format when the debug toggle is on, compact otherwise
//! - RUST_LOG wins over the configured level when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Install the global subscriber. Call once, from the binary.
pub fn init(config: &ObservabilityConfig) {
    let default_directive = if config.debug {
        "tcp_balancer=debug".to_string()
    } else {
        format!("tcp_balancer={}", config.log_level)
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if config.debug {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
