//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → CLI flags may override individual fields; the merged result
//!       is validated again before the balancer sees it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks and
//!   reports every violation, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::BackendConfig;
pub use schema::BalancerConfig;
pub use schema::ListenerConfig;
