//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (non-zero port)
//! - Check the backend list is usable (non-empty, addresses dialable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::BalancerConfig;

/// A single semantic violation in the configuration.
#[derive(Debug)]
pub enum ValidationError {
    /// The listen port is zero.
    InvalidPort,
    /// No backend was configured.
    NoBackends,
    /// A backend address is empty or missing its port.
    BadBackendAddress { index: usize, address: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidPort => write!(f, "a port != 0 must be specified"),
            ValidationError::NoBackends => {
                write!(f, "must specify at least one backend address")
            }
            ValidationError::BadBackendAddress { index, address } => write!(
                f,
                "backend {} has an invalid address {:?} (expected host:port)",
                index, address
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate the whole configuration, collecting every violation.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    for (index, backend) in config.backends.iter().enumerate() {
        let address = backend.address.trim();
        if address.is_empty() || !address.contains(':') {
            errors.push(ValidationError::BadBackendAddress {
                index,
                address: backend.address.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
