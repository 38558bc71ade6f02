//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. It returns every
//! problem it finds, not only the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GateConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("auth.jwt_secret is required")]
    MissingSecret,

    #[error("auth.token_ttl_secs must be greater than zero")]
    ZeroTokenLifetime,

    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate_limit.cleanup_interval_ms must be greater than zero")]
    ZeroCleanupInterval,

    #[error("{field} is not a socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check a configuration before it is accepted into the system.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.jwt_secret.trim().is_empty() {
        errors.push(ValidationError::MissingSecret);
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTokenLifetime);
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }
    if config.rate_limit.cleanup_interval_ms == 0 {
        errors.push(ValidationError::ZeroCleanupInterval);
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
