//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ceilings and timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("fetch.failure_marker must not contain a newline")]
    MultilineMarker,

    #[error("fetch.timeout_secs ({fetch}) must be less than timeouts.request_secs ({request})")]
    FetchOutlivesRequest { fetch: u64, request: u64 },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if config.listener.max_in_flight == 0 {
        errors.push(ValidationError::Zero("listener.max_in_flight"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }
    if config.fetch.timeout_secs == 0 {
        errors.push(ValidationError::Zero("fetch.timeout_secs"));
    }
    if config.fetch.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("fetch.connect_timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    // The outer timeout answers 408 and discards finished fetches, so the
    // fetch deadline has to expire first.
    if config.fetch.timeout_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::FetchOutlivesRequest {
            fetch: config.fetch.timeout_secs,
            request: config.timeouts.request_secs,
        });
    }
    if let Some(marker) = &config.fetch.failure_marker {
        if marker.contains('\n') {
            errors.push(ValidationError::MultilineMarker);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
