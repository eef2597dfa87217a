//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate header names and values used for rewriting
//! - Validate value ranges (rate limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayOptions → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::GatewayOptions;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid header name {name:?}")]
    InvalidHeaderName { field: &'static str, name: String },

    #[error("access.set_headers: invalid value for header {name:?}")]
    InvalidHeaderValue { name: String },

    #[error("rate_limit.{field} must be greater than zero when rate limiting is enabled")]
    ZeroRateLimit { field: &'static str },

    #[error("listener.tls.{field} must not be empty")]
    EmptyTlsPath { field: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(options: &GatewayOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &options.listener.bind_address);
    if options.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &options.observability.metrics_address,
        );
    }

    if let Some(names) = options.access.require_header.as_ref().and_then(|r| r.normalized()) {
        for name in &names {
            check_header_name(&mut errors, "access.require_header", name);
        }
    }
    for name in &options.access.remove_headers {
        check_header_name(&mut errors, "access.remove_headers", name);
    }
    for (name, value) in &options.access.set_headers {
        check_header_name(&mut errors, "access.set_headers", name);
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue { name: name.clone() });
        }
    }

    if options.rate_limit.enabled {
        if options.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::ZeroRateLimit { field: "requests_per_second" });
        }
        if options.rate_limit.burst_size == 0 {
            errors.push(ValidationError::ZeroRateLimit { field: "burst_size" });
        }
    }

    if let Some(tls) = &options.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "cert_path" });
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "key_path" });
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

fn check_header_name(errors: &mut Vec<ValidationError>, field: &'static str, name: &str) {
    if HeaderName::from_bytes(name.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName {
            field,
            name: name.to_string(),
        });
    }
}
