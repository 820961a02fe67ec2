//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, timeouts > 0)
//! - Detect duplicate circuit names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{CircuitConfig, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("circuit name must not be empty")]
    EmptyName,

    #[error("duplicate circuit name '{0}'")]
    DuplicateName(String),

    #[error("circuit '{circuit}': {field} must be at least 1")]
    ZeroThreshold { circuit: String, field: &'static str },

    #[error("circuit '{circuit}': {field} must be greater than 0")]
    ZeroDuration { circuit: String, field: &'static str },

    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate one circuit's settings.
pub fn validate_circuit(config: &CircuitConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_circuit(config, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the whole service configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "admin.bind_address",
            value: config.admin.bind_address.clone(),
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

    check_circuit(&config.defaults.for_circuit("defaults"), &mut errors);

    let mut seen = HashSet::new();
    for circuit in &config.circuits {
        if !seen.insert(circuit.name.as_str()) {
            errors.push(ValidationError::DuplicateName(circuit.name.clone()));
        }
        check_circuit(circuit, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_circuit(config: &CircuitConfig, errors: &mut Vec<ValidationError>) {
    if config.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    let thresholds = [
        ("failure_threshold", config.failure_threshold),
        ("success_threshold", config.success_threshold),
        ("half_open_max_probes", config.half_open_max_probes),
    ];
    for (field, value) in thresholds {
        if value == 0 {
            errors.push(ValidationError::ZeroThreshold {
                circuit: config.name.clone(),
                field,
            });
        }
    }

    let durations = [
        ("recovery_timeout_ms", config.recovery_timeout_ms),
        ("timeout_ms", config.timeout_ms),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration {
                circuit: config.name.clone(),
                field,
            });
        }
    }
}
