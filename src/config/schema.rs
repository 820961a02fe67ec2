//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Administrative HTTP surface.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Template for circuits created without an explicit configuration.
    pub defaults: CircuitDefaults,

    /// Circuits registered at startup.
    pub circuits: Vec<CircuitConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
            defaults: CircuitDefaults::default(),
            circuits: default_circuits(),
        }
    }
}

/// Settings of a single circuit. Immutable once the circuit exists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CircuitConfig {
    /// Unique circuit identifier.
    pub name: String,

    /// Consecutive failures that trip a closed circuit.
    pub failure_threshold: u32,

    /// Time an open circuit waits before admitting a probe, in milliseconds.
    pub recovery_timeout_ms: u64,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Successful probes needed to close a half-open circuit.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// Probes allowed in flight at once while half-open.
    #[serde(default = "default_half_open_max_probes")]
    pub half_open_max_probes: u32,
}

fn default_success_threshold() -> u32 {
    1
}

fn default_half_open_max_probes() -> u32 {
    1
}

impl CircuitConfig {
    /// Build a config for `name` from the default template.
    pub fn named(name: impl Into<String>) -> Self {
        CircuitDefaults::default().for_circuit(name)
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_recovery_timeout(mut self, recovery: Duration) -> Self {
        self.recovery_timeout_ms = recovery.as_millis() as u64;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_half_open_max_probes(mut self, probes: u32) -> Self {
        self.half_open_max_probes = probes;
        self
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CircuitConfig {
    fn default() -> Self {
        CircuitDefaults::default().for_circuit("default")
    }
}

/// Default circuit settings, applied to circuits created on demand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitDefaults {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub timeout_ms: u64,
    pub success_threshold: u32,
    pub half_open_max_probes: u32,
}

impl Default for CircuitDefaults {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            timeout_ms: 30_000,
            success_threshold: 1,
            half_open_max_probes: 1,
        }
    }
}

impl CircuitDefaults {
    pub fn for_circuit(&self, name: impl Into<String>) -> CircuitConfig {
        CircuitConfig {
            name: name.into(),
            failure_threshold: self.failure_threshold,
            recovery_timeout_ms: self.recovery_timeout_ms,
            timeout_ms: self.timeout_ms,
            success_threshold: self.success_threshold,
            half_open_max_probes: self.half_open_max_probes,
        }
    }
}

/// Presets for the dependencies a trading process talks to.
fn default_circuits() -> Vec<CircuitConfig> {
    vec![
        CircuitConfig {
            name: "broker_api".to_string(),
            failure_threshold: 3,
            recovery_timeout_ms: 30_000,
            timeout_ms: 10_000,
            success_threshold: 1,
            half_open_max_probes: 1,
        },
        CircuitConfig {
            name: "market_data".to_string(),
            failure_threshold: 5,
            recovery_timeout_ms: 15_000,
            timeout_ms: 5_000,
            success_threshold: 1,
            half_open_max_probes: 1,
        },
        CircuitConfig {
            name: "database".to_string(),
            failure_threshold: 5,
            recovery_timeout_ms: 10_000,
            timeout_ms: 5_000,
            success_threshold: 2,
            half_open_max_probes: 1,
        },
        CircuitConfig {
            name: "cache".to_string(),
            failure_threshold: 10,
            recovery_timeout_ms: 5_000,
            timeout_ms: 1_000,
            success_threshold: 1,
            half_open_max_probes: 1,
        },
        CircuitConfig {
            name: "notifications".to_string(),
            failure_threshold: 3,
            recovery_timeout_ms: 60_000,
            timeout_ms: 10_000,
            success_threshold: 1,
            half_open_max_probes: 1,
        },
    ]
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin API bind address.
    pub bind_address: String,

    /// Bearer token required by `POST /control`. Unset means no auth.
    pub api_key: Option<String>,

    /// Request timeout for admin endpoints in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8081".to_string(),
            api_key: None,
            request_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_circuit_toml() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [[circuits]]
            name = "broker_api"
            failure_threshold = 3
            recovery_timeout_ms = 1000
            timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.circuits.len(), 1);
        let circuit = &config.circuits[0];
        assert_eq!(circuit.success_threshold, 1);
        assert_eq!(circuit.half_open_max_probes, 1);
        assert_eq!(circuit.recovery_timeout(), Duration::from_secs(1));
        assert_eq!(config.admin.bind_address, "127.0.0.1:8081");
    }

    #[test]
    fn test_default_presets() {
        let config = ServiceConfig::default();
        let names: Vec<_> = config.circuits.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["broker_api", "market_data", "database", "cache", "notifications"]
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = CircuitConfig::named("x")
            .with_failure_threshold(2)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.name, "x");
        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.recovery_timeout_ms, 60_000);
    }
}
