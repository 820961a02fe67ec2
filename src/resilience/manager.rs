//! Circuit registry.
//!
//! # Responsibilities
//! - Create circuits lazily by name, exactly once per name
//! - Look up circuits without creating them (admin surface)
//! - Aggregate health and statistics across circuits
//! - Forward every circuit's events onto one channel
//!
//! # Design Decisions
//! - Explicit value owned by the entry point and passed to whoever needs it; no global
//! - `DashMap` entry API makes first creation race-free
//! - In-memory only; a restart starts with fresh circuits

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::validation::validate_circuit;
use crate::config::{CircuitConfig, CircuitDefaults, ConfigError, ServiceConfig};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitMetrics, HealthStatus};
use crate::resilience::events::{CircuitEvent, EVENT_CHANNEL_CAPACITY};

/// Totals across every registered circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_circuits: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub timeout_requests: u64,
    pub overall_failure_rate: f64,
}

impl StatsSummary {
    /// Totals over one set of per-circuit snapshots.
    pub fn from_metrics<'a>(metrics: impl IntoIterator<Item = &'a CircuitMetrics>) -> Self {
        let mut summary = StatsSummary::default();
        for m in metrics {
            summary.total_circuits += 1;
            summary.total_requests += m.total_requests;
            summary.successful_requests += m.successful_requests;
            summary.failed_requests += m.failed_requests;
            summary.timeout_requests += m.timeout_requests;
        }
        if summary.total_requests > 0 {
            summary.overall_failure_rate =
                summary.failed_requests as f64 / summary.total_requests as f64;
        }
        summary
    }
}

#[derive(Debug)]
struct ManagerInner {
    circuits: DashMap<String, CircuitBreaker>,
    /// Settings for names that have a dedicated entry in the config file.
    presets: HashMap<String, CircuitConfig>,
    defaults: CircuitDefaults,
    events: broadcast::Sender<CircuitEvent>,
}

/// Registry of named circuits. Cloning shares the registry.
#[derive(Debug, Clone)]
pub struct CircuitBreakerManager {
    inner: Arc<ManagerInner>,
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new(CircuitDefaults::default())
    }
}

impl CircuitBreakerManager {
    /// Create an empty registry using `defaults` for on-demand circuits.
    pub fn new(defaults: CircuitDefaults) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ManagerInner {
                circuits: DashMap::new(),
                presets: HashMap::new(),
                defaults,
                events,
            }),
        }
    }

    /// Create a registry from the service config and register every
    /// configured circuit up front.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let presets = config
            .circuits
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect();

        let manager = Self {
            inner: Arc::new(ManagerInner {
                circuits: DashMap::new(),
                presets,
                defaults: config.defaults.clone(),
                events,
            }),
        };
        for circuit in &config.circuits {
            manager.get_circuit(&circuit.name, None)?;
        }

        tracing::info!(circuits = config.circuits.len(), "Circuit registry initialized");
        Ok(manager)
    }

    /// Return the circuit for `name`, creating it if absent.
    ///
    /// `config` is only used on creation; an existing circuit keeps its
    /// original settings. Without `config`, a preset from the service
    /// configuration or the default template applies.
    pub fn get_circuit(
        &self,
        name: &str,
        config: Option<CircuitConfig>,
    ) -> Result<CircuitBreaker, ConfigError> {
        if let Some(existing) = self.inner.circuits.get(name) {
            return Ok(existing.value().clone());
        }

        let mut config = config
            .or_else(|| self.inner.presets.get(name).cloned())
            .unwrap_or_else(|| self.inner.defaults.for_circuit(name));
        config.name = name.to_string();
        validate_circuit(&config).map_err(ConfigError::Validation)?;

        let forward = self.inner.events.clone();
        let entry = self
            .inner
            .circuits
            .entry(name.to_string())
            .or_try_insert_with(|| {
                tracing::info!(
                    circuit = %name,
                    failure_threshold = config.failure_threshold,
                    recovery_timeout_ms = config.recovery_timeout_ms,
                    timeout_ms = config.timeout_ms,
                    "Circuit created"
                );
                CircuitBreaker::with_forwarding(config, Some(forward))
            })?;
        Ok(entry.value().clone())
    }

    /// Look up a circuit without creating it.
    pub fn get_circuit_by_name(&self, name: &str) -> Option<CircuitBreaker> {
        self.inner.circuits.get(name).map(|c| c.value().clone())
    }

    /// Registered circuit names, sorted.
    pub fn circuit_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.circuits.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }

    /// Health of every circuit, keyed by name.
    pub fn health_status(&self) -> BTreeMap<String, HealthStatus> {
        self.inner
            .circuits
            .iter()
            .map(|c| (c.key().clone(), c.value().health_status()))
            .collect()
    }

    /// Metrics snapshot of every circuit, keyed by name.
    pub fn statistics(&self) -> BTreeMap<String, CircuitMetrics> {
        self.inner
            .circuits
            .iter()
            .map(|c| (c.key().clone(), c.value().metrics()))
            .collect()
    }

    /// True when no circuit is open.
    pub fn is_healthy(&self) -> bool {
        self.health_status().values().all(|h| h.healthy)
    }

    /// Metrics and health of every circuit, each pair read under one lock.
    pub fn snapshots(&self) -> BTreeMap<String, (CircuitMetrics, HealthStatus)> {
        self.inner
            .circuits
            .iter()
            .map(|c| (c.key().clone(), c.value().snapshot()))
            .collect()
    }

    /// Aggregate counters across all circuits.
    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from_metrics(self.statistics().values())
    }

    /// Subscribe to events from every circuit in the registry.
    pub fn subscribe(&self) -> broadcast::Receiver<CircuitEvent> {
        self.inner.events.subscribe()
    }
}
