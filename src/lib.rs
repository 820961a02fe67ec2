//! Circuit breakers for unreliable external dependencies.
//!
//! A [`CircuitBreakerManager`] hands out one named [`CircuitBreaker`] per
//! dependency (broker API, market data, database, cache, notifications).
//! Callers send their I/O through `execute`; once a dependency keeps
//! failing its circuit opens and calls fail fast until a probe succeeds.

pub mod adapters;
pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use lifecycle::Shutdown;
pub use resilience::{
    CallContext, CircuitBreaker, CircuitBreakerManager, CircuitError, CircuitEvent, CircuitState,
};
