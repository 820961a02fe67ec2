//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → manager.rs (look up or create the named circuit)
//!     → circuit_breaker.rs (fail fast, or admit and track the outcome)
//!     → timeouts.rs (race the operation against its deadline)
//!     → events.rs (announce state transitions)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every protected call has a deadline
//! - No retries here; callers own retry and fallback policy
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod error;
pub mod events;
pub mod manager;
pub(crate) mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitMetrics, CircuitState, HealthStatus};
pub use error::CircuitError;
pub use events::{CallContext, CircuitEvent};
pub use manager::{CircuitBreakerManager, StatsSummary};
