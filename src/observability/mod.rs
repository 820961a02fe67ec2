//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Circuits produce:
//!     → logging.rs (structured log events, event logger task)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields, circuit name on every line
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
