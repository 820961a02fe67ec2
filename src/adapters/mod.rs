//! Protected-call adapters.
//!
//! Thin call sites that take a circuit from the manager and send real I/O
//! through `execute`. Each one decides what a failure looks like for its
//! transport; the fallback on an open circuit is always the caller's.

pub mod fallback;
pub mod http_client;
pub mod middleware;

pub use fallback::{execute_with_fallback, LastKnownGood, Served};
pub use http_client::{ProtectedClient, UpstreamError};
pub use middleware::{circuit_breaker_middleware, CircuitGuard};
