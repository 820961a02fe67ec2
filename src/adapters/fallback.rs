//! Fallback helpers for short-circuited calls.
//!
//! Every caller of a circuit needs an answer for [`CircuitError::Open`].
//! These helpers cover the two common ones: a computed substitute and the
//! last value that was fetched successfully.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use crate::resilience::{CallContext, CircuitBreaker, CircuitError};

/// Where a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served<T> {
    /// Produced by the protected operation.
    Fresh(T),
    /// Substituted because the dependency was unavailable.
    Fallback(T),
}

impl<T> Served<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Served::Fallback(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Served::Fresh(value) | Served::Fallback(value) => value,
        }
    }
}

/// Run `operation` through `circuit`, substituting `fallback()` when the
/// call is short-circuited. Every other error is returned as is.
pub async fn execute_with_fallback<F, Fut, T, E, G>(
    circuit: &CircuitBreaker,
    operation: F,
    context: CallContext,
    fallback: G,
) -> Result<Served<T>, CircuitError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    G: FnOnce() -> T,
{
    match circuit.execute(operation, context).await {
        Ok(value) => Ok(Served::Fresh(value)),
        Err(e) if e.is_open() => Ok(Served::Fallback(fallback())),
        Err(e) => Err(e),
    }
}

/// Remembers the last successful value and serves it while the
/// dependency is short-circuited or timing out.
#[derive(Debug)]
pub struct LastKnownGood<T> {
    circuit: CircuitBreaker,
    value: Mutex<Option<T>>,
}

impl<T> LastKnownGood<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(circuit: CircuitBreaker) -> Self {
        Self {
            circuit,
            value: Mutex::new(None),
        }
    }

    /// Last successfully fetched value, if any.
    pub fn cached(&self) -> Option<T> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch through the circuit; on open or timeout fall back to the cached
    /// value when there is one. The operation's own errors always propagate.
    pub async fn fetch<F, Fut, E>(
        &self,
        operation: F,
        context: CallContext,
    ) -> Result<Served<T>, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Send + 'static,
    {
        match self.circuit.execute(operation, context).await {
            Ok(value) => {
                *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
                Ok(Served::Fresh(value))
            }
            Err(e) if e.is_open() || e.is_timeout() => match self.cached() {
                Some(stale) => {
                    tracing::debug!(circuit = %self.circuit.name(), error = %DisplayKind(&e), "Serving last known good value");
                    Ok(Served::Fallback(stale))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

/// Formats only the circuit-generated part of an error, so `E` needs no `Display`.
struct DisplayKind<'a, E>(&'a CircuitError<E>);

impl<E> std::fmt::Display for DisplayKind<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            CircuitError::Open { .. } => f.write_str("open"),
            CircuitError::Timeout { .. } => f.write_str("timeout"),
            CircuitError::Operation(_) => f.write_str("operation"),
            CircuitError::Aborted { .. } => f.write_str("aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitConfig;
    use std::time::Duration;

    fn circuit() -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitConfig::named("market_data")
                .with_failure_threshold(1)
                .with_recovery_timeout(Duration::from_secs(30))
                .with_timeout(Duration::from_millis(100)),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_only_when_open() {
        let cb = circuit();

        let err = execute_with_fallback(&cb, || async { Err::<u32, _>("down") }, CallContext::new(), || 0)
            .await
            .unwrap_err();
        assert_eq!(err.into_operation(), Some("down"));

        let served = execute_with_fallback(&cb, || async { Ok::<u32, &str>(5) }, CallContext::new(), || 0)
            .await
            .unwrap();
        assert_eq!(served, Served::Fallback(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_known_good_serves_stale_value() {
        let quotes = LastKnownGood::new(circuit());
        assert!(quotes.cached().is_none());

        let fresh = quotes
            .fetch(|| async { Ok::<_, String>(101.5_f64) }, CallContext::new())
            .await
            .unwrap();
        assert_eq!(fresh, Served::Fresh(101.5));

        quotes
            .fetch(|| async { Err::<f64, _>("feed down".to_string()) }, CallContext::new())
            .await
            .unwrap_err();

        let stale = quotes
            .fetch(|| async { Ok::<_, String>(99.0) }, CallContext::new())
            .await
            .unwrap();
        assert!(stale.is_fallback());
        assert_eq!(stale.into_inner(), 101.5);
    }
}
