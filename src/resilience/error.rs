//! Errors returned by protected calls.

use std::time::Duration;

use thiserror::Error;

/// Outcome of a call that did not produce a value.
///
/// `Open` and `Timeout` are generated by the circuit itself. `Operation`
/// carries the wrapped operation's own error untouched.
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// The call was short-circuited; the operation was not invoked.
    #[error("circuit '{circuit}' is open")]
    Open {
        circuit: String,
        /// Time left until the next probe is admitted, if known.
        retry_after: Option<Duration>,
    },

    /// The operation did not settle within the per-call timeout.
    #[error("call through circuit '{circuit}' timed out after {timeout:?}")]
    Timeout { circuit: String, timeout: Duration },

    /// The operation failed on its own.
    #[error("{0}")]
    Operation(E),

    /// The operation task panicked or was aborted before settling.
    #[error("call through circuit '{circuit}' was aborted")]
    Aborted { circuit: String },
}

impl<E> CircuitError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitError::Timeout { .. })
    }

    /// The operation's own error, if that is what failed.
    pub fn into_operation(self) -> Option<E> {
        match self {
            CircuitError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Borrowing variant of [`CircuitError::into_operation`].
    pub fn operation(&self) -> Option<&E> {
        match self {
            CircuitError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: CircuitError<String> = CircuitError::Open {
            circuit: "database".into(),
            retry_after: None,
        };
        assert_eq!(err.to_string(), "circuit 'database' is open");
        assert!(err.is_open());

        let err: CircuitError<String> = CircuitError::Operation("connection refused".into());
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.into_operation().as_deref(), Some("connection refused"));
    }
}
