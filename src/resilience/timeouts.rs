//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a spawned operation against the per-call deadline
//! - Distinguish completion, timeout and task failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Losing the race detaches the operation instead of aborting it
//! - A panicking operation is reported as its own outcome, not as a timeout

use std::time::Duration;

use tokio::task::JoinHandle;

/// How a raced operation settled.
#[derive(Debug)]
pub(crate) enum Settled<T, E> {
    Completed(Result<T, E>),
    TimedOut,
    Aborted,
}

/// Wait for `handle` for at most `deadline`.
///
/// Dropping a `JoinHandle` does not cancel its task, so an operation that
/// loses the race keeps running to completion in the background.
pub(crate) async fn race<T, E>(handle: JoinHandle<Result<T, E>>, deadline: Duration) -> Settled<T, E> {
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(outcome)) => Settled::Completed(outcome),
        Ok(Err(join_error)) => {
            tracing::error!(error = %join_error, "Protected operation task failed");
            Settled::Aborted
        }
        Err(_) => Settled::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_wins() {
        let handle = tokio::spawn(async { Ok::<_, ()>(7) });
        match race(handle, Duration::from_millis(100)).await {
            Settled::Completed(Ok(v)) => assert_eq!(v, 7),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ()>(())
        });
        assert!(matches!(race(handle, Duration::from_millis(100)).await, Settled::TimedOut));
    }

    #[tokio::test]
    async fn test_panicking_operation_is_aborted() {
        let handle = tokio::spawn(async {
            if true {
                panic!("boom");
            }
            Ok::<(), ()>(())
        });
        assert!(matches!(race(handle, Duration::from_secs(1)).await, Settled::Aborted));
    }
}
