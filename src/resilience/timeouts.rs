//! Deadline and cancellation composition.
//!
//! # Responsibilities
//! - Race an in-flight future against a per-attempt deadline and the
//!   caller's cancellation signal
//! - Report which of the two fired so callers can tell "you asked to stop"
//!   from "the server was too slow"
//! - Make inter-retry sleeps cancellable by the same signal
//!
//! # Design Decisions
//! - The caller's signal is polled first; a cancellation that is already
//!   visible always wins over the deadline
//! - Dropping the race drops the timer, so no timer outlives the attempt

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Which abort source ended the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aborted {
    ByCaller,
    Deadline(Duration),
}

/// Run `fut` until it completes, the deadline passes, or `signal` fires.
pub async fn run_with_deadline<F>(
    fut: F,
    timeout: Duration,
    signal: Option<&CancellationToken>,
) -> Result<F::Output, Aborted>
where
    F: Future,
{
    if signal.is_some_and(CancellationToken::is_cancelled) {
        return Err(Aborted::ByCaller);
    }

    tokio::select! {
        biased;
        _ = caller_cancelled(signal) => Err(Aborted::ByCaller),
        _ = tokio::time::sleep(timeout) => Err(Aborted::Deadline(timeout)),
        output = fut => Ok(output),
    }
}

/// Sleep for `delay` unless `signal` fires first.
pub async fn sleep_or_cancel(delay: Duration, signal: Option<&CancellationToken>) -> Result<(), Aborted> {
    if signal.is_some_and(CancellationToken::is_cancelled) {
        return Err(Aborted::ByCaller);
    }

    tokio::select! {
        biased;
        _ = caller_cancelled(signal) => Err(Aborted::ByCaller),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

async fn caller_cancelled(signal: Option<&CancellationToken>) {
    match signal {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let start = Instant::now();
        let result = run_with_deadline(
            std::future::pending::<()>(),
            Duration::from_millis(50),
            None,
        )
        .await;
        assert_eq!(result, Err(Aborted::Deadline(Duration::from_millis(50))));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_millis(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_cancel_wins() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = run_with_deadline(
            std::future::pending::<()>(),
            Duration::from_secs(5),
            Some(&token),
        )
        .await;
        assert_eq!(result, Err(Aborted::ByCaller));
    }

    #[tokio::test]
    async fn test_precancelled_never_polls_future() {
        let token = CancellationToken::new();
        token.cancel();
        let mut polled = false;
        let result = run_with_deadline(
            async {
                polled = true;
            },
            Duration::from_secs(1),
            Some(&token),
        )
        .await;
        assert_eq!(result, Err(Aborted::ByCaller));
        assert!(!polled);
    }

    #[tokio::test]
    async fn test_completion_passes_output_through() {
        let result = run_with_deadline(async { 7 }, Duration::from_secs(1), None).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_cancel() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });
        let start = Instant::now();
        let result = sleep_or_cancel(Duration::from_secs(10), Some(&token)).await;
        assert_eq!(result, Err(Aborted::ByCaller));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
