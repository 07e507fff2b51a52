//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryOptions;

/// Calculate exponential backoff delay with jitter.
///
/// The cap applies before jitter, so the result stays within 110% of `max_ms`.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay before throttling retry number `attempt` (1-based).
///
/// The service's retry-after wins, then the configured fixed interval, then
/// exponential backoff.
pub fn throttle_delay(attempt: u32, retry_after: Option<Duration>, options: &RetryOptions) -> Duration {
    if let Some(delay) = retry_after {
        return delay;
    }
    if let Some(fixed_ms) = options.fixed_retry_interval_ms {
        return Duration::from_millis(fixed_ms);
    }
    calculate_backoff(attempt, options.base_backoff_ms, options.max_backoff_ms)
}
