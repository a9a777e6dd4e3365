//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff. Atomic writes retry without jitter
//! so the delays stay predictable: with the defaults, 200ms then 400ms.

use backon::ExponentialBuilder;

use crate::config::RetryConfig;
use crate::storage::StorageError;

/// Backoff for atomic event writes.
///
/// `max_attempts` counts the first attempt, so the builder allows
/// `max_attempts - 1` retries. The n-th retry waits `base * 2^n`.
/// Exhaustion surfaces right after the last failure, without a trailing wait.
pub fn write_backoff(config: &RetryConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(config.first_backoff())
        .with_max_delay(config.max_backoff())
        .with_factor(2.0)
        .with_max_times(config.max_attempts.saturating_sub(1) as usize)
}

/// Determines if a failed write may succeed on a later attempt.
///
/// Retryable:
/// - `Transaction`: the store rejected or could not commit the transaction
///
/// Non-retryable:
/// - `InvalidRequest`: the rows themselves are malformed and will never succeed
pub fn is_retryable_write(err: &StorageError) -> bool {
    err.is_retryable()
}
