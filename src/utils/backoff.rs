//! Exponential backoff schedules for retry operations.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Backoff schedule yielding at most `max_retries` delays.
///
/// Delays start at 200ms, double each retry and are capped at 5s:
/// 200ms, 400ms, 800ms, ...
///
/// # Arguments
/// * `max_retries` - Number of retries after the first attempt
pub fn retry_schedule(max_retries: usize) -> impl Iterator<Item = Duration> {
    // base^n * factor: 2 * 100 = 200ms, 4 * 100 = 400ms, ...
    ExponentialBackoff::from_millis(2)
        .factor(STARTING_BACKOFF_DELAY_MS / 2)
        .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
        .take(max_retries)
}

/// Sleeps for the delay of the given 0-based retry attempt and returns the next attempt number.
pub async fn exponential_backoff_with_delay(attempt: u32) -> u32 {
    let delay = STARTING_BACKOFF_DELAY_MS
        .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
        .min(MAX_BACKOFF_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(delay)).await;
    attempt.saturating_add(1)
}
