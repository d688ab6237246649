//! Exponential-backoff retry combinators.
//!
//! [`retry`] wraps any fallible async operation in the attempt loop
//! described by a [`RetryConfig`]. The combinator never alters the error
//! type: whatever the final attempt produced is what the caller sees.

use std::future::Future;

use tracing::warn;

use crate::config::RetryConfig;

/// Runs `op` up to `config.max_attempts` times, sleeping between attempts.
///
/// The sleep after attempt `n` is `initial_delay * multiplier^(n-1)`,
/// capped at `max_delay`. Sleeping is a suspension point
/// (`tokio::time::sleep`), so concurrent operations on the same runtime
/// keep making progress. The final failure is returned unchanged.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, op: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(config, |_| true, op).await
}

/// Like [`retry`], but `should_retry` can mark an error fatal.
///
/// When the predicate returns `false` the error is returned immediately
/// without consuming further attempts. Used to keep the retry budget per
/// logical network call: a token refresh that already exhausted its own
/// retries must not be multiplied by the retry loop of the resource fetch
/// it was triggered from.
pub async fn retry_if<T, E, P, F, Fut>(config: &RetryConfig, should_retry: P, op: F) -> Result<T, E>
where
    P: Fn(&E) -> bool,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "operation failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
