//! Client configuration: retry behavior and the token reset policy.

use std::time::Duration;

/// Configuration for retry behavior on failed network calls.
///
/// Every network call the SDK makes (the authorization POST and the
/// resource GET) is wrapped in the same exponential-backoff retry loop.
///
/// ## Default Values
///
/// - `max_attempts`: 3 (total attempts, including the first)
/// - `initial_delay`: 1s
/// - `multiplier`: 2.0
/// - `max_delay`: 30s
///
/// ## Example
///
/// ```rust
/// use bunkerhill_inference::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::new()
///     .with_max_attempts(5)
///     .with_initial_delay(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the initial one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Multiplier for exponential backoff.
    pub multiplier: f64,

    /// Maximum delay between attempts.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total number of attempts (including the first).
    ///
    /// Clamped to at least 1.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the exponential backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the maximum delay between attempts.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculates the delay to sleep after a given failed attempt.
    ///
    /// Attempt numbers are 1-based: after attempt `n` fails, the loop
    /// sleeps `initial_delay * multiplier^(n-1)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay =
            self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32 - 1);
        let capped = base_delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Policy deciding when a failed request forces re-authentication.
///
/// The failure counter increases by one on every failed authenticated
/// request and resets to zero on success. Both policies clear the held
/// token when the running count lands on residue 1 modulo the failure
/// threshold (counts 1, 4, 7, ... for the default threshold of 3) — not on
/// every Nth failure uniformly. The upstream service's client drafts
/// disagree on whether an already-expired token should also force a clear,
/// so that combination is configuration rather than a hard-coded rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenResetPolicy {
    /// Clear when the token is no longer valid OR the count lands on
    /// residue 1.
    #[default]
    InvalidOrModulo,

    /// Clear only when the count lands on residue 1.
    ModuloOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.multiplier, 2.0);
    }

    #[test]
    fn test_builder() {
        let config = RetryConfig::new()
            .with_max_attempts(5)
            .with_initial_delay(Duration::from_millis(200))
            .with_multiplier(3.0)
            .with_max_delay(Duration::from_secs(60));

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay, Duration::from_millis(200));
        assert_eq!(config.multiplier, 3.0);
        assert_eq!(config.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_max_attempts_clamped_to_one() {
        let config = RetryConfig::new().with_max_attempts(0);
        assert_eq!(config.max_attempts, 1);
    }

    #[test_case::test_case(0, 0; "before any retry")]
    #[test_case::test_case(1, 1; "after first attempt")]
    #[test_case::test_case(2, 2; "after second attempt")]
    #[test_case::test_case(3, 4; "after third attempt")]
    fn test_delay_for_attempt(attempt: u32, expected_secs: u64) {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(attempt), Duration::from_secs(expected_secs));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_multiplier(10.0)
            .with_max_delay(Duration::from_secs(5));

        assert!(config.delay_for_attempt(10) <= Duration::from_secs(5));
    }

    #[test]
    fn test_token_reset_policy_default() {
        assert_eq!(TokenResetPolicy::default(), TokenResetPolicy::InvalidOrModulo);
    }
}
