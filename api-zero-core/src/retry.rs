//! Retry with configurable backoff.
//!
//! Two pieces:
//! - [`RetryPolicy`]: Retry budget, base delay, [`Backoff`] mode and an
//!   optional retry predicate
//! - [`with_retry`]: Runs an async operation under a policy (or none)
//!
//! # Example
//!
//! ```ignore
//! use api_zero_core::{Backoff, RetryPolicy, with_retry};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new()
//!     .attempts(3)
//!     .delay(Duration::from_millis(100))
//!     .backoff(Backoff::Exponential)
//!     .retry_if(|err| err.is_5xx() || err.is_network_error());
//!
//! let response = with_retry(Some(&policy), || async { send().await }).await?;
//! ```
//!
//! # Retryable Errors
//!
//! Without a predicate every failure is retried until the budget runs out,
//! including HTTP errors. Supply [`RetryPolicy::retry_if`] to narrow that.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::ApiError;

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Default number of retries after the first attempt.
    pub const ATTEMPTS: u32 = 3;

    /// Default base delay.
    pub const DELAY: Duration = Duration::from_millis(1000);

    /// Default jitter factor. Zero keeps delays deterministic.
    pub const JITTER: f64 = 0.0;
}

/// Function of the retry number (1-based) to the wait before that retry.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Predicate over the last error deciding whether to retry.
pub type RetryCondition = Arc<dyn Fn(&ApiError) -> bool + Send + Sync>;

/// How the wait grows between retries.
#[derive(Clone, Default)]
pub enum Backoff {
    /// Always `delay`.
    Fixed,
    /// `delay * attempt`.
    Linear,
    /// `delay * 2^(attempt - 1)`.
    #[default]
    Exponential,
    /// Caller-supplied function of the attempt number.
    Custom(BackoffFn),
}

impl Backoff {
    /// Custom backoff from a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Backoff::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Fixed => f.write_str("Fixed"),
            Backoff::Linear => f.write_str("Linear"),
            Backoff::Exponential => f.write_str("Exponential"),
            Backoff::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How many times, and how patiently, a failed request is retried.
///
/// `attempts` counts retries after the first try, so `attempts = 3` allows
/// four calls in total and `attempts = 0` allows exactly one.
///
/// # Default Values
///
/// - `attempts`: 3
/// - `delay`: 1 second
/// - `backoff`: exponential
/// - `max_delay`: none
/// - `jitter`: 0.0
/// - `retry_if`: none (retry every failure)
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the initial request).
    pub attempts: u32,

    /// Base delay fed into the backoff mode.
    pub delay: Duration,

    pub backoff: Backoff,

    /// Upper bound applied after backoff and jitter.
    pub max_delay: Option<Duration>,

    /// Jitter factor between 0.0 and 1.0. A value of 0.2 means the actual
    /// delay will be within +/- 20% of the computed delay.
    pub jitter: f64,

    /// Consulted before every retry, never before the first attempt.
    pub retry_condition: Option<RetryCondition>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: defaults::ATTEMPTS,
            delay: defaults::DELAY,
            backoff: Backoff::default(),
            max_delay: None,
            jitter: defaults::JITTER,
            retry_condition: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .field("backoff", &self.backoff)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .field("retry_condition", &self.retry_condition.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// The default policy; see the field table on [`RetryPolicy`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy with a zero retry budget.
    pub fn no_retry() -> Self {
        Self {
            attempts: 0,
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the base delay.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the backoff mode.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Cap every computed delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the jitter factor.
    ///
    /// # Panics
    ///
    /// Panics if `jitter` is not between 0.0 and 1.0.
    pub fn jitter(mut self, jitter: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&jitter),
            "jitter must be between 0.0 and 1.0"
        );
        self.jitter = jitter;
        self
    }

    /// Only retry when `condition` returns `true` for the last error.
    pub fn retry_if<F>(mut self, condition: F) -> Self
    where
        F: Fn(&ApiError) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    /// Reject out-of-range settings.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err("jitter must be between 0.0 and 1.0");
        }
        if matches!(self.max_delay, Some(max) if max < self.delay) {
            return Err("delay must not exceed max_delay");
        }
        Ok(())
    }

    /// Whether the policy allows another try after `attempt` failures.
    pub fn should_retry(&self, attempt: u32, error: &ApiError) -> bool {
        if attempt > self.attempts {
            return false;
        }
        match &self.retry_condition {
            Some(condition) => condition(error),
            None => true,
        }
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base = match &self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                self.delay.saturating_mul(factor)
            }
            Backoff::Custom(f) => f(attempt),
        };

        // The field is public, so it may bypass `jitter()` and `validate()`
        let jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let jittered = if jitter > 0.0 {
            let random_factor = rand::random::<f64>() * jitter * 2.0 - jitter;
            Duration::try_from_secs_f64(base.as_secs_f64() * (1.0 + random_factor))
                .unwrap_or(Duration::MAX)
        } else {
            base
        };

        match self.max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}

/// Run `operation` under `policy`.
///
/// With no policy the operation runs exactly once. Otherwise failures are
/// retried sequentially until the budget is spent or the predicate declines;
/// the last error is returned unchanged. Every error kind goes through the
/// same budget and predicate, aborted ones included.
pub async fn with_retry<F, Fut, T>(policy: Option<&RetryPolicy>, mut operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let Some(policy) = policy else {
        return operation().await;
    };

    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !policy.should_retry(attempt, &err) {
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    error = %err,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "retrying after failed request"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
