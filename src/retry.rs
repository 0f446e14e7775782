//! Retry policies and the backoff formula.
//!
//! A [`RetryPolicy`] is a pure value: how many extra attempts to make, how long
//! to wait before each of them, and a hook invoked before every wait. It does no
//! I/O itself; the executor asks it for delays and performs the waits.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Delay used by [`BackoffKind::Linear`] before every retry.
pub const LINEAR_DELAY: Duration = Duration::from_millis(500);

/// Base of the exponential formula: retry `n` waits `EXPONENTIAL_BASE * 2^n`.
pub const EXPONENTIAL_BASE: Duration = Duration::from_millis(250);

/// How the wait between attempts grows.
///
/// # Examples
///
/// ```
/// use interlink::BackoffKind;
/// use std::time::Duration;
///
/// // 500ms, 500ms, 500ms...
/// assert_eq!(BackoffKind::Linear.delay(3), Duration::from_millis(500));
///
/// // 500ms, 1s, 2s, 4s...
/// assert_eq!(BackoffKind::Exponential.delay(1), Duration::from_millis(500));
/// assert_eq!(BackoffKind::Exponential.delay(4), Duration::from_millis(4000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackoffKind {
    /// Constant 500ms before every retry.
    #[default]
    Linear,

    /// `250ms * 2^retry`, where `retry` is the 1-based number of the retry about to start.
    Exponential,
}

impl BackoffKind {
    /// Returns the delay before the given retry.
    ///
    /// # Arguments
    ///
    /// * `retry` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay(self, retry: usize) -> Duration {
        match self {
            BackoffKind::Linear => LINEAR_DELAY,
            BackoffKind::Exponential => {
                let exponent = u32::try_from(retry).unwrap_or(u32::MAX);
                let multiplier = 2u32.saturating_pow(exponent);
                EXPONENTIAL_BASE.saturating_mul(multiplier)
            }
        }
    }
}

type RetryHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Defines how often a failed call is retried and how long to wait in between.
///
/// `max_retries` counts the *extra* attempts after the first one, so a policy
/// built with `max_retries = 2` makes at most three attempts. A policy with
/// zero retries still makes its single attempt.
///
/// # Examples
///
/// ```
/// use interlink::{BackoffKind, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, BackoffKind::Exponential)
///     .on_each_retry(|retry| println!("starting retry {retry}"));
///
/// assert_eq!(policy.total_attempts(), 4);
/// assert_eq!(policy.delay_for_retry(2), Duration::from_millis(1000));
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff: BackoffKind,
    on_each_retry: RetryHook,
}

impl RetryPolicy {
    /// Creates a policy with a no-op retry hook.
    pub fn new(max_retries: usize, backoff: BackoffKind) -> Self {
        Self {
            max_retries,
            backoff,
            on_each_retry: Arc::new(|_| {}),
        }
    }

    /// Try once, never retry.
    pub fn none() -> Self {
        Self::new(0, BackoffKind::Linear)
    }

    /// Installs a hook called with the 1-based retry number right before each backoff wait.
    ///
    /// The hook runs synchronously on the calling task, in attempt order.
    pub fn on_each_retry<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_each_retry = Arc::new(hook);
        self
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// `max_retries + 1`.
    pub fn total_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    pub fn backoff(&self) -> BackoffKind {
        self.backoff
    }

    /// Returns the wait before the given 1-based retry.
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        self.backoff.delay(retry)
    }

    /// Invokes the retry hook.
    pub fn notify_retry(&self, retry: usize) {
        (self.on_each_retry)(retry);
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
