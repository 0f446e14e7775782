//! Commands: a named, grouped call with a timeout, a fallback and a cache key.
//!
//! Concurrency isolation, circuit breaking and result memoization belong to
//! whatever framework hosts the command. That framework is seen only through
//! the [`CommandHost`] trait.

use crate::{
    cache::cache_key, executor::Executor, request::RequestSpec, response::Response,
    retry::RetryPolicy, Error, Result,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Execution timeout applied when neither the command nor the host sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Command group shared by calls between the platform's own services.
pub const MICROSERVICE_COMMAND_GROUP: &str = "MicroserviceQueryCommand";

/// What a command needs from the framework hosting it.
///
/// Every method has a default, so an implementation only overrides what its
/// framework actually provides.
pub trait CommandHost<T>: Send + Sync {
    /// Overrides the command's execution timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Called once when the command fails for good, timeouts included.
    /// Returning `None` propagates the error.
    fn fallback(&self, error: &Error) -> Option<T> {
        let _ = error;
        None
    }

    /// Whether a request-scoped caching context is active on this task.
    fn caching_context_active(&self) -> bool {
        false
    }
}

/// A host with no fallback and no timeout override.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHost {
    caching_context_active: bool,
}

impl DefaultHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that reports an active caching context.
    pub fn with_caching_context() -> Self {
        Self {
            caching_context_active: true,
        }
    }
}

impl<T> CommandHost<T> for DefaultHost {
    fn caching_context_active(&self) -> bool {
        self.caching_context_active
    }
}

/// A call to a URL answering with JSON, decoded into `T`.
///
/// The execution timeout wraps the entire retry sequence rather than each
/// attempt, so slow attempts eat into the budget of later ones.
///
/// # Examples
///
/// ```no_run
/// use interlink::{BackoffKind, DefaultHost, Executor, JsonQueryCommand, RequestSpec, RetryPolicy};
/// use serde::Deserialize;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct Way {
///     id: u64,
/// }
///
/// # async fn example() -> Result<(), interlink::Error> {
/// let executor = Executor::builder().build()?;
///
/// let command = JsonQueryCommand::<Vec<Way>>::microservice(
///     "findWaysNearPoint",
///     RequestSpec::parse_get("http://ways.internal/find-ways-near-point?lat=47.98&lon=11.18")?,
/// )
/// .retry_policy(RetryPolicy::new(2, BackoffKind::Linear))
/// .timeout(Duration::from_secs(5));
///
/// let ways = command.execute(&executor, &DefaultHost::new()).await?;
/// println!("{} ways found", ways.len());
/// # Ok(())
/// # }
/// ```
pub struct JsonQueryCommand<T> {
    name: String,
    group: String,
    spec: RequestSpec,
    retry_policy: RetryPolicy,
    timeout: Duration,
    caching_enabled: bool,
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonQueryCommand<T>
where
    T: DeserializeOwned,
{
    /// Creates a command with no retries, no caching and the default timeout.
    pub fn new(name: impl Into<String>, group: impl Into<String>, spec: RequestSpec) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            spec,
            retry_policy: RetryPolicy::none(),
            timeout: DEFAULT_TIMEOUT,
            caching_enabled: false,
            _target: PhantomData,
        }
    }

    /// Creates a command in the [`MICROSERVICE_COMMAND_GROUP`] group.
    pub fn microservice(name: impl Into<String>, spec: RequestSpec) -> Self {
        Self::new(name, MICROSERVICE_COMMAND_GROUP, spec)
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the execution timeout for the whole call, retries included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables request-scoped caching; see [`JsonQueryCommand::cache_key`].
    pub fn caching(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// The key under which the host may memoize this call, if any.
    pub fn cache_key<H>(&self, host: &H) -> Option<String>
    where
        H: CommandHost<T> + ?Sized,
    {
        cache_key(&self.spec, self.caching_enabled, host.caching_context_active())
    }

    /// The timeout in effect under `host`.
    pub fn effective_timeout<H>(&self, host: &H) -> Duration
    where
        H: CommandHost<T> + ?Sized,
    {
        host.timeout().unwrap_or(self.timeout)
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns the executor's error, or [`Error::Timeout`] when the timeout
    /// elapses first, unless the host's fallback supplies a value.
    pub async fn execute<H>(&self, executor: &Executor, host: &H) -> Result<T>
    where
        H: CommandHost<T> + ?Sized,
    {
        let span = tracing::debug_span!("command", command = %self.name, group = %self.group);

        async {
            if let Some(key) = self.cache_key(host) {
                tracing::debug!(cache_key = %key, "Cache key derived");
            }

            let timeout = self.effective_timeout(host);
            let start = Instant::now();
            let call = executor.execute::<T>(&self.spec, &self.retry_policy);

            let result = match tokio::time::timeout(timeout, call).await {
                Ok(result) => result.map(Response::into_data),
                Err(_) => Err(Error::Timeout {
                    command: self.name.clone(),
                    elapsed: start.elapsed(),
                    timeout,
                }),
            };

            result.or_else(|error| self.recover(host, error))
        }
        .instrument(span)
        .await
    }

    fn recover<H>(&self, host: &H, error: Error) -> Result<T>
    where
        H: CommandHost<T> + ?Sized,
    {
        match host.fallback(&error) {
            Some(value) => {
                tracing::warn!(
                    error = %error,
                    reason = ?error.problem_reason(),
                    "Command failed, using fallback value"
                );
                Ok(value)
            }
            None => {
                if error.is_unexpected() {
                    tracing::error!(error = %error, "Command failed");
                } else {
                    tracing::info!(error = %error, "Command failed with an expected reason");
                }
                Err(error)
            }
        }
    }
}

impl<T> fmt::Debug for JsonQueryCommand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonQueryCommand")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("spec", &self.spec)
            .field("retry_policy", &self.retry_policy)
            .field("timeout", &self.timeout)
            .field("caching_enabled", &self.caching_enabled)
            .finish()
    }
}
