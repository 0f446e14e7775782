//! The retrying request executor.
//!
//! [`Executor`] issues a [`RequestSpec`], retries transport failures according
//! to a [`RetryPolicy`], classifies the final failure and decodes the body of a
//! successful response. Use [`ExecutorBuilder`] to configure one.

use crate::{
    classify::{classify, AttemptFailure},
    error::TransportError,
    request::{check_scheme, RequestMethod, RequestSpec},
    response::{RawResponse, Response},
    retry::RetryPolicy,
    sleeper::{Sleeper, TokioSleeper},
    Error, Result,
};
use http::header::{CONTENT_LENGTH, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The server answered with a non-error status and the body was read.
    Success {
        body: Vec<u8>,
        status: StatusCode,
        headers: HeaderMap,
    },
    /// The attempt failed at the transport level.
    Failure(AttemptFailure),
    /// The request could not be built. Retrying can't help.
    Rejected(Error),
}

/// Executes inter-service calls with retries and typed failures.
///
/// The executor keeps no per-call state, so one instance (and its connection
/// pool) can be shared by any number of concurrent calls. Each call runs on
/// the caller's task: network I/O and backoff waits happen inside the returned
/// future, and dropping that future aborts the call.
///
/// # Examples
///
/// ```no_run
/// use interlink::{BackoffKind, Executor, RequestSpec, RetryPolicy};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Way {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), interlink::Error> {
/// let executor = Executor::builder()
///     .user_agent("route-planner/1.4")?
///     .build()?;
///
/// let spec = RequestSpec::parse_get("http://ways.internal/ways/7")?;
/// let policy = RetryPolicy::new(3, BackoffKind::Exponential);
///
/// let way = executor.execute::<Way>(&spec, &policy).await?;
/// println!("{} ({})", way.data.name, way.data.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    http_client: reqwest::Client,
    default_headers: HeaderMap,
    sleeper: Arc<dyn Sleeper>,
}

impl Executor {
    /// Creates a new `ExecutorBuilder`.
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    /// Runs the call and decodes the JSON body into `T`.
    ///
    /// Fields of the payload that `T` doesn't know are ignored.
    ///
    /// # Errors
    ///
    /// * [`Error::Api`] once every attempt failed at the transport level.
    /// * [`Error::DeserializationFailed`] if the body isn't a valid `T`. This is not retried.
    pub async fn execute<T>(&self, spec: &RequestSpec, policy: &RetryPolicy) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.execute_with(spec, policy, |body| serde_json::from_slice::<T>(body))
            .await
    }

    /// Runs the call and decodes the body with `decode`.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::execute`]; a failing `decode` yields
    /// [`Error::DeserializationFailed`] carrying its message.
    pub async fn execute_with<T, E, F>(
        &self,
        spec: &RequestSpec,
        policy: &RetryPolicy,
        decode: F,
    ) -> Result<Response<T>>
    where
        E: fmt::Display,
        F: FnOnce(&[u8]) -> std::result::Result<T, E>,
    {
        let raw = self.fetch(spec, policy).await?;

        match decode(&raw.body) {
            Ok(data) => Ok(raw.into_response(data)),
            Err(e) => {
                let raw_response = raw.text();
                tracing::error!(
                    error = %e,
                    url = %spec.url(),
                    raw_response = %raw_response,
                    "Failed to deserialize response"
                );

                Err(Error::DeserializationFailed {
                    url: spec.url().to_string(),
                    raw_response,
                    serde_error: e.to_string(),
                })
            }
        }
    }

    /// Runs the retry loop and returns the undecoded response.
    ///
    /// Makes at most `policy.total_attempts()` attempts. Before each retry the
    /// policy's hook is called with the 1-based retry number, then the executor
    /// waits for the policy's backoff delay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] classified from the last failed attempt, or
    /// [`Error::ConfigurationError`] without any retry when the request can't be built.
    pub async fn fetch(&self, spec: &RequestSpec, policy: &RetryPolicy) -> Result<RawResponse> {
        check_scheme(spec.url())?;

        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.attempt(spec, attempt).await {
                AttemptOutcome::Success {
                    body,
                    status,
                    headers,
                } => {
                    let latency = start_time.elapsed();
                    tracing::info!(
                        status = status.as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt,
                        "Received HTTP response"
                    );

                    return Ok(RawResponse {
                        body,
                        status,
                        headers,
                        latency,
                        attempts: attempt,
                    });
                }
                AttemptOutcome::Rejected(error) => {
                    tracing::error!(error = %error, url = %spec.url(), "Request rejected");
                    return Err(error);
                }
                AttemptOutcome::Failure(failure) => {
                    if attempt > policy.max_retries() {
                        tracing::warn!(
                            error = %failure.cause,
                            status = ?failure.status,
                            attempts = attempt,
                            method = %spec.method(),
                            url = %spec.url(),
                            "Retries exhausted"
                        );
                        return Err(classify(failure).into());
                    }

                    let retry = attempt;
                    let delay = policy.delay_for_retry(retry);
                    tracing::debug!(
                        error = %failure.cause,
                        retry = retry,
                        delay_ms = delay.as_millis(),
                        url = %spec.url(),
                        "Request failed, retrying after delay"
                    );

                    policy.notify_retry(retry);
                    self.inner.sleeper.sleep(delay).await;
                }
            }
        }
    }

    /// Executes a single attempt.
    ///
    /// The response is consumed or dropped before this returns, so a failed
    /// attempt never holds a connection into the next one.
    async fn attempt(&self, spec: &RequestSpec, attempt: usize) -> AttemptOutcome {
        let url = spec.url();

        tracing::debug!(
            method = %spec.method(),
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut headers = self.inner.default_headers.clone();
        for (name, value) in spec.headers() {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = self
            .inner
            .http_client
            .request(spec.method().as_http(), url.clone())
            .headers(headers);

        if spec.method() == RequestMethod::Post {
            let body = spec.body().unwrap_or_default().as_bytes().to_vec();
            request = request.header(CONTENT_LENGTH, body.len()).body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return AttemptOutcome::Rejected(Error::ConfigurationError(format!(
                    "Invalid request for {}: {}",
                    url, e
                )));
            }
            Err(e) => {
                return AttemptOutcome::Failure(AttemptFailure::new(
                    TransportError::from_reqwest(&e, url),
                    e.status().map(|s| s.as_u16()),
                    None,
                ));
            }
        };

        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            // The error body is diagnostics only; failing to read it must not
            // replace the primary failure.
            let server_body = match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    tracing::debug!(error = %e, url = %url, "Could not read error body");
                    None
                }
            };

            return AttemptOutcome::Failure(AttemptFailure::new(
                TransportError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                },
                Some(status.as_u16()),
                server_body,
            ));
        }

        let headers = response.headers().clone();
        match response.bytes().await {
            Ok(body) => AttemptOutcome::Success {
                body: body.to_vec(),
                status,
                headers,
            },
            Err(e) => AttemptOutcome::Failure(AttemptFailure::new(
                TransportError::from_reqwest(&e, url),
                Some(status.as_u16()),
                None,
            )),
        }
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("default_headers", &self.inner.default_headers)
            .field("sleeper", &self.inner.sleeper)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating an [`Executor`].
///
/// # Examples
///
/// ```no_run
/// use interlink::ExecutorBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), interlink::Error> {
/// let executor = ExecutorBuilder::new()
///     .connect_timeout(Duration::from_secs(2))
///     .default_header("X-Caller", "billing")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ExecutorBuilder {
    default_headers: HeaderMap,
    connect_timeout: Option<Duration>,
    sleeper: Arc<dyn Sleeper>,
}

impl ExecutorBuilder {
    /// Creates a new `ExecutorBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            default_headers: HeaderMap::new(),
            connect_timeout: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Adds a header sent with every request. Headers of a [`RequestSpec`]
    /// with the same name take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the `User-Agent` header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid header value.
    pub fn user_agent(self, value: impl AsRef<str>) -> Result<Self> {
        self.default_header(USER_AGENT.as_str(), value)
    }

    /// Limits how long establishing a connection may take within one attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Replaces the wait primitive used between attempts.
    pub fn sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Builds the configured `Executor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client can't be created.
    pub fn build(self) -> Result<Executor> {
        let mut http_client = reqwest::Client::builder();
        if let Some(timeout) = self.connect_timeout {
            http_client = http_client.connect_timeout(timeout);
        }
        let http_client = http_client.build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Executor {
            inner: Arc::new(ExecutorInner {
                http_client,
                default_headers: self.default_headers,
                sleeper: self.sleeper,
            }),
        })
    }
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
