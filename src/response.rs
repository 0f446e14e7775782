//! Successful call results.
//!
//! [`RawResponse`] is what the retry loop produces: the undecoded body plus
//! transaction details. [`Response`] adds the decoded value on top.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// The undecoded result of a successful call.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The response body bytes.
    pub body: Vec<u8>,

    /// The HTTP status code of the successful attempt.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the start of the first attempt until the body was read,
    /// including backoff waits.
    pub latency: Duration,

    /// The number of attempts made, `1` if the first one succeeded.
    pub attempts: usize,
}

impl RawResponse {
    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Attaches a decoded value, keeping the transaction details.
    pub fn into_response<T>(self, data: T) -> Response<T> {
        let raw_body = self.text();
        Response {
            data,
            raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }
}

/// A decoded response together with the details of the HTTP transaction.
///
/// # Examples
///
/// ```no_run
/// use interlink::{Executor, RequestSpec, RetryPolicy};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Stock {
///     sku: String,
///     available: u32,
/// }
///
/// # async fn example() -> Result<(), interlink::Error> {
/// let executor = Executor::builder().build()?;
/// let spec = RequestSpec::parse_get("http://inventory.internal/stock/A-1")?;
///
/// let response = executor.execute::<Stock>(&spec, &RetryPolicy::none()).await?;
///
/// println!("{}: {}", response.data.sku, response.data.available);
/// println!("Call took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The total latency of the call, including all attempts and backoff waits.
    pub latency: Duration,

    /// The number of attempts made to complete this call.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Maps the response data to a different type, preserving the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use interlink::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response {
    ///     data: 42,
    ///     raw_body: "42".to_string(),
    ///     status: StatusCode::OK,
    ///     headers: HeaderMap::new(),
    ///     latency: Duration::from_millis(100),
    ///     attempts: 1,
    /// };
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the call needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Consumes the response, returning only the decoded data.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
