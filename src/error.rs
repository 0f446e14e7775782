//! Error types for inter-service calls.
//!
//! Failed calls end in one of two ways. Transport failures (connection problems,
//! timeouts, HTTP error statuses) are retried and, once attempts run out, become
//! an [`ApiError`] tagged with a [`ProblemReason`]. Everything else (decode
//! failures, bad configuration) surfaces immediately as the matching [`Error`]
//! variant.

use std::fmt;
use std::time::Duration;
use url::Url;

/// Why a call ultimately failed.
///
/// Callers branch on the reason, and on [`ProblemReason::is_unexpected`], to pick
/// an alerting or logging severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemReason {
    /// No HTTP status could be obtained (DNS failure, refused connection,
    /// timeout before headers), or the status was not one of the classified ones.
    ConnectionImpossible,
    /// The server answered `501 Not Implemented`: it knowingly can't serve the request.
    ServerUnable,
    /// The server answered `500 Internal Server Error`.
    ServerError,
    /// The server answered `400 Bad Request`.
    ClientMistake,
    /// The reason was not determined.
    Unknown,
}

impl ProblemReason {
    /// Returns `false` only for failures a caller should plan for.
    ///
    /// ```
    /// use interlink::ProblemReason;
    ///
    /// assert!(!ProblemReason::ServerUnable.is_unexpected());
    /// assert!(ProblemReason::ServerError.is_unexpected());
    /// ```
    pub const fn is_unexpected(self) -> bool {
        !matches!(self, ProblemReason::ServerUnable)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ProblemReason::ConnectionImpossible => "CONNECTION_IMPOSSIBLE",
            ProblemReason::ServerUnable => "SERVER_UNABLE",
            ProblemReason::ServerError => "SERVER_ERROR",
            ProblemReason::ClientMistake => "CLIENT_MISTAKE",
            ProblemReason::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ProblemReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of the transport-level failure of one attempt.
///
/// Unlike `reqwest::Error` this is cloneable and comparable, so two
/// classifications of the same failure produce equal [`ApiError`]s. Every
/// message names the request URL.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("Connection to {url} failed: {detail}")]
    Connect { url: String, detail: String },

    /// The attempt timed out before a response arrived.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with a 4xx or 5xx status.
    #[error("Server returned HTTP response code: {status} for URL: {url}")]
    Status { url: String, status: u16 },

    /// Any other failure while sending the request or reading the response.
    #[error("I/O error while calling {url}: {detail}")]
    Io { url: String, detail: String },
}

impl TransportError {
    /// Captures a `reqwest` failure for `url`.
    pub fn from_reqwest(error: &reqwest::Error, url: &Url) -> Self {
        let url = url.to_string();
        let detail = std::error::Error::source(error)
            .map(ToString::to_string)
            .unwrap_or_else(|| error.to_string());

        if error.is_timeout() {
            TransportError::Timeout { url }
        } else if error.is_connect() {
            TransportError::Connect { url, detail }
        } else if let Some(status) = error.status() {
            TransportError::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            TransportError::Io { url, detail }
        }
    }

    /// The URL of the failed request.
    pub fn url(&self) -> &str {
        match self {
            TransportError::Connect { url, .. }
            | TransportError::Timeout { url }
            | TransportError::Status { url, .. }
            | TransportError::Io { url, .. } => url,
        }
    }
}

/// The terminal error of a call whose attempts were exhausted.
///
/// The message has the form `"<transport error>. Server returned: <body>"`, where
/// the transport error names the request URL and `<body>` is the verbatim server
/// error body (empty if none could be read).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    url: String,
    status: Option<u16>,
    server_body: Option<String>,
    #[source]
    cause: Option<TransportError>,
    reason: ProblemReason,
}

impl ApiError {
    /// Builds the error for a classified transport failure.
    pub fn new(
        cause: TransportError,
        status: Option<u16>,
        server_body: Option<String>,
        reason: ProblemReason,
    ) -> Self {
        let message = format!(
            "{}. Server returned: {}",
            cause,
            server_body.as_deref().unwrap_or_default()
        );
        Self {
            message,
            url: cause.url().to_string(),
            status,
            server_body,
            cause: Some(cause),
            reason,
        }
    }

    /// Builds an error whose reason was not determined.
    ///
    /// The URL is appended to the message when `message` doesn't already contain it.
    pub fn unknown(message: impl Into<String>, url: &Url) -> Self {
        let mut message = message.into();
        let url = url.to_string();
        if !message.contains(&url) {
            message = format!("{} ({})", message, url);
        }
        Self {
            message,
            url,
            status: None,
            server_body: None,
            cause: None,
            reason: ProblemReason::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The request URL the error belongs to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The HTTP status of the last attempt, if one was obtained.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The error body the server sent with the last attempt, if it was readable.
    pub fn server_body(&self) -> Option<&str> {
        self.server_body.as_deref()
    }

    pub fn cause(&self) -> Option<&TransportError> {
        self.cause.as_ref()
    }

    pub fn reason(&self) -> ProblemReason {
        self.reason
    }

    /// Shorthand for `self.reason().is_unexpected()`.
    pub fn is_unexpected(&self) -> bool {
        self.reason.is_unexpected()
    }
}

/// The main error type for inter-service calls.
///
/// # Examples
///
/// ```no_run
/// use interlink::{Error, Executor, ProblemReason, RequestSpec, RetryPolicy};
///
/// # async fn example() -> Result<(), Error> {
/// let executor = Executor::builder().build()?;
/// let spec = RequestSpec::parse_get("http://inventory.internal/stock")?;
///
/// match executor.execute::<serde_json::Value>(&spec, &RetryPolicy::none()).await {
///     Ok(response) => println!("Stock: {}", response.data),
///     Err(Error::Api(err)) if err.reason() == ProblemReason::ServerUnable => {
///         println!("Inventory can't do that yet: {}", err);
///     }
///     Err(Error::Api(err)) => eprintln!("[{}] {}", err.reason(), err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// All attempts failed at the transport level.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The response body could not be decoded into the expected type.
    ///
    /// Decode failures are never retried.
    #[error("Failed to deserialize response from {url}: {serde_error}")]
    DeserializationFailed {
        /// The request URL
        url: String,
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The decoder's error message
        serde_error: String,
    },

    /// The command's execution timeout elapsed before the call finished.
    ///
    /// The timeout spans the whole retry sequence, not a single attempt.
    #[error("Command {command} timed out after {elapsed:?} (limit {timeout:?})")]
    Timeout {
        /// Name of the command that timed out
        command: String,
        /// Time spent before giving up
        elapsed: Duration,
        /// The configured limit
        timeout: Duration,
    },

    /// Invalid configuration was provided, such as an invalid header.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The request payload could not be serialized.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid or relative URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns the problem reason of an [`Error::Api`].
    pub fn problem_reason(&self) -> Option<ProblemReason> {
        self.api_error().map(ApiError::reason)
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` unless this is an [`Error::Api`] with an expected reason.
    pub fn is_unexpected(&self) -> bool {
        self.problem_reason()
            .map_or(true, ProblemReason::is_unexpected)
    }

    /// Returns the HTTP status code if the server sent one.
    pub fn status(&self) -> Option<u16> {
        self.api_error().and_then(ApiError::status)
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Api(err) => err.server_body(),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for inter-service calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://example.test/501").unwrap()
    }

    #[test]
    fn test_unexpected_flags() {
        assert!(ProblemReason::ConnectionImpossible.is_unexpected());
        assert!(!ProblemReason::ServerUnable.is_unexpected());
        assert!(ProblemReason::ServerError.is_unexpected());
        assert!(ProblemReason::ClientMistake.is_unexpected());
        assert!(ProblemReason::Unknown.is_unexpected());
    }

    #[test]
    fn test_message_includes_url_and_body() {
        let cause = TransportError::Status {
            url: url().to_string(),
            status: 501,
        };
        let err = ApiError::new(
            cause,
            Some(501),
            Some("maintenance".to_string()),
            ProblemReason::ServerUnable,
        );

        assert!(err.message().contains("example.test/501"));
        assert!(err.message().ends_with("Server returned: maintenance"));
        assert_eq!(err.to_string(), err.message());
        assert_eq!(err.url(), "http://example.test/501");
    }

    #[test]
    fn test_message_without_body() {
        let cause = TransportError::Timeout {
            url: url().to_string(),
        };
        let err = ApiError::new(cause, None, None, ProblemReason::ConnectionImpossible);

        assert!(err.message().ends_with("Server returned: "));
        assert!(err.server_body().is_none());
    }

    #[test]
    fn test_unknown_appends_url() {
        let err = ApiError::unknown("something odd happened", &url());

        assert_eq!(err.reason(), ProblemReason::Unknown);
        assert!(err.cause().is_none());
        assert!(err.message().contains("http://example.test/501"));
    }

    #[test]
    fn test_error_accessors() {
        let err: Error = ApiError::new(
            TransportError::Status {
                url: url().to_string(),
                status: 501,
            },
            Some(501),
            Some("later".to_string()),
            ProblemReason::ServerUnable,
        )
        .into();

        assert_eq!(err.problem_reason(), Some(ProblemReason::ServerUnable));
        assert!(!err.is_unexpected());
        assert_eq!(err.status(), Some(501));
        assert_eq!(err.raw_response(), Some("later"));

        let err = Error::ConfigurationError("bad".to_string());
        assert!(err.problem_reason().is_none());
        assert!(err.is_unexpected());
    }
}
