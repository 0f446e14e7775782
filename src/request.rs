//! Immutable descriptions of a single logical call.

use crate::Error;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::fmt;
use url::Url;

/// The HTTP methods the executor issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    /// `GET`, never carries a body.
    Get,
    /// `POST`, always carries a (possibly empty) body.
    Post,
}

impl RequestMethod {
    /// Returns the matching [`http::Method`].
    pub fn as_http(self) -> Method {
        match self {
            RequestMethod::Get => Method::GET,
            RequestMethod::Post => Method::POST,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => f.write_str("GET"),
            RequestMethod::Post => f.write_str("POST"),
        }
    }
}

/// Everything needed to issue one logical call: target URL, method, headers and body.
///
/// A `RequestSpec` is built once per call site and is never mutated by the
/// executor, so it can be shared read-only between concurrent calls.
///
/// # Examples
///
/// ```
/// use interlink::RequestSpec;
///
/// # fn example() -> Result<(), interlink::Error> {
/// let spec = RequestSpec::parse_get("http://users.internal/users/42")?
///     .with_header("Accept", "application/json")?;
///
/// assert_eq!(spec.url().as_str(), "http://users.internal/users/42");
/// assert!(spec.body().is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    url: Url,
    method: RequestMethod,
    headers: HeaderMap,
    body: Option<String>,
}

impl RequestSpec {
    /// Creates a `GET` request for an absolute URL.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: RequestMethod::Get,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a `POST` request carrying `body` as its entity.
    pub fn post(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            method: RequestMethod::Post,
            headers: HeaderMap::new(),
            body: Some(body.into()),
        }
    }

    /// Creates a `POST` request whose body is `payload` serialized as JSON.
    ///
    /// A `Content-Type: application/json` header is added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] for a non-HTTP URL and
    /// [`Error::SerializationFailed`] if `payload` cannot be serialized.
    pub fn post_json<T: Serialize + ?Sized>(url: Url, payload: &T) -> Result<Self, Error> {
        check_scheme(&url)?;
        let body =
            serde_json::to_string(payload).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        let mut spec = Self::post(url, body);
        spec.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(spec)
    }

    /// Parses `url` and creates a `GET` request for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` is not an absolute URL and
    /// [`Error::ConfigurationError`] if its scheme isn't `http` or `https`.
    pub fn parse_get(url: impl AsRef<str>) -> Result<Self, Error> {
        let url = Url::parse(url.as_ref())?;
        check_scheme(&url)?;
        Ok(Self::get(url))
    }

    /// Adds a header to the request. Names are case-insensitive; a repeated
    /// name replaces the earlier value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds every header from `headers`, replacing existing values with the same name.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// The absolute target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The request entity. Always `None` for `GET`.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Rejects URLs the executor can't call.
pub(crate) fn check_scheme(url: &Url) -> Result<(), Error> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::ConfigurationError(format!(
            "Unsupported URL scheme '{}' in {}",
            scheme, url
        ))),
    }
}
