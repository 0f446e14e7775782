//! # Interlink - resilient HTTP+JSON calls between services
//!
//! Interlink issues an HTTP request, retries transport failures with a fixed
//! backoff scheme, and when attempts run out raises a typed [`ApiError`] that
//! carries a machine-readable [`ProblemReason`], the request URL and the raw
//! server response.
//!
//! ## Quick Start
//!
//! ```no_run
//! use interlink::{BackoffKind, Executor, RequestSpec, RetryPolicy};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), interlink::Error> {
//!     let executor = Executor::builder().build()?;
//!
//!     // Three attempts in total, waiting 500ms then 1s in between
//!     let policy = RetryPolicy::new(2, BackoffKind::Exponential)
//!         .on_each_retry(|retry| eprintln!("retry #{retry}"));
//!
//!     let spec = RequestSpec::parse_get("http://users.internal/users/123")?
//!         .with_header("Accept", "application/json")?;
//!
//!     let user = executor.execute::<User>(&spec, &policy).await?;
//!     println!("User {} is {}", user.data.id, user.data.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Failure handling
//!
//! Connection errors, timeouts and 4xx/5xx answers are retried. Once attempts
//! run out the last failure is classified:
//!
//! | Status | Reason | Unexpected |
//! |---|---|---|
//! | 501 | [`ProblemReason::ServerUnable`] | no |
//! | 500 | [`ProblemReason::ServerError`] | yes |
//! | 400 | [`ProblemReason::ClientMistake`] | yes |
//! | none or other | [`ProblemReason::ConnectionImpossible`] | yes |
//!
//! Decode failures are never retried and surface as [`Error::DeserializationFailed`].
//!
//! ```no_run
//! use interlink::{Error, Executor, RequestSpec, RetryPolicy};
//!
//! # async fn example() -> Result<(), Error> {
//! # let executor = Executor::builder().build()?;
//! # let spec = RequestSpec::parse_get("http://users.internal/users/123")?;
//! match executor.execute::<serde_json::Value>(&spec, &RetryPolicy::none()).await {
//!     Ok(response) => println!("Success: {}", response.data),
//!     Err(Error::Api(err)) if err.is_unexpected() => {
//!         eprintln!("[{}] {} (status {:?})", err.reason(), err, err.status());
//!     }
//!     Err(Error::Api(err)) => println!("Expected failure: {}", err),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Commands
//!
//! [`JsonQueryCommand`] adds what a hosting framework needs on top of the
//! executor: a name and group, an execution timeout, a fallback hook and a
//! request-scoped cache key. The framework plugs in through [`CommandHost`].

pub mod cache;
pub mod classify;
mod command;
mod error;
mod executor;
pub mod model;
mod request;
mod response;
pub mod retry;
pub mod sleeper;

pub use classify::AttemptFailure;
pub use command::{
    CommandHost, DefaultHost, JsonQueryCommand, DEFAULT_TIMEOUT, MICROSERVICE_COMMAND_GROUP,
};
pub use error::{ApiError, Error, ProblemReason, Result, TransportError};
pub use executor::{AttemptOutcome, Executor, ExecutorBuilder};
pub use request::{RequestMethod, RequestSpec};
pub use response::{RawResponse, Response};
pub use retry::{BackoffKind, RetryPolicy};
