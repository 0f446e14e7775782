//! Turns the last failed attempt of a call into an [`ApiError`].

use crate::error::{ApiError, ProblemReason, TransportError};

/// What could be salvaged from a failed attempt.
///
/// `status` and `server_body` are best-effort: if reading them failed too,
/// they are simply absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// The transport-level failure.
    pub cause: TransportError,
    /// The HTTP status, if the server got as far as sending one.
    pub status: Option<u16>,
    /// The error body sent by the server, if it was readable.
    pub server_body: Option<String>,
}

impl AttemptFailure {
    pub fn new(cause: TransportError, status: Option<u16>, server_body: Option<String>) -> Self {
        Self {
            cause,
            status,
            server_body,
        }
    }
}

/// Maps an HTTP status (or its absence) to a [`ProblemReason`].
///
/// Only 501, 400 and 500 are classified. Any other status, like a missing one,
/// yields [`ProblemReason::ConnectionImpossible`].
///
/// ```
/// use interlink::{classify::reason_for_status, ProblemReason};
///
/// assert_eq!(reason_for_status(Some(501)), ProblemReason::ServerUnable);
/// assert_eq!(reason_for_status(None), ProblemReason::ConnectionImpossible);
/// ```
pub fn reason_for_status(status: Option<u16>) -> ProblemReason {
    match status {
        Some(501) => ProblemReason::ServerUnable,
        Some(400) => ProblemReason::ClientMistake,
        Some(500) => ProblemReason::ServerError,
        // TODO: 503/404 are not connection failures
        Some(_) | None => ProblemReason::ConnectionImpossible,
    }
}

/// Classifies a failed attempt.
///
/// Classification is a pure function: equal failures yield equal errors.
pub fn classify(failure: AttemptFailure) -> ApiError {
    let reason = reason_for_status(failure.status);
    ApiError::new(failure.cause, failure.status, failure.server_body, reason)
}
