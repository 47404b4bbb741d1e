//! Maps `anyhow` errors onto HTTP responses.
//!
//! Handlers, filters and admin tasks report failures as plain `anyhow::Error`s. Attaching an
//! [`ApiError`] via [`ResultExt`] or [`status_bail!`] decides the status the client sees, e.g.
//! `401` for rejected credentials or `404` for an unknown task. Errors without one become a
//! `500`.

use serde::Serialize;
use std::fmt::{Display, Formatter};
use warp::http::StatusCode;
use warp::reject::Reject;

/// The status and message rendered as `{"message": "..."}` for a failed request.
#[derive(Clone, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// HTTP status code of the response. Only used for the status line, never serialized.
    #[serde(skip)]
    pub status: StatusCode,
    /// Message shown to the client, usually the full context chain of the error.
    pub message: String,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Reject for ApiError {}

impl ApiError {
    /// Creates an error which is answered with the given status and message.
    pub fn new(status: StatusCode, message: impl ToString) -> Self {
        ApiError {
            status,
            message: message.to_string(),
        }
    }
}

/// Extension trait for attaching HTTP status codes to error results.
pub trait ResultExt<T> {
    /// Wraps the error with an [`ApiError`] carrying the given status code.
    fn with_status(self, status: StatusCode) -> Result<T, anyhow::Error>;

    /// Shorthand for `with_status(StatusCode::BAD_REQUEST)`, used for malformed input.
    fn mark_client_error(self) -> Result<T, anyhow::Error>;
}

impl<T> ResultExt<T> for Result<T, anyhow::Error> {
    fn with_status(self, status: StatusCode) -> Result<T, anyhow::Error> {
        self.map_err(|err| {
            let message = format!("{:#}", err);
            err.context(ApiError { status, message })
        })
    }

    fn mark_client_error(self) -> Result<T, anyhow::Error> {
        self.with_status(StatusCode::BAD_REQUEST)
    }
}

/// Returns early from an `anyhow::Result` function with the given status and message.
///
/// ```rust,ignore
/// let Some(task) = tasks.get(name) else {
///     status_bail!(StatusCode::NOT_FOUND, "Unknown task: {}", name);
/// };
/// ```
#[macro_export]
macro_rules! status_bail {
    ($status:expr, $msg:literal $(,)?) => {
        return $crate::web::error::ResultExt::with_status(Err(::anyhow::anyhow!($msg)), $status)
    };
    ($status:expr, $fmt:literal, $($arg:tt)*) => {
        return $crate::web::error::ResultExt::with_status(Err(::anyhow::anyhow!($fmt, $($arg)*)), $status)
    };
}
