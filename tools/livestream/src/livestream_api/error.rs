//! Typed failures that callers need to tell apart.
//!
//! Everything else travels as a plain [`eyre::Report`]. These types survive `.context(..)`
//! wrapping, so use [`is_not_found`] rather than matching on messages.

use http::StatusCode;

/// A non-success HTTP response from the Live Stream API.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Live Stream API returned {status}{}: {message}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
pub struct ApiError {
    pub status: StatusCode,
    /// Canonical status name from the error envelope, e.g. `NOT_FOUND`.
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND || self.code.as_deref() == Some("NOT_FOUND")
    }

    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }
}

/// A long-running operation that finished with an error status.
#[derive(Debug, Clone, thiserror::Error)]
#[error("operation {name} failed with code {code}: {message}")]
pub struct OperationFailed {
    pub name: String,
    /// `google.rpc.Code` value.
    pub code: i32,
    pub message: String,
}

/// A long-running operation that did not finish before its deadline.
#[derive(Debug, Clone, thiserror::Error)]
#[error("operation {name} did not complete within {waited:?}")]
pub struct OperationTimedOut {
    pub name: String,
    pub waited: std::time::Duration,
}

/// Returns true if any error in the chain is a not-found [`ApiError`].
pub fn is_not_found(err: &eyre::Report) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<ApiError>())
        .any(ApiError::is_not_found)
}
