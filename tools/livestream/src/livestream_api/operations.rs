//! Long-running operations returned by every mutating Live Stream API call.

use crate::livestream_api::error::{OperationFailed, OperationTimedOut};
use eyre::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// First delay between two polls of an unfinished operation.
pub const INITIAL_POLL_DELAY: Duration = Duration::from_secs(1);
/// Upper bound for the delay between polls.
pub const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

/// A `google.longrunning.Operation`.
///
/// Mutating calls return this immediately; [`super::LiveStreamApi::wait_operation`] polls it
/// until `done` is set.
///
/// See: <https://cloud.google.com/livestream/docs/reference/rest/v1/projects.locations.operations#Operation>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// `projects/{project}/locations/{location}/operations/{operationId}`.
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    /// The resource produced by the operation, present once `done` without `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A `google.rpc.Status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Turns a finished operation into an error if it failed.
    pub fn check(self) -> eyre::Result<Self> {
        match self.error {
            Some(status) => Err(OperationFailed {
                name: self.name,
                code: status.code,
                message: status.message,
            }
            .into()),
            None => Ok(self),
        }
    }

    /// Decodes the resource carried by a successfully finished operation.
    pub fn into_response<T: DeserializeOwned>(self) -> eyre::Result<T> {
        let op = self.check()?;
        let name = op.name;
        let response = op
            .response
            .ok_or_else(|| eyre::eyre!("operation {name} finished without a response"))?;
        serde_json::from_value(response)
            .with_context(|| format!("decode response of operation {name}"))
    }
}

/// Doubles `delay`, saturating at [`MAX_POLL_DELAY`].
pub(crate) fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_POLL_DELAY)
}

pub(crate) fn timed_out(name: &str, waited: Duration) -> eyre::Report {
    OperationTimedOut {
        name: name.to_string(),
        waited,
    }
    .into()
}
