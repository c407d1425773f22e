//! Live Stream API channel events. Read-only here; listed for display.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for `projects.locations.channels.events.list`.
///
/// See: <https://cloud.google.com/livestream/docs/reference/rest/v1/projects.locations.channels.events/list>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsResponse {
    #[serde(default)]
    pub events: VecDeque<Event>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub unreachable: Vec<String>,
}

/// An `Event` resource, such as an ad break or slate insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// `projects/{project}/locations/{location}/channels/{channelId}/events/{eventId}`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<jiff::Timestamp>,
    /// `SCHEDULED`, `RUNNING`, `SUCCEEDED`, `FAILED`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
