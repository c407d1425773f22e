//! Live Stream API channel resources.
//!
//! A channel consumes one or more inputs and writes packaged segments and manifests to its
//! output URI. The encoding configuration (elementary streams, mux streams, manifests, ...) is
//! opaque to these tools: it comes from a template and is passed through untouched.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Response structure for `projects.locations.channels.list`.
///
/// See: <https://cloud.google.com/livestream/docs/reference/rest/v1/projects.locations.channels/list>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChannelsResponse {
    #[serde(default)]
    pub channels: VecDeque<Channel>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub unreachable: Vec<String>,
}

/// A `Channel` resource.
///
/// See: <https://cloud.google.com/livestream/docs/reference/rest/v1/projects.locations.channels#Channel>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// `projects/{project}/locations/{location}/channels/{channelId}`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_attachments: Vec<InputAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ChannelOutput>,
    /// Maintained by the service; never sent on create.
    #[serde(default, skip_serializing)]
    pub streaming_state: Option<StreamingState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<jiff::Timestamp>,
    /// Encoding, packaging and logging configuration, kept verbatim.
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl Channel {
    /// The output URI, or `""` when the channel has none.
    pub fn output_uri(&self) -> &str {
        self.output
            .as_ref()
            .map(|output| output.uri.as_str())
            .unwrap_or_default()
    }

    /// The streaming state, with an absent field read as unspecified.
    pub fn state(&self) -> StreamingState {
        self.streaming_state.unwrap_or_default()
    }
}

/// Attaches an input to a channel under a channel-local key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAttachment {
    pub key: String,
    /// Input resource name.
    pub input: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Where a channel writes its output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutput {
    /// A `gs://` bucket path.
    #[serde(default)]
    pub uri: String,
}

/// The streaming state of a channel as reported by the service.
///
/// See: <https://cloud.google.com/livestream/docs/reference/rest/v1/projects.locations.channels#streamingstate>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamingState {
    Streaming,
    AwaitingInput,
    StreamingError,
    StreamingNoInput,
    Stopped,
    Starting,
    Stopping,
    Updating,
    Deleting,
    /// Also what any state this client does not know about reads as.
    #[default]
    #[serde(rename = "STREAMING_STATE_UNSPECIFIED", other)]
    Unspecified,
}

impl StreamingState {
    /// Whether the channel is already running, so starting it again would be pointless.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Streaming | Self::AwaitingInput)
    }
}

impl fmt::Display for StreamingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspecified => "STREAMING_STATE_UNSPECIFIED",
            Self::Streaming => "STREAMING",
            Self::AwaitingInput => "AWAITING_INPUT",
            Self::StreamingError => "STREAMING_ERROR",
            Self::StreamingNoInput => "STREAMING_NO_INPUT",
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Stopping => "STOPPING",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
        };
        f.write_str(name)
    }
}
