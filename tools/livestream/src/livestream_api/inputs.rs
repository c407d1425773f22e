//! Live Stream API input resources.
//!
//! An input is the ingest endpoint an encoder pushes media to. Channels reference inputs by
//! resource name, so an input has to exist before any channel that attaches it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Response structure for `projects.locations.inputs.list`.
///
/// See: <https://cloud.google.com/livestream/docs/reference/rest/v1/projects.locations.inputs/list>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInputsResponse {
    #[serde(default)]
    pub inputs: VecDeque<Input>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    /// Locations that could not be reached while listing.
    #[serde(default)]
    pub unreachable: Vec<String>,
}

/// An `Input` resource.
///
/// Only the fields these tools act on are typed. Everything else the service returns is kept in
/// [`Input::extra`] so nothing is lost when an input is echoed back.
///
/// See: <https://cloud.google.com/livestream/docs/reference/rest/v1/projects.locations.inputs#Input>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    /// `projects/{project}/locations/{location}/inputs/{inputId}`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
    /// `SD`, `HD` or `UHD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// The ingest URI the encoder should push to. Assigned by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<jiff::Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<jiff::Timestamp>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Input {
    /// A create request body for an input of the given protocol.
    pub fn with_type(input_type: InputType) -> Self {
        Self {
            input_type: Some(input_type),
            ..Default::default()
        }
    }
}

/// How media is delivered to an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    #[serde(rename = "TYPE_UNSPECIFIED")]
    Unspecified,
    /// RTMP push; the encoder connects to the input's URI.
    #[default]
    RtmpPush,
    /// SRT push.
    SrtPush,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "TYPE_UNSPECIFIED"),
            Self::RtmpPush => write!(f, "RTMP_PUSH"),
            Self::SrtPush => write!(f, "SRT_PUSH"),
        }
    }
}

impl std::str::FromStr for InputType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "RTMP_PUSH" | "RTMP" => Ok(Self::RtmpPush),
            "SRT_PUSH" | "SRT" => Ok(Self::SrtPush),
            other => Err(eyre::eyre!("unsupported input type: {other}")),
        }
    }
}
