//! Listing everything that exists in a project/location.

use crate::config::Scope;
use crate::livestream_api::{Channel, Event, Input, LiveStreamApi};
use eyre::Context;
use tokio_stream::{Stream, StreamExt};

/// Inputs, channels and per-channel events, in the order the service listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub inputs: Vec<Input>,
    /// Each channel with its events.
    pub channels: Vec<(Channel, Vec<Event>)>,
}

async fn drain<T>(stream: impl Stream<Item = eyre::Result<T>>) -> eyre::Result<Vec<T>> {
    let mut stream = std::pin::pin!(stream);
    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item?);
    }
    Ok(items)
}

pub async fn list_inputs(api: &impl LiveStreamApi, scope: &Scope) -> eyre::Result<Vec<Input>> {
    let parent = scope.parent();
    drain(api.list_inputs(&parent)).await.context("list inputs")
}

pub async fn list_channels(api: &impl LiveStreamApi, scope: &Scope) -> eyre::Result<Vec<Channel>> {
    let parent = scope.parent();
    drain(api.list_channels(&parent))
        .await
        .context("list channels")
}

/// Lists the events of channel `channel`.
pub async fn list_events(api: &impl LiveStreamApi, channel: &str) -> eyre::Result<Vec<Event>> {
    drain(api.list_events(channel))
        .await
        .with_context(|| format!("list events of {channel}"))
}

/// Lists and logs every input, every channel and the events of each channel.
///
/// Fails as soon as any listing fails.
pub async fn report(api: &impl LiveStreamApi, scope: &Scope) -> eyre::Result<Inventory> {
    let inputs = list_inputs(api, scope).await?;
    tracing::info!(count = inputs.len(), parent = %scope.parent(), "inputs");
    for input in &inputs {
        tracing::info!(
            input = %input.name,
            uri = input.uri.as_deref().unwrap_or_default(),
            "found input"
        );
    }

    let mut channels = Vec::new();
    for channel in list_channels(api, scope).await? {
        tracing::info!(
            channel = %channel.name,
            state = %channel.state(),
            output = channel.output_uri(),
            "found channel"
        );
        let events = list_events(api, &channel.name).await?;
        for event in &events {
            tracing::info!(
                channel = %channel.name,
                event = %event.name,
                state = event.state.as_deref().unwrap_or_default(),
                "found event"
            );
        }
        channels.push((channel, events));
    }
    tracing::info!(count = channels.len(), parent = %scope.parent(), "channels");

    Ok(Inventory { inputs, channels })
}
