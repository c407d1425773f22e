//! Starting a channel and watching its streaming state.

use crate::livestream_api::{LiveStreamApi, StreamingState};
use eyre::Context;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What [`ensure_started`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The channel was already running in the given state; no start request was issued.
    AlreadyActive(StreamingState),
    Started,
}

/// Counters from a finished [`watch_state`] loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub polls: u64,
    pub errors: u64,
}

/// Fetches the current streaming state of channel `name`.
pub async fn get_state(api: &impl LiveStreamApi, name: &str) -> eyre::Result<StreamingState> {
    let channel = api.get_channel(name).await.context("get channel state")?;
    Ok(channel.state())
}

/// Starts channel `name` unless it is already streaming or awaiting input.
///
/// When a start is issued, this returns once its operation has finished.
pub async fn ensure_started(
    api: &impl LiveStreamApi,
    name: &str,
    deadline: Duration,
) -> eyre::Result<StartOutcome> {
    let state = get_state(api, name).await?;
    if state.is_active() {
        tracing::info!(channel = %name, %state, "channel is already active, not starting it");
        return Ok(StartOutcome::AlreadyActive(state));
    }

    tracing::info!(channel = %name, %state, "starting channel");
    let op = api.start_channel(name).await.context("start channel")?;
    api.wait_operation(op, deadline)
        .await
        .context("await start operation")?;
    tracing::info!(channel = %name, "channel started");
    Ok(StartOutcome::Started)
}

/// Logs the streaming state of channel `name` every `interval` until `cancel` fires.
///
/// The first report is immediate. A failed fetch is logged and counted; the loop keeps going.
pub async fn watch_state(
    api: &impl LiveStreamApi,
    name: &str,
    interval: Duration,
    cancel: CancellationToken,
) -> WatchSummary {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = WatchSummary::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        summary.polls += 1;
        match get_state(api, name).await {
            Ok(state) => tracing::info!(channel = %name, %state, "streaming state"),
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(channel = %name, "failed to fetch streaming state: {e:#}");
            }
        }
    }

    tracing::info!(
        channel = %name,
        polls = summary.polls,
        errors = summary.errors,
        "stopped watching channel"
    );
    summary
}
