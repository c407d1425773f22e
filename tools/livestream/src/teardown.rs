//! The teardown flow: stop and delete every channel, then delete every input.
//!
//! Teardown is best-effort. A failed stop is logged and the delete is attempted anyway; a resource
//! that cannot be deleted is logged and skipped. Nothing is rolled back, and whatever is left over
//! shows up the next time resources are listed.

use crate::config::{Scope, TeardownConfig};
use crate::inventory;
use crate::livestream_api::{Channel, LiveStreamApi, StreamingState};
use eyre::Context;
use std::time::Duration;

/// How one pass over a kind of resource went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl PassReport {
    fn record(&mut self, result: eyre::Result<()>) -> eyre::Result<()> {
        self.attempted += 1;
        match &result {
            Ok(()) => self.deleted += 1,
            Err(_) => self.failed += 1,
        }
        result
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub channels: PassReport,
    pub inputs: PassReport,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.channels.failed == 0 && self.inputs.failed == 0
    }
}

async fn stop_channel(api: &impl LiveStreamApi, name: &str, deadline: Duration) -> eyre::Result<()> {
    let op = api.stop_channel(name).await.context("stop channel")?;
    api.wait_operation(op, deadline)
        .await
        .context("await stop operation")?;
    Ok(())
}

/// Stops `channel` unless it already is, then deletes it.
///
/// A failed stop does not prevent the delete; only the delete decides the outcome.
async fn delete_channel(
    api: &impl LiveStreamApi,
    channel: &Channel,
    deadline: Duration,
) -> eyre::Result<()> {
    let name = channel.name.as_str();
    if channel.state() == StreamingState::Stopped {
        tracing::debug!(channel = %name, "channel already stopped");
    } else {
        match stop_channel(api, name, deadline).await {
            Ok(()) => tracing::info!(channel = %name, "stopped channel"),
            Err(e) => tracing::warn!(channel = %name, "could not stop channel: {e:#}"),
        }
    }

    let op = api.delete_channel(name).await.context("delete channel")?;
    api.wait_operation(op, deadline)
        .await
        .context("await delete operation")?;
    Ok(())
}

/// Stops, then deletes, every channel in `scope`.
///
/// Only the listing can fail this call. Per-channel failures are logged and counted.
pub async fn delete_all_channels(
    api: &impl LiveStreamApi,
    scope: &Scope,
    deadline: Duration,
) -> eyre::Result<PassReport> {
    let mut report = PassReport::default();
    for channel in inventory::list_channels(api, scope).await? {
        tracing::info!(channel = %channel.name, state = %channel.state(), "deleting channel");
        match report.record(delete_channel(api, &channel, deadline).await) {
            Ok(()) => tracing::info!(channel = %channel.name, "deleted channel"),
            Err(e) => tracing::error!(channel = %channel.name, "could not delete channel: {e:#}"),
        }
    }
    Ok(report)
}

/// Deletes every input in `scope`.
///
/// Only the listing can fail this call. Per-input failures are logged and counted.
pub async fn delete_all_inputs(
    api: &impl LiveStreamApi,
    scope: &Scope,
    deadline: Duration,
) -> eyre::Result<PassReport> {
    let mut report = PassReport::default();
    for input in inventory::list_inputs(api, scope).await? {
        tracing::info!(input = %input.name, "deleting input");
        let deleted = async {
            let op = api.delete_input(&input.name).await.context("delete input")?;
            api.wait_operation(op, deadline)
                .await
                .context("await delete operation")?;
            Ok::<_, eyre::Report>(())
        };
        match report.record(deleted.await) {
            Ok(()) => tracing::info!(input = %input.name, "deleted input"),
            Err(e) => tracing::error!(input = %input.name, "could not delete input: {e:#}"),
        }
    }
    Ok(report)
}

/// Deletes all channels, then all inputs.
///
/// The input pass runs even if the channels could not be listed, since inputs that no channel
/// references can still be removed.
pub async fn teardown(api: &impl LiveStreamApi, scope: &Scope, deadline: Duration) -> TeardownReport {
    let channels = delete_all_channels(api, scope, deadline)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("could not delete channels: {e:#}");
            PassReport::default()
        });
    let inputs = delete_all_inputs(api, scope, deadline)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("could not delete inputs: {e:#}");
            PassReport::default()
        });
    TeardownReport { channels, inputs }
}

/// Reports what exists, then tears it down unless this is a dry run.
///
/// Returns `None` for a dry run. A failure to produce the initial report aborts before anything
/// is deleted.
pub async fn run(
    api: &impl LiveStreamApi,
    config: &TeardownConfig,
) -> eyre::Result<Option<TeardownReport>> {
    let existing = inventory::report(api, &config.scope)
        .await
        .context("list resources before teardown")?;
    if config.dry_run {
        tracing::info!(
            channels = existing.channels.len(),
            inputs = existing.inputs.len(),
            "dry run, nothing deleted"
        );
        return Ok(None);
    }

    let report = teardown(api, &config.scope, config.operation_timeout).await;
    if report.is_clean() {
        tracing::info!(
            channels = report.channels.deleted,
            inputs = report.inputs.deleted,
            "teardown complete"
        );
    } else {
        tracing::warn!(
            channels_deleted = report.channels.deleted,
            channels_failed = report.channels.failed,
            inputs_deleted = report.inputs.deleted,
            inputs_failed = report.inputs.failed,
            "teardown finished with failures"
        );
    }
    Ok(Some(report))
}
