//! The provisioning flow: make sure an input and a channel exist, start the channel, watch it.
//!
//! Both ensure steps look the resource up first and only create it when the service reports it
//! as not found, so running the flow again with the same IDs never creates duplicates.

use crate::config::ProvisionConfig;
use crate::inventory;
use crate::lifecycle::{self, WatchSummary};
use crate::livestream_api::{Channel, Input, LiveStreamApi, is_not_found};
use crate::snapshot::{self, ChannelSnapshot, InputSnapshot};
use crate::template::{self, TemplateValues};
use eyre::Context;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Looks up the configured input, creating it if it does not exist yet.
///
/// Only a not-found lookup leads to creation. Any other lookup failure is returned as is.
pub async fn ensure_input(
    api: &impl LiveStreamApi,
    config: &ProvisionConfig,
    out: &mut impl Write,
) -> eyre::Result<InputSnapshot> {
    let name = config.input_name();
    let input = match api.get_input(&name).await {
        Ok(input) => {
            tracing::info!(input = %input.name, "input already exists");
            input
        }
        Err(e) if is_not_found(&e) => {
            tracing::info!(input = %name, input_type = %config.input_type, "creating input");
            let op = api
                .create_input(
                    &config.scope.parent(),
                    &config.input_id,
                    &Input::with_type(config.input_type),
                )
                .await
                .context("create input")?;
            let input: Input = api
                .wait_operation(op, config.operation_timeout)
                .await
                .context("await input creation")?
                .into_response()
                .context("read created input")?;
            tracing::info!(input = %input.name, "created input");
            input
        }
        Err(e) => return Err(e.wrap_err("get input")),
    };

    let snapshot = InputSnapshot {
        input_id: input.name,
        uri: input.uri.unwrap_or_default(),
    };
    snapshot::write(&snapshot, &config.input_id, &config.snapshot_dir, out).await?;
    Ok(snapshot)
}

/// Looks up the configured channel, creating it from the template if it does not exist yet.
///
/// The input must already exist when the channel is created.
pub async fn ensure_channel(
    api: &impl LiveStreamApi,
    config: &ProvisionConfig,
    out: &mut impl Write,
) -> eyre::Result<ChannelSnapshot> {
    let name = config.channel_name();
    let input_name = config.input_name();
    let channel = match api.get_channel(&name).await {
        Ok(channel) => {
            tracing::info!(channel = %channel.name, state = %channel.state(), "channel already exists");
            channel
        }
        Err(e) if is_not_found(&e) => {
            let request = template::load(
                &config.template,
                TemplateValues {
                    output_uri: &config.output_uri,
                    input_name: &input_name,
                },
            )
            .await?;
            tracing::info!(channel = %name, output = %config.output_uri, "creating channel");
            let op = api
                .create_channel(&config.scope.parent(), &config.channel_id, &request)
                .await
                .context("create channel")?;
            let channel: Channel = api
                .wait_operation(op, config.operation_timeout)
                .await
                .context("await channel creation")?
                .into_response()
                .context("read created channel")?;
            tracing::info!(channel = %channel.name, "created channel");
            channel
        }
        Err(e) => return Err(e.wrap_err("get channel")),
    };

    let snapshot = ChannelSnapshot {
        gcsoutput: channel.output_uri().to_string(),
        channel_id: channel.name,
        input_id: input_name,
    };
    snapshot::write(&snapshot, &config.channel_id, &config.snapshot_dir, out).await?;
    Ok(snapshot)
}

/// Runs the whole provisioning flow and then reports the channel state until `cancel` fires.
pub async fn provision(
    api: &impl LiveStreamApi,
    config: &ProvisionConfig,
    out: &mut impl Write,
    cancel: CancellationToken,
) -> eyre::Result<WatchSummary> {
    if let Err(e) = inventory::report(api, &config.scope).await {
        tracing::warn!("could not list existing resources: {e:#}");
    }

    ensure_input(api, config, out).await?;
    let channel = ensure_channel(api, config, out).await?;

    lifecycle::ensure_started(api, &channel.channel_id, config.operation_timeout).await?;
    Ok(lifecycle::watch_state(api, &channel.channel_id, config.poll_interval, cancel).await)
}
