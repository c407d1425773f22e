//! Client for the Google Cloud Live Stream API (`livestream.googleapis.com/v1`).
//!
//! # Resources
//!
//! ## [`inputs::Input`] - Ingest Endpoints
//! - **What it is**: the URI an encoder pushes RTMP or SRT media to
//! - **Lifecycle**: created once, attached to channels, deleted independently
//! - **Ordering**: must exist before a channel referencing it is created, and should outlive it
//!
//! ## [`channels::Channel`] - Processing Pipelines
//! - **What it is**: transcoding + packaging of attached inputs into segments and manifests
//! - **Lifecycle**: Stopped → Starting → Awaiting input → Streaming → Stopping → Stopped
//! - **Ordering**: must be stopped before it can be deleted
//!
//! ## [`events::Event`] - Channel Notifications
//! - Scheduled or immediate actions recorded against a channel; listed for display only.
//!
//! # Calls and operations
//!
//! Reads return the resource directly. Every mutating call returns an
//! [`operations::Operation`] right away; the work happens server-side and the caller waits for
//! it with [`LiveStreamApi::wait_operation`], which bounds the wait with a deadline.
//!
//! ```rust,no_run
//! use livestream_tools::livestream_api::{InputType, LiveStreamApi, LiveStreamClient};
//! use std::time::Duration;
//!
//! # async fn example(client: LiveStreamClient) -> eyre::Result<()> {
//! let op = client
//!     .create_input(
//!         "projects/my-project/locations/us-central1",
//!         "my-input",
//!         &livestream_tools::livestream_api::Input::with_type(InputType::RtmpPush),
//!     )
//!     .await?;
//! let done = client.wait_operation(op, Duration::from_secs(600)).await?;
//! println!("{:?}", done.response);
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod client;
pub mod error;
pub mod events;
pub mod inputs;
pub mod operations;
pub mod types;

pub use channels::{Channel, ChannelOutput, InputAttachment, StreamingState};
pub use client::LiveStreamClient;
pub use error::{ApiError, OperationFailed, OperationTimedOut, is_not_found};
pub use events::Event;
pub use inputs::{Input, InputType};
pub use operations::Operation;
pub use types::{Page, PagedStream};

use eyre::Context;
use operations::{INITIAL_POLL_DELAY, next_delay, timed_out};
use std::time::Duration;
use tokio_stream::Stream;

/// The remote calls the provisioning and teardown flows are built from.
///
/// [`LiveStreamClient`] implements this over HTTPS. The flows only ever see this trait, which
/// keeps them testable against an in-memory service.
#[allow(async_fn_in_trait)]
pub trait LiveStreamApi {
    async fn get_input(&self, name: &str) -> eyre::Result<Input>;

    /// Submits creation of `parent/inputs/{input_id}`.
    async fn create_input(
        &self,
        parent: &str,
        input_id: &str,
        input: &Input,
    ) -> eyre::Result<Operation>;

    async fn delete_input(&self, name: &str) -> eyre::Result<Operation>;

    /// Lazily lists every input under `parent`.
    fn list_inputs<'a>(&'a self, parent: &'a str)
    -> impl Stream<Item = eyre::Result<Input>> + 'a;

    async fn get_channel(&self, name: &str) -> eyre::Result<Channel>;

    /// Submits creation of `parent/channels/{channel_id}`.
    async fn create_channel(
        &self,
        parent: &str,
        channel_id: &str,
        channel: &Channel,
    ) -> eyre::Result<Operation>;

    async fn delete_channel(&self, name: &str) -> eyre::Result<Operation>;

    async fn start_channel(&self, name: &str) -> eyre::Result<Operation>;

    async fn stop_channel(&self, name: &str) -> eyre::Result<Operation>;

    /// Lazily lists every channel under `parent`.
    fn list_channels<'a>(
        &'a self,
        parent: &'a str,
    ) -> impl Stream<Item = eyre::Result<Channel>> + 'a;

    /// Lazily lists the events of the channel named `channel`.
    fn list_events<'a>(&'a self, channel: &'a str)
    -> impl Stream<Item = eyre::Result<Event>> + 'a;

    async fn get_operation(&self, name: &str) -> eyre::Result<Operation>;

    /// Polls `op` until it is done, or fails once `deadline` has elapsed.
    ///
    /// Polls back off exponentially from one second up to ten. A finished operation carrying an
    /// error status is returned as [`OperationFailed`]; running out of time yields
    /// [`OperationTimedOut`].
    async fn wait_operation(&self, op: Operation, deadline: Duration) -> eyre::Result<Operation> {
        let name = op.name.clone();
        let poll = async {
            let mut op = op;
            let mut delay = INITIAL_POLL_DELAY;
            loop {
                if op.done {
                    return op.check();
                }
                let polled = self
                    .get_operation(&op.name)
                    .await
                    .with_context(|| format!("poll operation {}", op.name))?;
                if !polled.done {
                    tracing::trace!(operation = %polled.name, ?delay, "operation still running");
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay);
                }
                op = polled;
            }
        };
        match tokio::time::timeout(deadline, poll).await {
            Ok(result) => result,
            Err(_) => Err(timed_out(&name, deadline)),
        }
    }
}
