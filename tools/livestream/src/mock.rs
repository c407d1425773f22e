//! In-memory Live Stream service for tests.
//!
//! [`MockLiveStream`] implements [`LiveStreamApi`] against a small model of the real service:
//! mutating calls only take effect once their operation is polled, channels must be stopped
//! before they can be deleted, inputs cannot be deleted while a channel still references them,
//! and listings are paginated. Every call is recorded so tests can assert on ordering, and any
//! call can be made to fail.

use crate::livestream_api::types::Page;
use crate::livestream_api::{
    ApiError, Channel, Event, Input, LiveStreamApi, Operation, PagedStream, StreamingState,
    operations::Status,
};
use http::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio_stream::Stream;

/// A recorded call, keyed by the resource it targeted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Call {
    GetInput(String),
    CreateInput(String),
    DeleteInput(String),
    ListInputs { page_token: Option<String> },
    GetChannel(String),
    CreateChannel(String),
    DeleteChannel(String),
    StartChannel(String),
    StopChannel(String),
    ListChannels { page_token: Option<String> },
    ListEvents { channel: String, page_token: Option<String> },
    /// Polling the operation submitted by the given call.
    Wait(Box<Call>),
}

/// How an injected failure manifests.
#[derive(Debug, Clone)]
pub(crate) enum Failure {
    /// The request is answered with this HTTP status.
    Status(StatusCode),
    /// The request never gets an answer.
    Transport,
    /// The request is accepted but its operation finishes with this `google.rpc.Code`.
    Operation(i32),
    /// The request is accepted but its operation never finishes.
    Hang,
}

#[derive(Debug)]
enum Effect {
    CreateInput(Input),
    DeleteInput(String),
    CreateChannel(Channel),
    DeleteChannel(String),
    SetState(String, StreamingState),
}

#[derive(Debug)]
struct PendingOperation {
    submitted_by: Call,
    effect: Effect,
    failure: Option<Failure>,
}

#[derive(Debug, Default)]
struct State {
    inputs: Vec<Input>,
    channels: Vec<Channel>,
    events: HashMap<String, Vec<Event>>,
    operations: HashMap<String, PendingOperation>,
    next_operation: u32,
    calls: Vec<Call>,
    failures: HashMap<Call, Failure>,
}

#[derive(Debug)]
pub(crate) struct MockLiveStream {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for MockLiveStream {
    fn default() -> Self {
        Self::new()
    }
}

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> eyre::Report {
    ApiError {
        status,
        code: Some(code.to_string()),
        message: message.into(),
    }
    .into()
}

fn id_of(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

impl MockLiveStream {
    /// An empty project; listings return two resources per page.
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 2,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn with_input(self, name: &str) -> Self {
        self.state().inputs.push(Input {
            name: name.to_string(),
            input_type: Some(crate::livestream_api::InputType::RtmpPush),
            uri: Some(format!("rtmp://203.0.113.10/live/{}", id_of(name))),
            ..Default::default()
        });
        self
    }

    pub(crate) fn with_channel(
        self,
        name: &str,
        input_name: &str,
        output_uri: &str,
        state: StreamingState,
    ) -> Self {
        self.state().channels.push(Channel {
            name: name.to_string(),
            input_attachments: vec![crate::livestream_api::InputAttachment {
                key: "primary-input".to_string(),
                input: input_name.to_string(),
                extra: Default::default(),
            }],
            output: Some(crate::livestream_api::ChannelOutput {
                uri: output_uri.to_string(),
            }),
            streaming_state: Some(state),
            ..Default::default()
        });
        self
    }

    pub(crate) fn with_event(self, channel: &str, event_id: &str) -> Self {
        self.state()
            .events
            .entry(channel.to_string())
            .or_default()
            .push(Event {
                name: format!("{channel}/events/{event_id}"),
                state: Some("SCHEDULED".to_string()),
                ..Default::default()
            });
        self
    }

    /// Makes every future `call` fail with `failure`.
    pub(crate) fn fail_on(&self, call: Call, failure: Failure) {
        self.state().failures.insert(call, failure);
    }

    pub(crate) fn clear_failure(&self, call: &Call) {
        self.state().failures.remove(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn input_names(&self) -> Vec<String> {
        self.state().inputs.iter().map(|i| i.name.clone()).collect()
    }

    pub(crate) fn channel_names(&self) -> Vec<String> {
        self.state().channels.iter().map(|c| c.name.clone()).collect()
    }

    pub(crate) fn channel(&self, name: &str) -> Option<Channel> {
        self.state().channels.iter().find(|c| c.name == name).cloned()
    }

    /// Records `call` and returns the failure injected for it, if any.
    fn record(&self, call: Call) -> Result<Option<Failure>, eyre::Report> {
        let mut state = self.state();
        state.calls.push(call.clone());
        match state.failures.get(&call) {
            None => Ok(None),
            Some(failure @ (Failure::Operation(_) | Failure::Hang)) => Ok(Some(failure.clone())),
            Some(Failure::Status(status)) => Err(api_error(
                *status,
                status.canonical_reason().unwrap_or("ERROR"),
                format!("injected failure for {call:?}"),
            )),
            Some(Failure::Transport) => Err(eyre::eyre!("connection reset by peer")),
        }
    }

    fn submit(&self, call: Call, effect: Effect) -> eyre::Result<Operation> {
        let failure = self.record(call.clone())?;
        let mut state = self.state();
        state.next_operation += 1;
        let name = format!("operations/operation-{}", state.next_operation);
        state.operations.insert(
            name.clone(),
            PendingOperation {
                submitted_by: call,
                effect,
                failure,
            },
        );
        Ok(Operation {
            name,
            done: false,
            ..Default::default()
        })
    }

    fn page<T: Clone>(
        &self,
        call: Call,
        page_token: Option<String>,
        items: impl FnOnce(&State) -> Vec<T>,
    ) -> eyre::Result<Page<T>> {
        self.record(call)?;
        let all = items(&self.state());
        let start: usize = page_token.as_deref().map_or(Ok(0), str::parse)?;
        let end = (start + self.page_size).min(all.len());
        let next = (end < all.len()).then(|| end.to_string());
        Ok(Page::new(all[start..end].iter().cloned().collect::<VecDeque<_>>(), next))
    }

    fn apply(state: &mut State, effect: Effect) -> Result<Option<serde_json::Value>, Status> {
        let precondition = |message: String| Status {
            code: 9,
            message,
        };
        match effect {
            Effect::CreateInput(input) => {
                state.inputs.push(input.clone());
                Ok(serde_json::to_value(input).ok())
            }
            Effect::DeleteInput(name) => {
                if let Some(user) = state.channels.iter().find(|c| {
                    c.input_attachments.iter().any(|a| a.input == name)
                }) {
                    return Err(precondition(format!(
                        "input {name} is still attached to {}",
                        user.name
                    )));
                }
                state.inputs.retain(|i| i.name != name);
                Ok(None)
            }
            Effect::CreateChannel(channel) => {
                state.channels.push(channel.clone());
                Ok(serde_json::to_value(channel).ok())
            }
            Effect::DeleteChannel(name) => {
                let stopped = state
                    .channels
                    .iter()
                    .find(|c| c.name == name)
                    .is_some_and(|c| c.state() == StreamingState::Stopped);
                if !stopped {
                    return Err(precondition(format!("channel {name} is not stopped")));
                }
                state.channels.retain(|c| c.name != name);
                state.events.remove(&name);
                Ok(None)
            }
            Effect::SetState(name, streaming_state) => {
                let channel = state
                    .channels
                    .iter_mut()
                    .find(|c| c.name == name)
                    .ok_or_else(|| Status {
                        code: 5,
                        message: format!("channel {name} not found"),
                    })?;
                if streaming_state == StreamingState::Stopped
                    && channel.state() == StreamingState::Stopped
                {
                    return Err(precondition(format!("channel {name} is already stopped")));
                }
                channel.streaming_state = Some(streaming_state);
                Ok(serde_json::to_value(&*channel).ok())
            }
        }
    }
}

impl LiveStreamApi for MockLiveStream {
    async fn get_input(&self, name: &str) -> eyre::Result<Input> {
        self.record(Call::GetInput(name.to_string()))?;
        self.state()
            .inputs
            .iter()
            .find(|i| i.name == name)
            .cloned()
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{name} not found")))
    }

    async fn create_input(
        &self,
        parent: &str,
        input_id: &str,
        input: &Input,
    ) -> eyre::Result<Operation> {
        let name = format!("{parent}/inputs/{input_id}");
        if self.state().inputs.iter().any(|i| i.name == name) {
            return Err(api_error(StatusCode::CONFLICT, "ALREADY_EXISTS", name));
        }
        let created = Input {
            name: name.clone(),
            uri: Some(format!("rtmp://203.0.113.10/live/{input_id}")),
            ..input.clone()
        };
        self.submit(Call::CreateInput(name), Effect::CreateInput(created))
    }

    async fn delete_input(&self, name: &str) -> eyre::Result<Operation> {
        self.submit(
            Call::DeleteInput(name.to_string()),
            Effect::DeleteInput(name.to_string()),
        )
    }

    fn list_inputs<'a>(
        &'a self,
        _parent: &'a str,
    ) -> impl Stream<Item = eyre::Result<Input>> + 'a {
        PagedStream::new(move |page_token: Option<String>| {
            let page = self.page(
                Call::ListInputs {
                    page_token: page_token.clone(),
                },
                page_token,
                |s| s.inputs.clone(),
            );
            async move { page }
        })
    }

    async fn get_channel(&self, name: &str) -> eyre::Result<Channel> {
        self.record(Call::GetChannel(name.to_string()))?;
        self.channel(name)
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{name} not found")))
    }

    async fn create_channel(
        &self,
        parent: &str,
        channel_id: &str,
        channel: &Channel,
    ) -> eyre::Result<Operation> {
        let name = format!("{parent}/channels/{channel_id}");
        {
            let state = self.state();
            if state.channels.iter().any(|c| c.name == name) {
                return Err(api_error(StatusCode::CONFLICT, "ALREADY_EXISTS", name));
            }
            for attachment in &channel.input_attachments {
                if !state.inputs.iter().any(|i| i.name == attachment.input) {
                    return Err(api_error(
                        StatusCode::BAD_REQUEST,
                        "INVALID_ARGUMENT",
                        format!("input {} does not exist", attachment.input),
                    ));
                }
            }
        }
        let created = Channel {
            name: name.clone(),
            streaming_state: Some(StreamingState::Stopped),
            ..channel.clone()
        };
        self.submit(Call::CreateChannel(name), Effect::CreateChannel(created))
    }

    async fn delete_channel(&self, name: &str) -> eyre::Result<Operation> {
        self.submit(
            Call::DeleteChannel(name.to_string()),
            Effect::DeleteChannel(name.to_string()),
        )
    }

    async fn start_channel(&self, name: &str) -> eyre::Result<Operation> {
        self.submit(
            Call::StartChannel(name.to_string()),
            Effect::SetState(name.to_string(), StreamingState::AwaitingInput),
        )
    }

    async fn stop_channel(&self, name: &str) -> eyre::Result<Operation> {
        self.submit(
            Call::StopChannel(name.to_string()),
            Effect::SetState(name.to_string(), StreamingState::Stopped),
        )
    }

    fn list_channels<'a>(
        &'a self,
        _parent: &'a str,
    ) -> impl Stream<Item = eyre::Result<Channel>> + 'a {
        PagedStream::new(move |page_token: Option<String>| {
            let page = self.page(
                Call::ListChannels {
                    page_token: page_token.clone(),
                },
                page_token,
                |s| s.channels.clone(),
            );
            async move { page }
        })
    }

    fn list_events<'a>(
        &'a self,
        channel: &'a str,
    ) -> impl Stream<Item = eyre::Result<Event>> + 'a {
        PagedStream::new(move |page_token: Option<String>| {
            let page = self.page(
                Call::ListEvents {
                    channel: channel.to_string(),
                    page_token: page_token.clone(),
                },
                page_token,
                |s| s.events.get(channel).cloned().unwrap_or_default(),
            );
            async move { page }
        })
    }

    async fn get_operation(&self, name: &str) -> eyre::Result<Operation> {
        let Some(pending) = self.state().operations.remove(name) else {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("operation {name} not found"),
            ));
        };
        self.record(Call::Wait(Box::new(pending.submitted_by.clone())))?;

        let outcome = match pending.failure {
            Some(Failure::Hang) => {
                self.state().operations.insert(name.to_string(), pending);
                return Ok(Operation {
                    name: name.to_string(),
                    ..Default::default()
                });
            }
            Some(Failure::Operation(code)) => Err(Status {
                code,
                message: format!("injected failure for {:?}", pending.submitted_by),
            }),
            _ => Self::apply(&mut self.state(), pending.effect),
        };
        let (response, error) = match outcome {
            Ok(response) => (response, None),
            Err(status) => (None, Some(status)),
        };
        Ok(Operation {
            name: name.to_string(),
            done: true,
            error,
            response,
            metadata: None,
        })
    }
}
