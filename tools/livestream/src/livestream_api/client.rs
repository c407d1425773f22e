//! HTTPS implementation of [`LiveStreamApi`].

use crate::livestream_api::channels::ListChannelsResponse;
use crate::livestream_api::events::ListEventsResponse;
use crate::livestream_api::inputs::ListInputsResponse;
use crate::livestream_api::types::{ErrorEnvelope, PAGE_SIZE, Page, PagedStream};
use crate::livestream_api::{ApiError, Channel, Event, Input, LiveStreamApi, Operation};
use crate::oauth::{Credentials, TokenSource};
use eyre::Context;
use http::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::instrument;

/// Production endpoint of the Live Stream API.
pub const DEFAULT_ENDPOINT: &str = "https://livestream.googleapis.com";

/// Delay before the first retry of a transient failure; doubled on every further attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
/// Upper bound for the delay between two retries.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Connection settings for [`LiveStreamClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host, without the `/v1` suffix.
    pub endpoint: String,
    /// Upper bound on any single HTTP request.
    pub request_timeout: Duration,
    /// How often a transient failure of a read is retried.
    pub max_retries: u32,
    pub credentials: Credentials,
}

/// Client for the Live Stream API v1 REST surface.
///
/// Every request carries a bearer token from the configured [`Credentials`], refreshed ahead of
/// expiry. Reads are retried with exponential backoff on transient failures (throttling, 5xx,
/// connection errors, timeouts). Mutating calls are sent exactly once: they return an
/// [`Operation`] and a blind retry could submit the same change twice.
#[derive(Debug, Clone)]
pub struct LiveStreamClient {
    tokens: Arc<TokenSource>,
    client: reqwest::Client,
    base_url: String,
    quota_project: Option<String>,
    max_retries: u32,
}

impl LiveStreamClient {
    pub fn new(config: ClientConfig) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            tokens: Arc::new(TokenSource::new(&config.credentials)),
            client,
            base_url: format!("{}/v1", config.endpoint.trim_end_matches('/')),
            quota_project: config.credentials.quota_project().map(str::to_string),
            max_retries: config.max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends one authenticated request and turns error responses into [`ApiError`].
    #[instrument(skip(self, json_body), level = tracing::Level::TRACE)]
    async fn send(
        &self,
        method: &Method,
        url: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&(impl Serialize + Sync)>,
    ) -> eyre::Result<reqwest::Response> {
        let access_token = self.tokens.access_token().await?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query_params);
        if let Some(project) = &self.quota_project {
            request = request.header("x-goog-user-project", project);
        }
        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("send {method} request to Live Stream API: {url}"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        Err(api_error(status, &body).into())
    }

    /// Like [`Self::send`], but retries transient failures of idempotent reads.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&(impl Serialize + Sync)>,
    ) -> eyre::Result<T> {
        let url = self.url(path);
        let retries = if method == Method::GET {
            self.max_retries
        } else {
            0
        };

        let mut attempt = 0;
        let response = loop {
            match self.send(&method, &url, query_params, json_body).await {
                Ok(response) => break response,
                Err(e) if attempt < retries && is_transient(&e) => {
                    let delay = retry_delay(attempt);
                    attempt += 1;
                    tracing::warn!(%url, attempt, ?delay, "transient failure, retrying: {e:#}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        response
            .json()
            .await
            .with_context(|| format!("parse Live Stream API response from {url} as JSON"))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query_params: &[(&str, &str)],
    ) -> eyre::Result<T> {
        self.request(Method::GET, path, query_params, None::<&()>)
            .await
    }

    /// Fetches one page of `{parent}/{collection}`.
    async fn list_page<R: DeserializeOwned>(
        &self,
        parent: &str,
        collection: &str,
        page_token: Option<String>,
    ) -> eyre::Result<R> {
        let page_size = PAGE_SIZE.to_string();
        let mut query_params = vec![("pageSize", page_size.as_str())];
        if let Some(token) = page_token.as_deref() {
            query_params.push(("pageToken", token));
        }
        self.get(&format!("{parent}/{collection}"), &query_params)
            .await
    }
}

impl LiveStreamApi for LiveStreamClient {
    #[instrument(skip(self))]
    async fn get_input(&self, name: &str) -> eyre::Result<Input> {
        self.get(name, &[]).await
    }

    #[instrument(skip(self, input))]
    async fn create_input(
        &self,
        parent: &str,
        input_id: &str,
        input: &Input,
    ) -> eyre::Result<Operation> {
        let op: Operation = self
            .request(
                Method::POST,
                &format!("{parent}/inputs"),
                &[("inputId", input_id)],
                Some(input),
            )
            .await?;
        tracing::debug!(operation = %op.name, "submitted input creation");
        Ok(op)
    }

    #[instrument(skip(self))]
    async fn delete_input(&self, name: &str) -> eyre::Result<Operation> {
        self.request(Method::DELETE, name, &[], None::<&()>).await
    }

    fn list_inputs<'a>(
        &'a self,
        parent: &'a str,
    ) -> impl Stream<Item = eyre::Result<Input>> + 'a {
        PagedStream::new(move |page_token| async move {
            let response: ListInputsResponse =
                self.list_page(parent, "inputs", page_token).await?;
            warn_unreachable(&response.unreachable);
            tracing::debug!(returned_items = response.inputs.len(), "fetched inputs");
            Ok(Page::new(response.inputs, response.next_page_token))
        })
    }

    #[instrument(skip(self))]
    async fn get_channel(&self, name: &str) -> eyre::Result<Channel> {
        self.get(name, &[]).await
    }

    #[instrument(skip(self, channel))]
    async fn create_channel(
        &self,
        parent: &str,
        channel_id: &str,
        channel: &Channel,
    ) -> eyre::Result<Operation> {
        let op: Operation = self
            .request(
                Method::POST,
                &format!("{parent}/channels"),
                &[("channelId", channel_id)],
                Some(channel),
            )
            .await?;
        tracing::debug!(operation = %op.name, "submitted channel creation");
        Ok(op)
    }

    #[instrument(skip(self))]
    async fn delete_channel(&self, name: &str) -> eyre::Result<Operation> {
        self.request(Method::DELETE, name, &[], None::<&()>).await
    }

    #[instrument(skip(self))]
    async fn start_channel(&self, name: &str) -> eyre::Result<Operation> {
        self.request(
            Method::POST,
            &format!("{name}:start"),
            &[],
            Some(&serde_json::json!({})),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn stop_channel(&self, name: &str) -> eyre::Result<Operation> {
        self.request(
            Method::POST,
            &format!("{name}:stop"),
            &[],
            Some(&serde_json::json!({})),
        )
        .await
    }

    fn list_channels<'a>(
        &'a self,
        parent: &'a str,
    ) -> impl Stream<Item = eyre::Result<Channel>> + 'a {
        PagedStream::new(move |page_token| async move {
            let response: ListChannelsResponse =
                self.list_page(parent, "channels", page_token).await?;
            warn_unreachable(&response.unreachable);
            tracing::debug!(returned_items = response.channels.len(), "fetched channels");
            Ok(Page::new(response.channels, response.next_page_token))
        })
    }

    fn list_events<'a>(
        &'a self,
        channel: &'a str,
    ) -> impl Stream<Item = eyre::Result<Event>> + 'a {
        PagedStream::new(move |page_token| async move {
            let response: ListEventsResponse =
                self.list_page(channel, "events", page_token).await?;
            warn_unreachable(&response.unreachable);
            tracing::debug!(returned_items = response.events.len(), "fetched events");
            Ok(Page::new(response.events, response.next_page_token))
        })
    }

    #[instrument(skip(self), level = tracing::Level::DEBUG)]
    async fn get_operation(&self, name: &str) -> eyre::Result<Operation> {
        self.get(name, &[]).await
    }
}

fn warn_unreachable(unreachable: &[String]) {
    if !unreachable.is_empty() {
        tracing::warn!(?unreachable, "some locations could not be reached while listing");
    }
}

/// Decodes a Google error envelope, falling back to the raw body for anything else.
fn api_error(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => ApiError {
            status,
            code: error.status,
            message: error.message,
        },
        Err(_) => ApiError {
            status,
            code: None,
            message: body.trim().to_string(),
        },
    }
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(RETRY_MAX_DELAY)
}

fn is_transient(err: &eyre::Report) -> bool {
    err.chain().any(|e| {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            api.is_transient()
        } else if let Some(request) = e.downcast_ref::<reqwest::Error>() {
            request.is_timeout() || request.is_connect()
        } else {
            false
        }
    })
}
