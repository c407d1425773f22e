//! Command-line and environment configuration for both tools.
//!
//! Arguments are parsed by clap into the `*Args` types and then turned into plain config
//! structs, which are what the flows receive.

use crate::livestream_api::InputType;
use crate::livestream_api::client::{ClientConfig, DEFAULT_ENDPOINT};
use crate::oauth::Credentials;
use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// A project + location pair. Every resource these tools touch lives under one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub project: String,
    pub location: String,
}

impl Scope {
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
        }
    }

    /// `projects/{project}/locations/{location}`.
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }

    pub fn input_name(&self, input_id: &str) -> String {
        format!("{}/inputs/{input_id}", self.parent())
    }

    pub fn channel_name(&self, channel_id: &str) -> String {
        format!("{}/channels/{channel_id}", self.parent())
    }
}

/// Parses durations such as `5s`, `2m 30s` or `PT10M`.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let signed: jiff::SignedDuration = s.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from(signed).map_err(|_| format!("duration must not be negative: {s}"))
}

/// Connection and scope options shared by both tools.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Google Cloud project ID or number
    #[arg(long, env = "LIVESTREAM_PROJECT")]
    pub project: String,

    /// Region hosting the Live Stream resources, e.g. us-central1
    #[arg(long, env = "LIVESTREAM_LOCATION")]
    pub location: String,

    /// Live Stream API endpoint
    #[arg(long, env = "LIVESTREAM_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Bearer token to use instead of application default credentials
    #[arg(long, env = "LIVESTREAM_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Path to an authorized_user credentials file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Timeout for each HTTP request
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub request_timeout: Duration,

    /// How long to wait for a long-running operation to finish
    #[arg(long, default_value = "10m", value_parser = parse_duration)]
    pub operation_timeout: Duration,

    /// Retries for reads that fail transiently
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,
}

impl CommonArgs {
    pub fn scope(&self) -> Scope {
        Scope::new(&self.project, &self.location)
    }

    /// Resolves credentials and builds the client configuration.
    pub fn client_config(&self) -> eyre::Result<ClientConfig> {
        Ok(ClientConfig {
            endpoint: self.endpoint.clone(),
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            credentials: Credentials::resolve(
                self.access_token.clone(),
                self.credentials.as_deref(),
            )?,
        })
    }
}

/// Create a Live Stream input and channel if needed, start the channel and watch its state.
#[derive(Debug, Parser)]
#[command(name = "create-stream", version)]
pub struct CreateStreamArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Suffix shared by the derived input and channel IDs
    #[arg(long, env = "LIVESTREAM_RUNNING_NUMBER", default_value = "01")]
    pub running_number: String,

    /// Input ID (default: livestream-input-<running-number>)
    #[arg(long)]
    pub input_id: Option<String>,

    /// Channel ID (default: livestream-channel-<running-number>)
    #[arg(long)]
    pub channel_id: Option<String>,

    /// Bucket receiving the output, written to gs://<bucket>/<input-id>
    #[arg(long, env = "LIVESTREAM_OUTPUT_BUCKET", required_unless_present = "output_uri")]
    pub output_bucket: Option<String>,

    /// Exact output URI, overriding --output-bucket
    #[arg(long, env = "LIVESTREAM_OUTPUT_URI")]
    pub output_uri: Option<String>,

    /// Ingest protocol for a newly created input (rtmp-push or srt-push)
    #[arg(long, default_value = "rtmp-push")]
    pub input_type: InputType,

    /// Channel template containing <GCS_OUTPUT> and <GCP_OTHER_INFO> placeholders
    #[arg(long, default_value = "request.json")]
    pub template: PathBuf,

    /// Directory receiving the <id>.json snapshot files
    #[arg(long, default_value = ".")]
    pub snapshot_dir: PathBuf,

    /// Interval between two streaming state reports
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub poll_interval: Duration,
}

/// Everything the provisioning flow needs.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub scope: Scope,
    pub input_id: String,
    pub channel_id: String,
    pub input_type: InputType,
    pub output_uri: String,
    pub template: PathBuf,
    pub snapshot_dir: PathBuf,
    pub poll_interval: Duration,
    pub operation_timeout: Duration,
}

impl ProvisionConfig {
    pub fn input_name(&self) -> String {
        self.scope.input_name(&self.input_id)
    }

    pub fn channel_name(&self) -> String {
        self.scope.channel_name(&self.channel_id)
    }
}

impl CreateStreamArgs {
    pub fn provision_config(&self) -> eyre::Result<ProvisionConfig> {
        let input_id = self
            .input_id
            .clone()
            .unwrap_or_else(|| format!("livestream-input-{}", self.running_number));
        let channel_id = self
            .channel_id
            .clone()
            .unwrap_or_else(|| format!("livestream-channel-{}", self.running_number));
        let output_uri = match (&self.output_uri, &self.output_bucket) {
            (Some(uri), _) => uri.clone(),
            (None, Some(bucket)) => format!(
                "gs://{}/{input_id}",
                bucket.trim_start_matches("gs://").trim_end_matches('/')
            ),
            (None, None) => eyre::bail!("one of --output-uri or --output-bucket is required"),
        };
        if self.poll_interval.is_zero() {
            eyre::bail!("--poll-interval must be greater than zero");
        }

        Ok(ProvisionConfig {
            scope: self.common.scope(),
            input_id,
            channel_id,
            input_type: self.input_type,
            output_uri,
            template: self.template.clone(),
            snapshot_dir: self.snapshot_dir.clone(),
            poll_interval: self.poll_interval,
            operation_timeout: self.common.operation_timeout,
        })
    }
}

/// Stop and delete every Live Stream channel, then delete every input, in one project/region.
#[derive(Debug, Parser)]
#[command(name = "delete-all", version)]
pub struct DeleteAllArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only list what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

/// Everything the teardown flow needs.
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    pub scope: Scope,
    pub operation_timeout: Duration,
    pub dry_run: bool,
}

impl DeleteAllArgs {
    pub fn teardown_config(&self) -> TeardownConfig {
        TeardownConfig {
            scope: self.common.scope(),
            operation_timeout: self.common.operation_timeout,
            dry_run: self.dry_run,
        }
    }
}
