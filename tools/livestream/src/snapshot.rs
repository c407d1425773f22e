//! JSON snapshots describing what was provisioned.
//!
//! Each ensure step writes one snapshot, both to stdout for the operator and to `<id>.json` for
//! whatever picks the stream up next (an encoder script, a player config, ...).

use eyre::Context;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where an input lives and where to push media to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Input resource name.
    #[serde(rename = "inputID")]
    pub input_id: String,
    /// Ingest URI.
    pub uri: String,
}

/// Which channel was provisioned, what it reads and where it writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Channel resource name.
    #[serde(rename = "channelID")]
    pub channel_id: String,
    /// Input resource name.
    #[serde(rename = "inputID")]
    pub input_id: String,
    /// Output URI.
    pub gcsoutput: String,
}

/// Pretty-prints `snapshot` to `out` (followed by a newline) and to `<dir>/<file_id>.json`.
///
/// The file is overwritten if it exists.
pub async fn write<T: Serialize>(
    snapshot: &T,
    file_id: &str,
    dir: &Path,
    out: &mut impl Write,
) -> eyre::Result<PathBuf> {
    let pretty = serde_json::to_string_pretty(snapshot).context("serialize snapshot")?;

    writeln!(out, "{pretty}").context("write snapshot to output")?;
    out.flush().context("flush output")?;

    let path = dir.join(format!("{file_id}.json"));
    tokio::fs::write(&path, &pretty)
        .await
        .with_context(|| format!("write snapshot file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote snapshot");
    Ok(path)
}
