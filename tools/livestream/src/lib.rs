//! Provision and tear down Google Cloud Live Stream inputs and channels.
//!
//! The two binaries are thin wrappers: `create-stream` runs [`provision::provision`] and
//! `delete-all` runs [`teardown::run`]. Both talk to the service through
//! [`livestream_api::LiveStreamApi`].

pub mod config;
pub mod inventory;
pub mod lifecycle;
pub mod livestream_api;
pub mod oauth;
pub mod provision;
pub mod snapshot;
pub mod teardown;
pub mod template;

#[cfg(test)]
mod mock;

use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs the `tracing` subscriber used by both binaries.
///
/// Logs go to stderr so stdout only carries the JSON snapshots. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
