use clap::Parser;
use eyre::Context;
use livestream_tools::config::CreateStreamArgs;
use livestream_tools::livestream_api::LiveStreamClient;
use livestream_tools::provision;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    livestream_tools::init_tracing();

    let args = CreateStreamArgs::parse();
    let config = args.provision_config()?;
    let client = LiveStreamClient::new(args.common.client_config()?)
        .context("create Live Stream client")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("could not listen for ctrl-c: {e}");
                return;
            }
            tracing::info!("interrupted, shutting down");
            cancel.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    let summary = tokio::select! {
        biased;
        summary = provision::provision(&client, &config, &mut stdout, cancel.clone()) => summary?,
        // Interrupting a create or start wait leaves the operation running server-side.
        _ = cancel.cancelled() => return Ok(()),
    };
    tracing::debug!(polls = summary.polls, errors = summary.errors, "done");
    Ok(())
}
