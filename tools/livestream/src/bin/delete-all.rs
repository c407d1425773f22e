use clap::Parser;
use eyre::Context;
use livestream_tools::config::DeleteAllArgs;
use livestream_tools::livestream_api::LiveStreamClient;
use livestream_tools::teardown;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    livestream_tools::init_tracing();

    let args = DeleteAllArgs::parse();
    let config = args.teardown_config();
    let client = LiveStreamClient::new(args.common.client_config()?)
        .context("create Live Stream client")?;

    teardown::run(&client, &config).await?;
    Ok(())
}
