// Third Party
use anyhow::Context;
use clap::Parser;
use kube::Client;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{error, info};

// Local
use namespace_isolator::{
    config::Args,
    utils::{init_tracing, EVENT_CHANNEL_CAPACITY},
    ClusterClient, EventChannel, Reconciler, WatchConfig, WatchController,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing("namespace_isolator", tracing::Level::INFO);

    let config = args.client_config().await?;
    let client = Client::try_from(config).context("building kubernetes client")?;
    let cluster = ClusterClient::new(&client);

    let (tx, rx) = EventChannel::bounded(EVENT_CHANNEL_CAPACITY)?;
    let controller = WatchController::new(
        cluster.clone(),
        WatchConfig::default(),
        StdRng::from_entropy(),
    )?;
    let reconciler = Reconciler::new(cluster);

    info!("Starting namespace isolator");
    let watch = tokio::spawn(controller.run(tx));

    // The watcher only returns on a fatal error. Exit then, without draining the channel.
    tokio::select! {
        result = watch => {
            let error = match result.context("namespace watcher panicked")? {
                Ok(never) => match never {},
                Err(error) => error,
            };
            error!("Namespace watcher failed: {}", error);
            Err(error.into())
        }
        _ = reconciler.run(rx) => {
            Err(anyhow::anyhow!("event channel closed unexpectedly"))
        }
    }
}
