use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use syndicate_common::Config;
use syndicate_store::SyncStore;

mod driver;
mod runner;
mod worker;

use driver::StoreDriver;
use worker::Worker;

const STARTUP_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("syndicate=info".parse()?))
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let store = Arc::new(SyncStore::connect(&config.database_url).await?);
    store.migrate().await?;
    tokio::time::timeout(STARTUP_PING_TIMEOUT, store.ping()).await??;

    let interval = Duration::from_secs(config.sync_interval_minutes * 60);
    // Platform adapters plug in here as they land; a build without any
    // still pushes targets.
    let driver = StoreDriver::new(store, config, Vec::new());
    let worker = Worker::new(Arc::new(driver), interval);
    worker.start();

    info!("Syndicate worker running, ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    worker.stop();
    info!("Shut down cleanly");

    Ok(())
}
