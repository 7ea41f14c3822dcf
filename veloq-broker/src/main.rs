//! Broker binary.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use veloq_broker::Broker;
use veloq_cluster::{Member, StaticMembership};
use veloq_core::store::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "veloq", about = "Distributed message-queue and pub/sub broker")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "veloq.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> veloq_core::Result<()> {
    let args = Args::parse();
    let config = veloq_core::config::load_file(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.core.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A gossip adapter supplies the roster in clustered deployments; the
    // standalone binary runs as a single static member with an in-process
    // store. Swapping in durable collaborators is a wiring change here,
    // not a broker change.
    let local = Member::new(
        config.core.name.clone(),
        std::net::SocketAddr::from(([127, 0, 0, 1], config.core.port)),
    );
    let membership = Arc::new(StaticMembership::solo(local));
    let store = Arc::new(MemoryStore::new());

    let broker = Broker::new(&config, store, membership);
    if let Err(e) = broker.bootstrap().await {
        warn!(error = %e, "bootstrap sync failed; starting with empty registries");
    }
    let sync = broker.start_sync();

    let served = broker.serve().await;
    sync.shutdown().await;
    served
}
