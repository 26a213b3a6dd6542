//! mirror-daemon: polls external task platforms and mirrors them into one
//! task-management service.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mirror_daemon::config::Config;
use mirror_daemon::health::DaemonHealth;
use mirror_daemon::platforms::{build_source, todoist::TodoistClient};
use mirror_daemon::scheduler::SourceRunner;
use mirror_daemon::store::JsonSnapshotStore;

use mirror_core::{MirrorService, SnapshotStore};

#[derive(Parser, Debug)]
#[command(name = "mirror-daemon")]
#[command(about = "Task platform mirroring daemon")]
struct Args {
    /// Path to the YAML config file
    #[arg(short, long)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,mirror_daemon=debug"
    } else {
        "info,mirror_daemon=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting mirror-daemon");
    info!("Config path: {:?}", args.config);

    let config = Config::load(&args.config)?;
    info!("State directory: {:?}", config.state_dir);

    let mirror_token = Config::token_for(&config.mirror.token_env)?;
    let mirror: Arc<dyn MirrorService> =
        Arc::new(TodoistClient::new(&config.mirror.base_url, mirror_token));

    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut runners = Vec::new();

    for source_config in &config.sources {
        let token = Config::token_for(&source_config.token_env)?;
        let source =
            build_source(source_config.kind, source_config.base_url.as_deref(), token).await;
        let store: Arc<dyn SnapshotStore> =
            Arc::new(JsonSnapshotStore::open(&config.state_dir, source_config.kind)?);
        let scopes = source_config
            .mappings
            .iter()
            .map(|mapping| mapping.to_scope())
            .collect();

        let runner = SourceRunner::new(
            source_config.kind,
            Duration::from_secs(source_config.poll_interval_secs),
            source,
            mirror.clone(),
            store,
            scopes,
            health.clone(),
        );
        runners.push(tokio::spawn(runner.run(shutdown_rx.clone())));
    }

    info!(sources = runners.len(), "Daemon running. Press Ctrl+C to stop.");

    // Hourly health summary until shutdown.
    let mut summary = tokio::time::interval(Duration::from_secs(3600));
    summary.tick().await;
    loop {
        tokio::select! {
            _ = summary.tick() => {
                let snapshot = health.lock().unwrap().snapshot();
                info!(
                    uptime_secs = snapshot.uptime_secs(),
                    passes_completed = snapshot.passes_completed,
                    passes_failed = snapshot.passes_failed,
                    items_created = snapshot.items_created,
                    items_updated = snapshot.items_updated,
                    items_deleted = snapshot.items_deleted,
                    "health summary"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    shutdown_tx.send(true).ok();
    let grace = Duration::from_secs(config.shutdown_grace_secs);
    if tokio::time::timeout(grace, futures::future::join_all(runners))
        .await
        .is_err()
    {
        warn!(grace_secs = config.shutdown_grace_secs, "in-flight passes did not finish in time");
    }

    let snapshot = health.lock().unwrap().snapshot();
    info!(
        passes_completed = snapshot.passes_completed,
        passes_failed = snapshot.passes_failed,
        "Shutting down"
    );
    Ok(())
}
