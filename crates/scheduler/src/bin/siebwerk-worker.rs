//! siebwerk-worker — remote sieve worker.
//!
//! Binds its own task socket, announces itself to the coordinator's
//! result socket, then sieves assigned partitions until interrupted.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use uuid::Uuid;

use siebwerk_core::{SiebwerkConfig, Transport, WorkerId};
use siebwerk_scheduler::SieveWorker;

// ── CLI ─────────────────────────────────────────────────────────────

/// Siebwerk worker — sieves candidate partitions on behalf of a coordinator.
#[derive(Parser, Debug)]
#[command(name = "siebwerk-worker", version, about)]
struct Cli {
    /// Path to siebwerk.toml config file.
    #[arg(long, env = "SIEBWERK_CONFIG", default_value = "config/siebwerk.toml")]
    config: String,

    /// Worker id (defaults to a fresh random one).
    #[arg(long, env = "SIEBWERK_WORKER_ID")]
    id: Option<String>,

    /// Host to bind the task socket on (tcp clusters only).
    #[arg(long, env = "SIEBWERK_TASK_HOST")]
    task_host: Option<String>,

    /// Port to bind the task socket on (tcp clusters only).
    #[arg(long, env = "SIEBWERK_TASK_PORT")]
    task_port: Option<u16>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match SiebwerkConfig::from_file(&cli.config) {
        Ok(cfg) => {
            info!(path = %cli.config, "loaded siebwerk config");
            cfg
        }
        Err(e) => {
            warn!(error = %e, path = %cli.config, "failed to load config, using local defaults");
            SiebwerkConfig::local()
        }
    };

    let id = WorkerId::new(
        cli.id
            .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4())),
    );

    // ipc clusters derive the task socket from the worker id; tcp clusters
    // need an explicit host/port to bind and announce.
    let task_transport = match (&cli.task_host, cli.task_port) {
        (Some(host), Some(port)) => Transport::tcp(host, port),
        (None, None) => config.cluster.task_transport(id.as_str()),
        _ => anyhow::bail!("--task-host and --task-port must be given together"),
    };

    let worker = Arc::new(
        SieveWorker::connect(id, &task_transport, &config.cluster.results_transport()).await?,
    );
    worker.hello().await?;

    let runner = worker.clone();
    let task_loop = tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    worker.shutdown();
    task_loop.await??;
    worker.goodbye().await?;
    info!("worker exited cleanly");
    Ok(())
}
