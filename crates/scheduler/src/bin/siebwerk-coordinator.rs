//! siebwerk-coordinator — drives a distributed prime discovery.
//!
//! Binds the result socket, waits for the expected number of workers to
//! announce themselves, then partitions the candidate space and fans the
//! tail out over the pool. Prints the prime count and extremes when done.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use siebwerk_core::SiebwerkConfig;
use siebwerk_scheduler::{ClusterCoordinator, MatchingEngine, ZmqBroker};

// ── CLI ─────────────────────────────────────────────────────────────

/// Siebwerk coordinator — distributed sieve of Eratosthenes.
#[derive(Parser, Debug)]
#[command(name = "siebwerk-coordinator", version, about)]
struct Cli {
    /// Path to siebwerk.toml config file.
    #[arg(long, env = "SIEBWERK_CONFIG", default_value = "config/siebwerk.toml")]
    config: String,

    /// Exclusive upper bound of the prime search.
    #[arg(long, env = "SIEBWERK_LIMIT")]
    limit: u64,

    /// Odd candidates per partition (overrides the config file).
    #[arg(long, env = "SIEBWERK_PARTITION_SIZE")]
    partition_size: Option<u64>,

    /// Number of workers to wait for before distributing.
    #[arg(long, env = "SIEBWERK_WORKERS", default_value_t = 1)]
    workers: usize,
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
    let partition_size = cli.partition_size.unwrap_or(config.sieve.partition_size);

    let broker = Arc::new(ZmqBroker::bind(&config.cluster.results_transport()).await?);
    let engine: Arc<siebwerk_scheduler::ClusterEngine> =
        Arc::new(MatchingEngine::new(broker.clone()));

    let event_broker = broker.clone();
    let event_engine = engine.clone();
    let event_loop = tokio::spawn(async move { event_broker.run_events(event_engine).await });

    info!(expected = cli.workers, "waiting for workers");
    while engine.metrics().worker_count() < cli.workers {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    info!(workers = engine.metrics().worker_count(), "pool ready");

    let coordinator = ClusterCoordinator::new(engine.clone());
    let primes = tokio::select! {
        result = coordinator.distribute(cli.limit, partition_size) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, shutting down");
            broker.shutdown();
            event_loop.await??;
            return Ok(());
        }
    };

    info!(
        limit = cli.limit,
        count = primes.len(),
        first = primes.first().copied().unwrap_or(0),
        last = primes.last().copied().unwrap_or(0),
        "sieve complete"
    );
    println!(
        "{} primes below {} (first {:?}, last {:?})",
        primes.len(),
        cli.limit,
        primes.first(),
        primes.last()
    );

    broker.shutdown();
    event_loop.await??;
    Ok(())
}
