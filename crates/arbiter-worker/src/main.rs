//! Judging worker daemon for the Arbiter online judge
//!
//! This binary wires the judging subsystem together: it loads the YAML
//! configuration, connects to the local Docker daemon and the Redis task
//! stream, warms up the sandbox pool, and runs the configured number of
//! consumer loops until interrupted. On shutdown the loops stop dequeuing
//! and the idle warm containers are destroyed instead of leaked.

use anyhow::Result;
use arbiter_core::sandbox::docker::DockerRuntime;
use arbiter_core::{
    catalog::HttpProblemCatalog, queue::RedisJudgeQueue, ranking::HttpRankingBoard, ConfigLoader,
    ContainerRuntime, ExecutionEngine, JudgeQueue, JudgeWorker, SandboxPool, SecurityScreener,
};
use clap::Parser;
use log::LevelFilter;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Arbiter worker - judge submissions from the task queue")]
struct Cli {
    #[clap(long, short, default_value = "arbiter.yaml", help = "Path to the worker configuration file")]
    config: String,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    log::info!("Loading configuration from: {}", cli.config);
    let config = ConfigLoader::from_file(&cli.config).await?;

    let screener = Arc::new(SecurityScreener::new()?);

    log::info!("Connecting to the local Docker daemon");
    let runtime: Arc<dyn ContainerRuntime> =
        Arc::new(DockerRuntime::connect(config.sandbox.clone())?);

    let pool = Arc::new(SandboxPool::initialize(runtime.clone(), config.sandbox.pool_size).await?);
    let engine = Arc::new(ExecutionEngine::new(runtime.clone(), &config.sandbox));

    let catalog = Arc::new(HttpProblemCatalog::new(config.catalog.base_url.clone()));
    let ranking = Arc::new(HttpRankingBoard::new(config.ranking.base_url.clone()));

    log::info!(
        "Connecting to task stream '{}' (group '{}')",
        config.queue.stream,
        config.queue.group
    );
    let consumer_name = config.consumer_name();
    let queue: Arc<dyn JudgeQueue> = Arc::new(
        RedisJudgeQueue::connect(
            &config.queue.url,
            &config.queue.stream,
            &config.queue.group,
            &consumer_name,
        )
        .await?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(config.worker.concurrency);
    for index in 0..config.worker.concurrency {
        let worker = JudgeWorker::new(
            screener.clone(),
            pool.clone(),
            engine.clone(),
            catalog.clone(),
            ranking.clone(),
            config.worker.full_score,
        );
        let queue = queue.clone();
        let shutdown = shutdown_rx.clone();
        handles.push(tokio::spawn(async move {
            log::info!("Worker loop {} started", index);
            worker.run(queue, shutdown).await;
        }));
    }
    log::info!(
        "Arbiter worker running: {} loops, pool size {}",
        config.worker.concurrency,
        pool.capacity()
    );

    tokio::signal::ctrl_c().await?;
    log::info!("Shutdown signal received, stopping worker loops");
    shutdown_tx.send(true)?;
    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Worker loop panicked: {}", e);
        }
    }

    log::info!("Draining sandbox pool");
    pool.drain().await;
    log::info!("Arbiter worker shut down gracefully");
    Ok(())
}
