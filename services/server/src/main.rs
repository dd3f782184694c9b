//! Matching engine server
//!
//! Wires the pieces together: the engine on its own thread behind a
//! bounded request queue, the TCP transport for order entry, and the
//! multicast publisher for market data. Shutdown is cooperative: ctrl-c
//! stops the accept loop, signals the engine thread, joins it, and logs
//! the metrics summary.

mod config;
mod engine_task;
mod metrics;
mod multicast;
mod registry;
mod router;
mod tcp;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use matching_engine::MatchingEngine;
use metrics::Metrics;
use registry::ClientRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!(
        tcp = %config.tcp_listen_addr(),
        tcp_enabled = config.tcp_enabled,
        multicast = %format!("{}:{}", config.multicast_group, config.multicast_port),
        multicast_enabled = config.multicast_enabled,
        max_clients = config.max_tcp_clients,
        engine_queue = config.engine_queue_capacity,
        "starting matching engine server"
    );

    let metrics = Arc::new(Metrics::default());
    let registry = Arc::new(ClientRegistry::new(config.client_queue_capacity));
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut engine = MatchingEngine::new();
    for symbol in &config.symbols {
        engine
            .register_symbol(symbol)
            .with_context(|| format!("registering symbol {symbol}"))?;
    }
    info!(symbols = config.symbols.len(), "symbols registered");

    let (engine_tx, engine_rx) = crossbeam_channel::bounded(config.engine_queue_capacity);

    let multicast_tx = if config.multicast_enabled {
        let (tx, rx) = mpsc::channel(config.multicast_queue_capacity);
        tokio::spawn(multicast::run(config.clone(), rx, metrics.clone()));
        Some(tx)
    } else {
        None
    };

    let engine_thread = {
        let registry = registry.clone();
        let metrics = metrics.clone();
        let shutdown = shutdown.clone();
        std::thread::Builder::new()
            .name("engine-task".to_string())
            .spawn(move || {
                engine_task::run_engine(engine, engine_rx, registry, multicast_tx, metrics, shutdown)
            })
            .context("spawning engine thread")?
    };

    if config.tcp_enabled {
        let tcp = tcp::run(config.clone(), registry, engine_tx, metrics.clone());
        tokio::select! {
            result = tcp => result?,
            _ = tokio::signal::ctrl_c() => {}
        }
    } else {
        tokio::signal::ctrl_c().await?;
    }

    info!("shutting down");
    shutdown.store(true, Ordering::Relaxed);
    if engine_thread.join().is_err() {
        tracing::error!("engine thread panicked");
    }

    metrics.log_summary();
    Ok(())
}
