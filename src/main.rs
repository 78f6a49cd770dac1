//! marketfeed — Entry Point
//!
//! Initializes configuration, logging, symbol discovery, and one feed
//! driver task per configured exchange. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Discover pair mappings per exchange (REST or config overrides)
//! 4. Build exchange adapters + fail-fast subscription validation
//! 5. Spawn health/metrics server (/live, /ready, /metrics)
//! 6. Spawn feed supervisor (one auto-reconnecting driver per exchange)
//! 7. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::discovery::{rest_source, StaticSymbolSource};
use adapters::metrics::MetricsRegistry;
use adapters::supervisor::{FeedSpec, FeedSupervisor};
use adapters::ws::WsConnector;
use domain::symbols::{Channel, PairMap};
use ports::discovery::SymbolSource;
use ports::exchange::Subscription;
use usecases::dispatch::EventDispatcher;
use usecases::driver::ReconnectPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.feed.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.feed.name,
        version = env!("CARGO_PKG_VERSION"),
        exchanges = config.exchanges.len(),
        buffer = config.dispatch.buffer,
        "Configuration loaded, starting marketfeed"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (health_tx, health_rx) = watch::channel(true);

    // ── 4. Symbol discovery + adapter construction ──────────
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let mut specs = Vec::new();
    for exchange in config.exchanges.iter().filter(|e| e.enabled) {
        let source: Box<dyn SymbolSource> = if exchange.pair_overrides.is_empty() {
            rest_source(&exchange.id, http.clone()).with_context(|| {
                format!("No symbol source for exchange {}", exchange.id)
            })?
        } else {
            Box::new(StaticSymbolSource::new(
                exchange.pair_overrides.clone().into_iter().collect(),
            ))
        };

        // Discovery failure is fatal to this exchange's startup only,
        // but at wiring time we fail the whole boot: a configured
        // exchange that cannot start is a deployment error.
        let entries = source.fetch_pairs().await.with_context(|| {
            format!("Symbol discovery failed for {}", exchange.id)
        })?;
        let pairs = PairMap::new(&exchange.id, entries)?;
        let adapter = adapters::exchanges::build(&exchange.id, pairs)?;

        let subscriptions: Vec<Subscription> = exchange
            .channels
            .iter()
            .filter_map(|name| Channel::from_canonical(name))
            .flat_map(|channel| {
                exchange
                    .pairs
                    .iter()
                    .map(move |pair| (channel, pair.clone()))
            })
            .collect();

        // Fail fast on missing mappings, before any socket opens
        adapter.translator().ensure_subscribable(&subscriptions)?;

        specs.push(FeedSpec {
            adapter,
            subscriptions,
        });
    }

    // ── 5. Event dispatcher (callbacks + broadcast surface) ─
    let dispatcher = Arc::new(EventDispatcher::new(config.dispatch.buffer));

    // Example consumer: log every canonical event at debug level.
    let event_rx = dispatcher.subscribe();
    let log_shutdown = shutdown_tx.subscribe();
    let consumer_handle = tokio::spawn(log_events(event_rx, log_shutdown));

    // ── 6. Spawn feed supervisor ────────────────────────────
    let policy = ReconnectPolicy {
        base_delay: std::time::Duration::from_millis(config.reconnect.base_delay_ms),
        max_delay: std::time::Duration::from_millis(config.reconnect.max_delay_ms),
        max_retries: config.reconnect.max_retries,
    };
    let mut supervisor = FeedSupervisor::new(
        specs,
        Arc::new(WsConnector),
        Arc::clone(&dispatcher),
        policy,
        shutdown_tx.clone(),
    );
    let feed_handles = supervisor.spawn();
    let supervisor = Arc::new(supervisor);

    // ── 7. Spawn health/metrics server ──────────────────────
    let health_handle = if config.metrics.enabled {
        let addr = config.metrics.bind_address.clone();
        let supervisor = Arc::clone(&supervisor);
        Some(tokio::spawn(async move {
            if let Err(e) = serve_health(&addr, supervisor, health_rx).await {
                error!(error = %e, "Health server failed");
            }
        }))
    } else {
        None
    };

    info!("All tasks spawned — feed handler is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // ── Graceful shutdown ───────────────────────────────────

    // 1. Signal all tasks to stop
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // 2. Mark health as unhealthy (readiness probe → 503)
    let _ = health_tx.send(false);

    // 3. Wait for feed drivers to close their sockets (up to 10s)
    for handle in feed_handles {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(10), handle).await;
    }

    // 4. Stop auxiliary tasks
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        consumer_handle,
    )
    .await;
    if let Some(handle) = health_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Drain the broadcast surface and log each canonical event.
///
/// Stands in for real downstream consumers; lagging here drops the
/// oldest events rather than backing up the drivers.
async fn log_events(
    mut event_rx: broadcast::Receiver<domain::event::MarketEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => return,
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        tracing::debug!(
                            exchange = event.exchange(),
                            symbol = event.symbol(),
                            ts = event.timestamp_ms(),
                            "event"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(dropped = n, "Event consumer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }
}

/// Serve health and metrics endpoints.
///
/// - `/live`    — Liveness probe: 200 if process is running
/// - `/ready`   — Readiness probe: 503 during shutdown or when no feed is up
/// - `/metrics` — Prometheus exposition
async fn serve_health(
    addr: &str,
    supervisor: Arc<FeedSupervisor>,
    health_rx: watch::Receiver<bool>,
) -> Result<()> {
    use axum::{extract::State, http::StatusCode, routing::get, Router};

    let metrics = Arc::new(MetricsRegistry::new()?);

    #[derive(Clone)]
    struct AppState {
        supervisor: Arc<FeedSupervisor>,
        metrics: Arc<MetricsRegistry>,
        health_rx: watch::Receiver<bool>,
    }

    let state = AppState {
        supervisor,
        metrics,
        health_rx,
    };

    let app = Router::new()
        .route("/live", get(|| async { StatusCode::OK }))
        .route(
            "/ready",
            get(|State(state): State<AppState>| async move {
                if *state.health_rx.borrow() && state.supervisor.is_healthy() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        )
        .route(
            "/metrics",
            get(|State(state): State<AppState>| async move {
                state.metrics.refresh(state.supervisor.health());
                state
                    .metrics
                    .render()
                    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
            }),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Health server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
