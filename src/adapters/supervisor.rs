//! Feed Supervisor - Lifecycle Management for Feed Connections
//!
//! Spawns one tokio task per exchange connection, each running an
//! independent `FeedDriver` with its own reconnection logic. Tasks
//! share nothing mutable; the supervisor only coordinates shutdown
//! and aggregates health for the /ready endpoint and the metrics
//! exporter.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::ports::exchange::{ExchangeAdapter, Subscription};
use crate::ports::transport::Connector;
use crate::usecases::dispatch::EventDispatcher;
use crate::usecases::driver::{DriverStats, FeedDriver, ReconnectPolicy};

/// One exchange connection managed by the supervisor.
pub struct FeedSpec {
    pub adapter: Arc<dyn ExchangeAdapter>,
    pub subscriptions: Vec<Subscription>,
}

/// Health and counters for one feed task.
pub struct FeedHealth {
    /// Exchange id for logging and metric labels.
    pub exchange: String,
    /// Driver counters, shared with the running driver.
    pub stats: Arc<DriverStats>,
}

impl FeedHealth {
    /// True only while the driver session is actually streaming —
    /// never during connect, subscribe, or reconnect backoff.
    pub fn connected(&self) -> bool {
        self.stats.streaming.load(Ordering::Relaxed)
    }
}

/// Supervises all market data feed tasks.
pub struct FeedSupervisor {
    specs: Vec<FeedSpec>,
    health: Vec<Arc<FeedHealth>>,
    connector: Arc<dyn Connector>,
    dispatcher: Arc<EventDispatcher>,
    policy: ReconnectPolicy,
    shutdown_tx: broadcast::Sender<()>,
}

impl FeedSupervisor {
    pub fn new(
        specs: Vec<FeedSpec>,
        connector: Arc<dyn Connector>,
        dispatcher: Arc<EventDispatcher>,
        policy: ReconnectPolicy,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let health = specs
            .iter()
            .map(|spec| {
                Arc::new(FeedHealth {
                    exchange: spec.adapter.id().to_string(),
                    stats: Arc::new(DriverStats::default()),
                })
            })
            .collect();
        Self {
            specs,
            health,
            connector,
            dispatcher,
            policy,
            shutdown_tx,
        }
    }

    /// Per-feed health trackers, in spec order.
    pub fn health(&self) -> &[Arc<FeedHealth>] {
        &self.health
    }

    /// Spawn all feed tasks and return join handles.
    #[instrument(skip(self))]
    pub fn spawn(&mut self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.specs.len());

        for (spec, health) in self.specs.drain(..).zip(self.health.iter()) {
            let health = Arc::clone(health);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let mut driver = FeedDriver::new(
                spec.adapter,
                Arc::clone(&self.connector),
                Arc::clone(&self.dispatcher),
                self.policy,
                spec.subscriptions,
                Arc::clone(&health.stats),
            );

            handles.push(tokio::spawn(async move {
                match driver.run(shutdown_rx).await {
                    Ok(()) => {
                        info!(exchange = %health.exchange, "Feed exited normally");
                    }
                    Err(e) => {
                        error!(exchange = %health.exchange, error = %e, "Feed failed");
                    }
                }
            }));
        }

        info!(feed_count = handles.len(), "Feed tasks spawned");
        handles
    }

    /// Check if at least one feed is streaming (degraded mode OK).
    pub fn is_healthy(&self) -> bool {
        self.health.iter().any(|h| h.connected())
    }

    /// Check if all feeds are streaming (fully operational).
    pub fn is_fully_healthy(&self) -> bool {
        !self.health.is_empty() && self.health.iter().all(|h| h.connected())
    }
}
