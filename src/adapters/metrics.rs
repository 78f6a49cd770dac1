//! Prometheus Metrics - Feed Observability
//!
//! Exposes per-exchange feed counters on the health server:
//! frames received, decode errors, protocol violations, events
//! emitted, reconnect cycles, liveness timeouts, and a connected
//! gauge. Values are mirrored from the drivers' atomic counters at
//! scrape time.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use super::supervisor::FeedHealth;

/// Centralized Prometheus metrics for the feed handler.
///
/// All metrics follow the naming convention `marketfeed_*` and carry
/// an `exchange` label.
pub struct MetricsRegistry {
    registry: Registry,
    frames_received: IntGaugeVec,
    decode_errors: IntGaugeVec,
    protocol_violations: IntGaugeVec,
    events_emitted: IntGaugeVec,
    reconnects: IntGaugeVec,
    liveness_timeouts: IntGaugeVec,
    connected: IntGaugeVec,
}

impl MetricsRegistry {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let gauge = |name: &str, help: &str| -> anyhow::Result<IntGaugeVec> {
            let vec = IntGaugeVec::new(Opts::new(name, help), &["exchange"])?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };

        Ok(Self {
            frames_received: gauge(
                "marketfeed_frames_received",
                "Inbound frames per exchange",
            )?,
            decode_errors: gauge(
                "marketfeed_decode_errors",
                "Frames dropped by the decode pipeline",
            )?,
            protocol_violations: gauge(
                "marketfeed_protocol_violations",
                "Unrecognized top-level message structures",
            )?,
            events_emitted: gauge(
                "marketfeed_events_emitted",
                "Canonical events dispatched to consumers",
            )?,
            reconnects: gauge(
                "marketfeed_reconnects",
                "Reconnect cycles per exchange",
            )?,
            liveness_timeouts: gauge(
                "marketfeed_liveness_timeouts",
                "Stalled-connection detections per exchange",
            )?,
            connected: gauge(
                "marketfeed_connected",
                "1 when the feed task is live",
            )?,
            registry,
        })
    }

    /// Mirror driver counters into the registry.
    pub fn refresh(&self, feeds: &[Arc<FeedHealth>]) {
        let counter = |value: &std::sync::atomic::AtomicU64| {
            i64::try_from(value.load(Ordering::Relaxed)).unwrap_or(i64::MAX)
        };
        for feed in feeds {
            let label = &[feed.exchange.as_str()];
            let stats = &feed.stats;
            self.frames_received
                .with_label_values(label)
                .set(counter(&stats.frames_received));
            self.decode_errors
                .with_label_values(label)
                .set(counter(&stats.decode_errors));
            self.protocol_violations
                .with_label_values(label)
                .set(counter(&stats.protocol_violations));
            self.events_emitted
                .with_label_values(label)
                .set(counter(&stats.events_emitted));
            self.reconnects
                .with_label_values(label)
                .set(counter(&stats.reconnects));
            self.liveness_timeouts
                .with_label_values(label)
                .set(counter(&stats.liveness_timeouts));
            self.connected
                .with_label_values(label)
                .set(i64::from(feed.connected()));
        }
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::usecases::driver::DriverStats;

    use super::*;

    #[test]
    fn test_refresh_mirrors_driver_counters() {
        let metrics = MetricsRegistry::new().unwrap();
        let health = Arc::new(FeedHealth {
            exchange: "HUOBI".to_string(),
            stats: Arc::new(DriverStats::default()),
        });
        health.stats.frames_received.store(7, Ordering::Relaxed);
        health.stats.liveness_timeouts.store(2, Ordering::Relaxed);
        health.stats.streaming.store(true, Ordering::Relaxed);

        metrics.refresh(&[Arc::clone(&health)]);
        let rendered = metrics.render().unwrap();

        assert!(rendered.contains(r#"marketfeed_frames_received{exchange="HUOBI"} 7"#));
        assert!(rendered.contains(r#"marketfeed_liveness_timeouts{exchange="HUOBI"} 2"#));
        assert!(rendered.contains(r#"marketfeed_connected{exchange="HUOBI"} 1"#));
    }
}
