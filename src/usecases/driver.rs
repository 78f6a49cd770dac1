//! Feed Driver - Exchange-Agnostic Connection Loop
//!
//! Owns one connection to one exchange and drives the lifecycle state
//! machine: `Disconnected → Connecting → Subscribing → Streaming`.
//! Everything exchange-specific (framing, compression, vocabulary,
//! keepalive, subscription granularity) comes from the injected
//! `ExchangeAdapter`; the driver only sequences it.
//!
//! Frame handling is strictly sequential within one connection:
//! receive, decode, dispatch — never two frames concurrently. This
//! preserves exchange-reported ordering and guarantees keepalive
//! replies go out before any queued frame is processed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::{FeedError, TransportError};
use crate::ports::exchange::{Classified, ExchangeAdapter, Subscription};
use crate::ports::transport::{Connector, Transport};

use super::dispatch::EventDispatcher;
use super::keepalive::LivenessMonitor;

/// Reconnection policy: exponential backoff with a cap.
///
/// `max_retries: None` (the default) retries forever — a market-data
/// feed is expected to stay connected indefinitely. The attempt
/// counter resets once a session reaches Streaming.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_retries: None,
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before attempt `n` (0-based): `base * 2^n`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Subscribing,
    Streaming,
}

/// Mutable per-connection state, owned exclusively by one driver.
#[derive(Debug)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    /// Ordered (channel, pair) set resubmitted fresh on every reconnect.
    pub subscriptions: Vec<Subscription>,
    pub reconnect_attempts: u32,
}

impl ConnectionState {
    pub fn new(subscriptions: Vec<Subscription>) -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            subscriptions,
            reconnect_attempts: 0,
        }
    }
}

/// Cheap per-driver counters, scraped by the metrics exporter.
#[derive(Debug, Default)]
pub struct DriverStats {
    pub frames_received: AtomicU64,
    pub decode_errors: AtomicU64,
    pub protocol_violations: AtomicU64,
    pub events_emitted: AtomicU64,
    pub reconnects: AtomicU64,
    pub liveness_timeouts: AtomicU64,
    /// True only while the session is in the Streaming phase; false
    /// during connect, subscribe, and every reconnect backoff. Feeds
    /// the readiness probe.
    pub streaming: AtomicBool,
}

impl DriverStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// How one streaming session ended.
enum SessionEnd {
    Shutdown,
}

/// Exchange-agnostic driver for one feed connection.
pub struct FeedDriver {
    adapter: Arc<dyn ExchangeAdapter>,
    connector: Arc<dyn Connector>,
    dispatcher: Arc<EventDispatcher>,
    policy: ReconnectPolicy,
    state: ConnectionState,
    stats: Arc<DriverStats>,
}

impl FeedDriver {
    pub fn new(
        adapter: Arc<dyn ExchangeAdapter>,
        connector: Arc<dyn Connector>,
        dispatcher: Arc<EventDispatcher>,
        policy: ReconnectPolicy,
        subscriptions: Vec<Subscription>,
        stats: Arc<DriverStats>,
    ) -> Self {
        Self {
            adapter,
            connector,
            dispatcher,
            policy,
            state: ConnectionState::new(subscriptions),
            stats,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.state.phase
    }

    /// Run until shutdown or until the retry budget is exhausted.
    ///
    /// Validates the full subscription set against the translator
    /// before the first connection attempt — a missing mapping is a
    /// `ConfigError` here, never a message-handling surprise later.
    #[instrument(skip(self, shutdown_rx), fields(exchange = self.adapter.id()))]
    pub async fn run(
        &mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), FeedError> {
        self.adapter
            .translator()
            .ensure_subscribable(&self.state.subscriptions)?;

        info!(
            subscriptions = self.state.subscriptions.len(),
            "Feed driver starting"
        );

        loop {
            let outcome = self.session(&mut shutdown_rx).await;
            self.state.phase = ConnectionPhase::Disconnected;
            self.stats.streaming.store(false, Ordering::Relaxed);

            match outcome {
                Ok(SessionEnd::Shutdown) => {
                    info!("Feed driver shut down gracefully");
                    return Ok(());
                }
                Err(e) => {
                    DriverStats::bump(&self.stats.reconnects);

                    if let Some(max) = self.policy.max_retries {
                        if self.state.reconnect_attempts >= max {
                            warn!(attempts = self.state.reconnect_attempts,
                                  "Retry budget exhausted");
                            return Err(FeedError::RetriesExhausted {
                                exchange: self.adapter.id().to_string(),
                                attempts: self.state.reconnect_attempts,
                            });
                        }
                    }

                    let delay = self.policy.delay_for(self.state.reconnect_attempts);
                    self.state.reconnect_attempts += 1;
                    warn!(
                        error = %e,
                        attempt = self.state.reconnect_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Session ended, reconnecting"
                    );

                    // Check shutdown while backing off
                    tokio::select! {
                        _ = shutdown_rx.recv() => return Ok(()),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One connection session: connect, subscribe, stream until error,
    /// stall, or shutdown.
    async fn session(
        &mut self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<SessionEnd, FeedError> {
        self.state.phase = ConnectionPhase::Connecting;
        let url = self.adapter.endpoint(&self.state.subscriptions)?;
        let mut transport = self.connector.connect(&url).await?;
        info!(url = %url, "Connected");

        // Full subscription set, in deterministic order, before the
        // session counts as Streaming. No server-side persistence is
        // assumed across reconnects.
        self.state.phase = ConnectionPhase::Subscribing;
        for message in self.adapter.subscribe_messages(&self.state.subscriptions)? {
            transport.send_text(&message).await?;
        }

        self.state.phase = ConnectionPhase::Streaming;
        self.state.reconnect_attempts = 0;
        self.stats.streaming.store(true, Ordering::Relaxed);

        let mut monitor = LivenessMonitor::new(self.adapter.keepalive_policy());
        monitor.on_subscribed();

        loop {
            let deadline = monitor.deadline();
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    transport.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
                () = liveness_expired(deadline) => {
                    monitor.mark_stalled();
                    DriverStats::bump(&self.stats.liveness_timeouts);
                    transport.close().await;
                    return Err(FeedError::LivenessTimeout {
                        exchange: self.adapter.id().to_string(),
                        timeout_ms: monitor.window_ms(),
                    });
                }
                frame = transport.next_frame() => {
                    match frame {
                        Some(Ok(frame)) => {
                            monitor.on_frame();
                            DriverStats::bump(&self.stats.frames_received);
                            self.handle_frame(&frame, transport.as_mut()).await?;
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(TransportError::Closed.into()),
                    }
                }
            }
        }
    }

    /// Decode one frame and act on its classification. Decode failures
    /// drop the frame and keep the session; only a failed keepalive
    /// reply is session-fatal (the exchange will drop us anyway).
    async fn handle_frame(
        &self,
        frame: &crate::ports::transport::Frame,
        transport: &mut dyn Transport,
    ) -> Result<(), FeedError> {
        let text = match self.adapter.decompress(frame) {
            Ok(text) => text,
            Err(e) => {
                DriverStats::bump(&self.stats.decode_errors);
                warn!(error = %e, "Dropped undecodable frame");
                return Ok(());
            }
        };

        let parsed = match self.adapter.parse(&text) {
            Ok(value) => value,
            Err(e) => {
                DriverStats::bump(&self.stats.decode_errors);
                warn!(error = %e, "Dropped unparseable frame");
                return Ok(());
            }
        };

        match self.adapter.classify(&parsed) {
            Classified::Keepalive { reply } => {
                // Reply goes out before any further queued frame is
                // read; delaying it gets us forcibly disconnected.
                if let Some(reply) = reply {
                    transport.send_text(&reply).await?;
                    debug!("Keepalive reply sent");
                }
            }
            Classified::StatusAck => {
                debug!("Status ack");
            }
            Classified::Error(message) => {
                DriverStats::bump(&self.stats.protocol_violations);
                warn!(message = %message, "Exchange reported an error");
            }
            Classified::Update(update) => {
                for event in self.adapter.extract(&update) {
                    DriverStats::bump(&self.stats.events_emitted);
                    self.dispatcher.dispatch(&event);
                }
            }
            Classified::Unrecognized => {
                DriverStats::bump(&self.stats.protocol_violations);
                warn!("Unrecognized message structure, frame dropped");
            }
        }

        Ok(())
    }
}

/// Resolves when the liveness deadline passes; never resolves for
/// exchanges without a keepalive contract.
async fn liveness_expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_retries: None,
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_default_policy_retries_forever() {
        assert!(ReconnectPolicy::default().max_retries.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_deadline_never_expires() {
        let mut expiry = tokio_test::task::spawn(liveness_expired(None));
        tokio_test::assert_pending!(expiry.poll());
        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio_test::assert_pending!(expiry.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires_once_reached() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut expiry = tokio_test::task::spawn(liveness_expired(Some(deadline)));
        tokio_test::assert_pending!(expiry.poll());
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio_test::assert_ready!(expiry.poll());
    }
}
