//! Liveness Monitor - Keepalive State Machine
//!
//! Tracks per-connection liveness: `Idle → Subscribed → (Alive | Stalled)`.
//! Any inbound frame counts as proof of life and rearms the window.
//! Exchanges without an application-layer keepalive get the trivial
//! machine — no deadline, never stalled.
//!
//! Uses `tokio::time::Instant` so tests can drive the clock with
//! `start_paused` time.

use tokio::time::Instant;

use crate::ports::exchange::KeepalivePolicy;

/// Liveness state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Not yet subscribed; window not armed.
    Idle,
    /// Subscriptions sent; window armed, no frame seen yet.
    Subscribed,
    /// At least one frame inside the current window.
    Alive,
    /// Window expired with no frame. Connection must be recycled.
    Stalled,
}

/// Per-connection liveness tracker owned by the driver.
#[derive(Debug)]
pub struct LivenessMonitor {
    policy: KeepalivePolicy,
    state: Liveness,
    last_frame: Instant,
}

impl LivenessMonitor {
    pub fn new(policy: KeepalivePolicy) -> Self {
        Self {
            policy,
            state: Liveness::Idle,
            last_frame: Instant::now(),
        }
    }

    pub fn state(&self) -> Liveness {
        self.state
    }

    /// Arm the window. Called once all subscription messages are sent.
    pub fn on_subscribed(&mut self) {
        self.state = Liveness::Subscribed;
        self.last_frame = Instant::now();
    }

    /// Any frame (keepalive or data) resets the window.
    pub fn on_frame(&mut self) {
        if self.state != Liveness::Idle {
            self.state = Liveness::Alive;
        }
        self.last_frame = Instant::now();
    }

    /// Instant at which the connection goes stale, if this exchange
    /// has a liveness contract at all.
    pub fn deadline(&self) -> Option<Instant> {
        if self.state == Liveness::Idle {
            return None;
        }
        self.policy.timeout.map(|t| self.last_frame + t)
    }

    /// Mark the connection stalled after its deadline fired.
    pub fn mark_stalled(&mut self) {
        self.state = Liveness::Stalled;
    }

    /// Configured window in milliseconds, 0 when absent (for logging).
    pub fn window_ms(&self) -> u64 {
        self.policy
            .timeout
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
