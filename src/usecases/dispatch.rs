//! Event Dispatcher - Callback Fan-out
//!
//! Delivers canonical events to consumers on two surfaces:
//!
//! - Inline callbacks registered per channel kind, invoked in
//!   registration order. A panicking callback is caught at the
//!   dispatch boundary, logged, and never propagated into the
//!   driver loop.
//! - A bounded broadcast channel for consumers that may stall.
//!   Backpressure policy is drop-oldest: a lagging receiver skips
//!   the frames it missed (tokio broadcast `Lagged`) instead of
//!   blocking the receive loop and starving keepalive replies.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::RwLock;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::domain::event::MarketEvent;
use crate::domain::symbols::Channel;

/// User-supplied event callback. Must be fast; slow consumers belong
/// on the broadcast surface instead.
pub type EventCallback = Arc<dyn Fn(&MarketEvent) + Send + Sync>;

/// Fan-out point shared by all feed drivers.
pub struct EventDispatcher {
    /// Callbacks per channel kind, in registration order.
    callbacks: RwLock<HashMap<Channel, Vec<EventCallback>>>,
    /// Bounded broadcast for channel-style consumers.
    event_tx: broadcast::Sender<MarketEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher with the given broadcast buffer size.
    pub fn new(buffer: usize) -> Self {
        let (event_tx, _) = broadcast::channel(buffer);
        Self {
            callbacks: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Register a callback for one channel kind. Callbacks fire in
    /// registration order for every event of that kind.
    pub fn register(&self, channel: Channel, callback: EventCallback) {
        let mut callbacks = self.callbacks.write().expect("callback lock poisoned");
        callbacks.entry(channel).or_default().push(callback);
    }

    /// Subscribe to the broadcast surface (all channel kinds).
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.event_tx.subscribe()
    }

    /// Deliver one event to every registered consumer.
    pub fn dispatch(&self, event: &MarketEvent) {
        let channel = match event {
            MarketEvent::Trade(_) => Channel::Trades,
            MarketEvent::Ticker(_) => Channel::Ticker,
            MarketEvent::Book(_) => Channel::Book,
        };

        {
            let callbacks = self.callbacks.read().expect("callback lock poisoned");
            if let Some(registered) = callbacks.get(&channel) {
                for callback in registered {
                    if let Err(panic) =
                        catch_unwind(AssertUnwindSafe(|| callback(event)))
                    {
                        error!(
                            exchange = event.exchange(),
                            symbol = event.symbol(),
                            channel = %channel,
                            panic = ?panic_message(&panic),
                            "Event callback panicked; continuing"
                        );
                    }
                }
            }
        }

        // Ignore send errors — no broadcast receivers is fine.
        if self.event_tx.send(event.clone()).is_err() {
            debug!(channel = %channel, "No broadcast receivers for event");
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
