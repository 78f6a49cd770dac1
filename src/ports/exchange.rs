//! Exchange Port - Per-Exchange Capability Set
//!
//! Every exchange behaves differently in framing, compression, symbol
//! vocabulary, subscription granularity, and keepalive. Each adapter
//! implements this one trait as an interchangeable strategy object;
//! the `FeedDriver` stays exchange-agnostic.

use std::time::Duration;

use serde_json::Value;

use crate::domain::error::{ConfigError, DecodeError};
use crate::domain::event::{ExchangeId, MarketEvent};
use crate::domain::symbols::{Channel, SymbolTranslator};

use super::transport::Frame;

/// One requested (canonical channel, canonical pair) subscription.
pub type Subscription = (Channel, String);

/// Application-layer liveness contract for one exchange.
#[derive(Debug, Clone, Copy)]
pub struct KeepalivePolicy {
    /// Maximum silence (no frame of any kind) before the connection is
    /// declared stalled and torn down. `None` means the exchange has no
    /// application-layer liveness contract — always alive.
    pub timeout: Option<Duration>,
}

impl KeepalivePolicy {
    /// Exchange with no application-layer keepalive.
    pub const fn none() -> Self {
        Self { timeout: None }
    }

    /// Stall window after which the connection is recycled.
    pub const fn timeout(window: Duration) -> Self {
        Self {
            timeout: Some(window),
        }
    }
}

/// A parsed message carrying market data for one canonical channel.
#[derive(Debug, Clone)]
pub struct ChannelUpdate {
    /// Canonical channel the payload belongs to.
    pub channel: Channel,
    /// Canonical pair, already translated from the wire symbol.
    pub symbol: String,
    /// Exchange-specific payload for `extract` to walk.
    pub payload: Value,
}

/// Classification of one parsed inbound message. Total: every message
/// maps to exactly one case.
#[derive(Debug, Clone)]
pub enum Classified {
    /// Application-layer liveness message. When `reply` is set the
    /// driver must send it before processing any further queued frame —
    /// exchanges disconnect clients that delay the echo.
    Keepalive { reply: Option<String> },
    /// Subscription ack or other administrative status. Logged at
    /// debug, no events emitted.
    StatusAck,
    /// Exchange-reported error (rejected subscription, bad request).
    /// Logged as a warning with the exchange's own text; the
    /// connection stays up.
    Error(String),
    /// Market data for a subscribed channel.
    Update(ChannelUpdate),
    /// Top-level structure this adapter does not recognize. Logged as
    /// a warning, frame dropped, connection kept alive.
    Unrecognized,
}

/// Per-exchange strategy object consumed by the `FeedDriver`.
///
/// The decode pipeline is `decompress → parse → classify → extract`.
/// All four stages are pure with respect to connection state; the
/// driver owns every side effect (sending replies, dispatching events,
/// reconnecting).
pub trait ExchangeAdapter: Send + Sync {
    /// Canonical exchange identifier, e.g. "HUOBI".
    fn id(&self) -> ExchangeId;

    /// Symbol/channel translator for this exchange.
    fn translator(&self) -> &SymbolTranslator;

    /// Liveness contract the driver must enforce.
    fn keepalive_policy(&self) -> KeepalivePolicy;

    /// WebSocket endpoint for a session carrying `subs`. Most
    /// exchanges use a fixed URL; some encode the subscription set in
    /// the query string.
    fn endpoint(&self, subs: &[Subscription]) -> Result<String, ConfigError>;

    /// Outbound subscription messages for `subs`, in the exact order
    /// they must be sent. The adapter decides granularity: one message
    /// per (channel, pair), one batch, or none when the endpoint URL
    /// already carries the subscription set.
    fn subscribe_messages(&self, subs: &[Subscription]) -> Result<Vec<String>, ConfigError>;

    /// Transport decompression. Identity for plain-text exchanges.
    /// Failure drops this frame only, never the connection.
    fn decompress(&self, frame: &Frame) -> Result<String, DecodeError>;

    /// Deserialize a decompressed frame. Monetary fields keep their
    /// exact digits (serde_json arbitrary_precision).
    fn parse(&self, text: &str) -> Result<Value, DecodeError> {
        serde_json::from_str(text).map_err(DecodeError::Parse)
    }

    /// Classify one parsed message into exactly one case.
    fn classify(&self, msg: &Value) -> Classified;

    /// Extract zero or more canonical events from a channel update, in
    /// payload order (execution sequence is significant). A malformed
    /// element inside a batch is skipped; well-formed siblings are kept.
    fn extract(&self, update: &ChannelUpdate) -> Vec<MarketEvent>;
}
