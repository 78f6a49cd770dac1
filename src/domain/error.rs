//! Feed Error Taxonomy
//!
//! Each error class carries a distinct recovery policy:
//! - `ConfigError` — fatal at startup, raised before any connection attempt
//! - `DecodeError` — one dropped frame, connection stays up
//! - `TransportError` — reconnect with backoff
//! - `FeedError` — adapter-level outcomes surfaced to the supervisor

use thiserror::Error;

/// Configuration failure detected before any connection attempt.
///
/// Always fatal for the exchange it concerns: a feed must never
/// connect with an incomplete channel or pair mapping.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A canonical channel the feed is configured to subscribe to
    /// has no wire mapping for this exchange.
    #[error("{exchange}: no wire channel mapped for canonical channel {channel}")]
    UnmappedChannel { exchange: String, channel: String },

    /// A canonical pair has no wire symbol for this exchange.
    #[error("{exchange}: no wire symbol mapped for canonical pair {pair}")]
    UnmappedPair { exchange: String, pair: String },

    /// A mapping entry would break injectivity (duplicate key or value),
    /// making round-trips ambiguous.
    #[error("{exchange}: duplicate mapping entry {entry}")]
    DuplicateMapping { exchange: String, entry: String },

    /// General invalid configuration value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A single inbound frame could not be decoded.
///
/// Never connection-fatal: the driver logs it, drops the frame,
/// and keeps streaming.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Transport decompression failed (corrupt gzip frame, etc.).
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// Frame payload is not valid JSON.
    #[error("parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required field is missing or has the wrong shape.
    #[error("missing or malformed field: {0}")]
    Field(String),

    /// A monetary field could not be represented as an exact decimal.
    #[error("invalid decimal in field {field}: {value}")]
    Decimal { field: String, value: String },

    /// A domain invariant was violated by exchange-reported data
    /// (e.g. a trade with non-positive amount).
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Transport-level failure. Triggers reconnect with backoff.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("websocket error: {0}")]
    Ws(String),

    #[error("stream ended by remote")]
    Closed,
}

/// Adapter-level outcome reported to the supervisor.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No frame or keepalive arrived within the liveness window.
    /// Triggers a reconnect cycle, never a process crash.
    #[error("{exchange}: liveness timeout after {timeout_ms}ms")]
    LivenessTimeout { exchange: String, timeout_ms: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reconnect budget exhausted — fatal for this adapter only.
    #[error("{exchange}: retry budget exhausted after {attempts} attempts")]
    RetriesExhausted { exchange: String, attempts: u32 },
}
