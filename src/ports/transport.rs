//! Transport Port - Frame-level Connection Interface
//!
//! Abstracts the WebSocket client library behind `Connector` and
//! `Transport` traits so the feed driver can be exercised against
//! scripted in-memory transports in tests. Transport-level framing
//! (masking, fragmentation, protocol ping/pong) is the client
//! library's job; the driver only sees whole frames.

use async_trait::async_trait;

use crate::domain::error::TransportError;

/// One inbound application frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Plain-text frame (most exchanges).
    Text(String),
    /// Binary frame, possibly compressed (Huobi-style gzip).
    Binary(Vec<u8>),
}

/// An open connection to one exchange endpoint.
///
/// Owned exclusively by one `FeedDriver`; never shared.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next frame. `None` means the remote closed the
    /// stream cleanly; an `Err` is any other transport failure. Both
    /// end the session and trigger reconnection.
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Send one outbound text frame (subscription or keepalive reply).
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Close the connection. Errors on close are ignored by callers.
    async fn close(&mut self);
}

/// Opens connections. One implementation wraps tokio-tungstenite;
/// tests substitute scripted connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}
