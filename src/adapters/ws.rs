//! WebSocket Transport - tokio-tungstenite Implementation
//!
//! Concrete `Connector`/`Transport` over tokio-tungstenite with
//! rustls. Transport-level ping/pong is answered by tungstenite while
//! reading; application-layer keepalive is the adapters' business.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::domain::error::TransportError;
use crate::ports::transport::{Connector, Frame, Transport};

/// Opens real WebSocket connections.
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Box::new(WsTransport { inner: stream }))
    }
}

struct WsTransport {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text))),
                Ok(Message::Binary(bytes)) => return Some(Ok(Frame::Binary(bytes))),
                Ok(Message::Ping(data)) => {
                    // Pong is queued by tungstenite on the next read/write
                    debug!(len = data.len(), "Transport ping");
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(TransportError::Ws(e.to_string()))),
            }
        }
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| TransportError::Ws(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}
