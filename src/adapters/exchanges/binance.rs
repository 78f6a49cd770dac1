//! Binance Adapter - Combined-Stream URL Subscriptions
//!
//! Binance encodes the whole subscription set in the connection URL
//! (`/stream?streams=btcusdt@aggTrade/ethusdt@aggTrade`), so a session
//! sends zero subscription messages. Frames are plain text wrapped in
//! a `{"stream": ..., "data": ...}` envelope. Liveness is handled at
//! the transport layer (server ping/pong), so the application-layer
//! keepalive machine is trivial.

use serde_json::Value;
use tracing::warn;

use crate::domain::error::{ConfigError, DecodeError};
use crate::domain::event::{
    BookUpdate, ExchangeId, MarketEvent, Side, Ticker, Trade,
};
use crate::domain::symbols::{Channel, ChannelMap, PairMap, SymbolTranslator};
use crate::ports::exchange::{
    ChannelUpdate, Classified, ExchangeAdapter, KeepalivePolicy, Subscription,
};
use crate::ports::transport::Frame;

use super::{decimal_field, str_field, u64_field};

const EXCHANGE: ExchangeId = "BINANCE";
const WS_ENDPOINT: &str = "wss://stream.binance.com:9443";

/// No app-layer ping/pong, so silence is only detectable as a data
/// stall. Live streams push data well inside this window; a half-open
/// connection must still get recycled eventually.
const LIVENESS_WINDOW: std::time::Duration = std::time::Duration::from_secs(300);

pub struct BinanceAdapter {
    translator: SymbolTranslator,
}

impl BinanceAdapter {
    pub fn new(pairs: PairMap) -> Result<Self, ConfigError> {
        let channels = ChannelMap::new(
            "binance",
            [
                (Channel::Trades, "aggTrade".to_string()),
                (Channel::Ticker, "bookTicker".to_string()),
                (Channel::Book, "depth".to_string()),
            ],
        )?;
        Ok(Self {
            translator: SymbolTranslator::new(channels, pairs),
        })
    }

    fn extract_trade(&self, update: &ChannelUpdate) -> Result<Trade, DecodeError> {
        let data = &update.payload;
        // `m` = buyer is maker, so the aggressor was a seller
        let maker_buyer = data
            .get("m")
            .and_then(Value::as_bool)
            .ok_or_else(|| DecodeError::Field("m".to_string()))?;
        let side = if maker_buyer { Side::Sell } else { Side::Buy };

        Trade::new(
            EXCHANGE,
            update.symbol.clone(),
            u64_field(data, "T")?,
            u64_field(data, "a")?.to_string(),
            side,
            decimal_field(data, "q")?,
            decimal_field(data, "p")?,
        )
    }

    fn extract_ticker(&self, update: &ChannelUpdate) -> Result<Ticker, DecodeError> {
        let data = &update.payload;
        Ok(Ticker {
            exchange: EXCHANGE,
            symbol: update.symbol.clone(),
            // bookTicker carries no event time on spot; fall back to
            // the update id so consumers still get a monotonic ordinal
            timestamp_ms: u64_field(data, "E").or_else(|_| u64_field(data, "u"))?,
            bid: decimal_field(data, "b")?,
            ask: decimal_field(data, "a")?,
        })
    }

    fn extract_book(&self, update: &ChannelUpdate) -> Result<BookUpdate, DecodeError> {
        let data = &update.payload;
        Ok(BookUpdate {
            exchange: EXCHANGE,
            symbol: update.symbol.clone(),
            timestamp_ms: u64_field(data, "E")?,
            bids: super::book_levels(data.get("b")),
            asks: super::book_levels(data.get("a")),
            is_snapshot: false,
        })
    }
}

impl ExchangeAdapter for BinanceAdapter {
    fn id(&self) -> ExchangeId {
        EXCHANGE
    }

    fn translator(&self) -> &SymbolTranslator {
        &self.translator
    }

    fn keepalive_policy(&self) -> KeepalivePolicy {
        // The websocket library answers transport pings itself; the
        // driver only needs the data-stall window.
        KeepalivePolicy::timeout(LIVENESS_WINDOW)
    }

    /// Combined-stream URL carrying every requested stream.
    fn endpoint(&self, subs: &[Subscription]) -> Result<String, ConfigError> {
        let mut streams = Vec::with_capacity(subs.len());
        for (channel, pair) in subs {
            let wire_channel = self.translator.channels().to_wire(*channel)?;
            let wire_pair = self.translator.pairs().to_wire(pair)?;
            streams.push(format!("{wire_pair}@{wire_channel}"));
        }
        Ok(format!("{WS_ENDPOINT}/stream?streams={}", streams.join("/")))
    }

    fn subscribe_messages(&self, _subs: &[Subscription]) -> Result<Vec<String>, ConfigError> {
        // Subscription set already lives in the endpoint URL.
        Ok(Vec::new())
    }

    fn decompress(&self, frame: &Frame) -> Result<String, DecodeError> {
        match frame {
            Frame::Text(text) => Ok(text.clone()),
            Frame::Binary(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| DecodeError::Decompress(e.to_string())),
        }
    }

    fn classify(&self, msg: &Value) -> Classified {
        // WS-API error shape: {"error": {"code": n, "msg": ...}, "id": n}
        if let Some(error) = msg.get("error") {
            let message = error
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unspecified")
                .to_string();
            return Classified::Error(message);
        }
        // Ack shape for WS-API subscribe calls: {"result": null, "id": n}
        if msg.get("result").is_some() && msg.get("id").is_some() {
            return Classified::StatusAck;
        }

        let Some(stream) = msg.get("stream").and_then(Value::as_str) else {
            return Classified::Unrecognized;
        };
        let Some((wire_pair, wire_channel)) = stream.split_once('@') else {
            return Classified::Unrecognized;
        };
        let Some(symbol) = self.translator.pairs().to_canonical(wire_pair) else {
            return Classified::Unrecognized;
        };
        // depth streams may carry a suffix like depth@100ms
        let wire_channel = wire_channel.split('@').next().unwrap_or(wire_channel);
        let Some(channel) = self.translator.channels().to_canonical(wire_channel) else {
            return Classified::Unrecognized;
        };
        let Some(payload) = msg.get("data") else {
            return Classified::Unrecognized;
        };

        Classified::Update(ChannelUpdate {
            channel,
            symbol: symbol.to_string(),
            payload: payload.clone(),
        })
    }

    fn extract(&self, update: &ChannelUpdate) -> Vec<MarketEvent> {
        let result = match update.channel {
            Channel::Trades => self.extract_trade(update).map(MarketEvent::Trade),
            Channel::Ticker => self.extract_ticker(update).map(MarketEvent::Ticker),
            Channel::Book => self.extract_book(update).map(MarketEvent::Book),
        };
        match result {
            Ok(event) => vec![event],
            Err(e) => {
                warn!(symbol = %update.symbol, error = %e, "Malformed stream payload");
                Vec::new()
            }
        }
    }
}
