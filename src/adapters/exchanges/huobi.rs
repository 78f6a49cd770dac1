//! Huobi Adapter - Gzip Frames and Application-Layer Ping/Pong
//!
//! Huobi sends every frame gzip-compressed in a binary WebSocket
//! message and requires an application-layer pong echoing the ping
//! nonce; a missed echo gets the client disconnected within seconds.
//! Subscriptions go out one message per (channel, pair) topic, each
//! with a unique client-assigned id.

use std::io::Read;

use flate2::read::GzDecoder;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

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

const EXCHANGE: ExchangeId = "HUOBI";
const WS_ENDPOINT: &str = "wss://api.huobi.pro/ws";

/// Ping cadence is ~5s; two missed pings means the connection is gone.
const LIVENESS_WINDOW: std::time::Duration = std::time::Duration::from_secs(12);

pub struct HuobiAdapter {
    translator: SymbolTranslator,
}

impl HuobiAdapter {
    pub fn new(pairs: PairMap) -> Result<Self, ConfigError> {
        let channels = ChannelMap::new(
            "huobi",
            [
                (Channel::Trades, "trade.detail".to_string()),
                (Channel::Ticker, "bbo".to_string()),
                (Channel::Book, "depth.step0".to_string()),
            ],
        )?;
        Ok(Self {
            translator: SymbolTranslator::new(channels, pairs),
        })
    }

    /// Wire topic: `market.{symbol}.{channel}`.
    fn topic(&self, sub: &Subscription) -> Result<String, ConfigError> {
        let wire_channel = self.translator.channels().to_wire(sub.0)?;
        let wire_pair = self.translator.pairs().to_wire(&sub.1)?;
        Ok(format!("market.{wire_pair}.{wire_channel}"))
    }

    /// Split a `ch` topic back into canonical (channel, pair).
    fn classify_topic(&self, topic: &str) -> Option<(Channel, String)> {
        let rest = topic.strip_prefix("market.")?;
        let (wire_pair, wire_channel) = rest.split_once('.')?;
        let channel = self.translator.channels().to_canonical(wire_channel)?;
        let pair = self.translator.pairs().to_canonical(wire_pair)?;
        Some((channel, pair.to_string()))
    }

    fn extract_trades(&self, update: &ChannelUpdate) -> Vec<MarketEvent> {
        let Some(batch) = update.payload.get("data").and_then(Value::as_array) else {
            warn!(symbol = %update.symbol, "Trade tick without data array");
            return Vec::new();
        };

        // One wire batch fans out to one event per fill, in payload
        // order. A malformed element is skipped; siblings survive.
        let mut events = Vec::with_capacity(batch.len());
        for element in batch {
            match self.extract_one_trade(&update.symbol, element) {
                Ok(trade) => events.push(MarketEvent::Trade(trade)),
                Err(e) => {
                    warn!(symbol = %update.symbol, error = %e,
                          "Skipping malformed trade element");
                }
            }
        }
        events
    }

    fn extract_one_trade(
        &self,
        symbol: &str,
        element: &Value,
    ) -> Result<Trade, DecodeError> {
        let side = match str_field(element, "direction")? {
            "buy" => Side::Buy,
            "sell" => Side::Sell,
            other => {
                return Err(DecodeError::Field(format!("direction: {other}")))
            }
        };
        let order_id = element
            .get("id")
            .map(Value::to_string)
            .ok_or_else(|| DecodeError::Field("id".to_string()))?;

        Trade::new(
            EXCHANGE,
            symbol.to_string(),
            u64_field(element, "ts")?,
            order_id,
            side,
            decimal_field(element, "amount")?,
            decimal_field(element, "price")?,
        )
    }

    fn extract_ticker(&self, update: &ChannelUpdate) -> Vec<MarketEvent> {
        let tick = &update.payload;
        let result = (|| -> Result<Ticker, DecodeError> {
            Ok(Ticker {
                exchange: EXCHANGE,
                symbol: update.symbol.clone(),
                timestamp_ms: u64_field(tick, "quoteTime")
                    .or_else(|_| u64_field(tick, "ts"))?,
                bid: decimal_field(tick, "bid")?,
                ask: decimal_field(tick, "ask")?,
            })
        })();
        match result {
            Ok(ticker) => vec![MarketEvent::Ticker(ticker)],
            Err(e) => {
                warn!(symbol = %update.symbol, error = %e, "Malformed bbo tick");
                Vec::new()
            }
        }
    }

    fn extract_book(&self, update: &ChannelUpdate) -> Vec<MarketEvent> {
        let tick = &update.payload;
        let bids = super::book_levels(tick.get("bids"));
        let asks = super::book_levels(tick.get("asks"));
        let timestamp_ms = tick.get("ts").and_then(Value::as_u64).unwrap_or(0);

        vec![MarketEvent::Book(BookUpdate {
            exchange: EXCHANGE,
            symbol: update.symbol.clone(),
            timestamp_ms,
            bids,
            asks,
            // depth.step0 pushes full snapshots, not deltas
            is_snapshot: true,
        })]
    }
}

impl ExchangeAdapter for HuobiAdapter {
    fn id(&self) -> ExchangeId {
        EXCHANGE
    }

    fn translator(&self) -> &SymbolTranslator {
        &self.translator
    }

    fn keepalive_policy(&self) -> KeepalivePolicy {
        KeepalivePolicy::timeout(LIVENESS_WINDOW)
    }

    fn endpoint(&self, _subs: &[Subscription]) -> Result<String, ConfigError> {
        Ok(WS_ENDPOINT.to_string())
    }

    fn subscribe_messages(&self, subs: &[Subscription]) -> Result<Vec<String>, ConfigError> {
        // One message per (channel, pair); Huobi rejects batched subs.
        subs.iter()
            .map(|sub| {
                let topic = self.topic(sub)?;
                Ok(json!({ "sub": topic, "id": Uuid::new_v4().to_string() })
                    .to_string())
            })
            .collect()
    }

    fn decompress(&self, frame: &Frame) -> Result<String, DecodeError> {
        match frame {
            Frame::Binary(bytes) => {
                let mut decoder = GzDecoder::new(bytes.as_slice());
                let mut text = String::new();
                decoder
                    .read_to_string(&mut text)
                    .map_err(|e| DecodeError::Decompress(e.to_string()))?;
                Ok(text)
            }
            Frame::Text(text) => Ok(text.clone()),
        }
    }

    fn classify(&self, msg: &Value) -> Classified {
        if let Some(nonce) = msg.get("ping") {
            return Classified::Keepalive {
                reply: Some(json!({ "pong": nonce }).to_string()),
            };
        }
        if msg.get("status").and_then(Value::as_str) == Some("error") {
            let message = msg
                .get("err-msg")
                .and_then(Value::as_str)
                .unwrap_or("unspecified")
                .to_string();
            return Classified::Error(message);
        }
        if msg.get("subbed").is_some() || msg.get("status").is_some() {
            return Classified::StatusAck;
        }
        if let Some(topic) = msg.get("ch").and_then(Value::as_str) {
            if let Some((channel, symbol)) = self.classify_topic(topic) {
                if let Some(payload) = msg.get("tick") {
                    return Classified::Update(ChannelUpdate {
                        channel,
                        symbol,
                        payload: payload.clone(),
                    });
                }
            }
        }
        Classified::Unrecognized
    }

    fn extract(&self, update: &ChannelUpdate) -> Vec<MarketEvent> {
        match update.channel {
            Channel::Trades => self.extract_trades(update),
            Channel::Ticker => self.extract_ticker(update),
            Channel::Book => self.extract_book(update),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use rust_decimal_macros::dec;

    use super::*;

    fn adapter() -> HuobiAdapter {
        let pairs = PairMap::new(
            "huobi",
            [
                ("BTC-USD".to_string(), "btcusd".to_string()),
                ("ETH-USD".to_string(), "ethusd".to_string()),
            ],
        )
        .unwrap();
        HuobiAdapter::new(pairs).unwrap()
    }

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    /// Full pipeline on a compressed trade batch: one fill in the
    /// batch, one Trade out, decimals exact.
    #[test]
    fn test_compressed_trade_batch_to_canonical_trade() {
        let adapter = adapter();
        let wire = r#"{"ch":"market.btcusd.trade.detail","ts":1549757127140,"tick":{"data":[{"id":1,"amount":"0.0777","price":"3669.69","direction":"buy","ts":1549757127140}]}}"#;
        let frame = Frame::Binary(gzip(wire));

        let text = adapter.decompress(&frame).unwrap();
        let parsed = adapter.parse(&text).unwrap();
        let Classified::Update(update) = adapter.classify(&parsed) else {
            panic!("expected channel update");
        };
        let events = adapter.extract(&update);

        assert_eq!(events.len(), 1);
        let MarketEvent::Trade(trade) = &events[0] else {
            panic!("expected trade");
        };
        assert_eq!(trade.symbol, "BTC-USD");
        assert_eq!(trade.side, Side::Buy);
        assert_eq!(trade.amount, dec!(0.0777));
        assert_eq!(trade.price, dec!(3669.69));
        assert_eq!(trade.order_id, "1");
        assert_eq!(trade.timestamp_ms, 1_549_757_127_140);
    }

    #[test]
    fn test_ping_classifies_as_keepalive_with_pong_reply() {
        let adapter = adapter();
        let parsed = adapter.parse(r#"{"ping": 42}"#).unwrap();
        let Classified::Keepalive { reply } = adapter.classify(&parsed) else {
            panic!("expected keepalive");
        };
        assert_eq!(reply.unwrap(), r#"{"pong":42}"#);
    }

    #[test]
    fn test_malformed_batch_element_is_isolated() {
        let adapter = adapter();
        let wire = r#"{"ch":"market.btcusd.trade.detail","ts":1,"tick":{"data":[
            {"id":1,"amount":"0.5","price":"100","direction":"buy","ts":1},
            {"id":2,"amount":"not-a-number","price":"100","direction":"buy","ts":2},
            {"id":3,"amount":"0","price":"100","direction":"sell","ts":3},
            {"id":4,"amount":"1.25","price":"101","direction":"sell","ts":4}
        ]}}"#;
        let parsed = adapter.parse(wire).unwrap();
        let Classified::Update(update) = adapter.classify(&parsed) else {
            panic!("expected channel update");
        };

        let events = adapter.extract(&update);
        // elements 2 (bad decimal) and 3 (zero amount) dropped,
        // siblings kept in payload order
        assert_eq!(events.len(), 2);
        let ids: Vec<_> = events
            .iter()
            .map(|e| match e {
                MarketEvent::Trade(t) => t.order_id.clone(),
                _ => panic!("expected trades"),
            })
            .collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_one_subscribe_message_per_channel_pair() {
        let adapter = adapter();
        let subs = vec![
            (Channel::Trades, "BTC-USD".to_string()),
            (Channel::Trades, "ETH-USD".to_string()),
            (Channel::Ticker, "BTC-USD".to_string()),
        ];
        let messages = adapter.subscribe_messages(&subs).unwrap();
        assert_eq!(messages.len(), 3);

        let first: Value = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(first["sub"], "market.btcusd.trade.detail");
        assert!(first["id"].as_str().is_some_and(|id| !id.is_empty()));

        // client ids are unique per request
        let ids: std::collections::HashSet<String> = messages
            .iter()
            .map(|m| {
                let v: Value = serde_json::from_str(m).unwrap();
                v["id"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_error_status_surfaces_message() {
        let adapter = adapter();
        let parsed = adapter
            .parse(r#"{"status":"error","err-code":"bad-request","err-msg":"invalid topic market.btcusd.kline","id":"id1"}"#)
            .unwrap();
        let Classified::Error(message) = adapter.classify(&parsed) else {
            panic!("expected error classification");
        };
        assert_eq!(message, "invalid topic market.btcusd.kline");
    }

    #[test]
    fn test_subscribe_ack_is_status() {
        let adapter = adapter();
        let parsed = adapter
            .parse(r#"{"id":"id1","subbed":"market.btcusd.trade.detail","status":"ok"}"#)
            .unwrap();
        assert!(matches!(adapter.classify(&parsed), Classified::StatusAck));
    }

    #[test]
    fn test_unknown_topic_is_unrecognized() {
        let adapter = adapter();
        let parsed = adapter
            .parse(r#"{"ch":"market.btcusd.kline.1min","tick":{}}"#)
            .unwrap();
        assert!(matches!(adapter.classify(&parsed), Classified::Unrecognized));
    }

    #[test]
    fn test_corrupt_gzip_is_decode_error() {
        let adapter = adapter();
        let frame = Frame::Binary(vec![0x1f, 0x8b, 0xff, 0x00, 0x01]);
        assert!(matches!(
            adapter.decompress(&frame),
            Err(DecodeError::Decompress(_))
        ));
    }

    #[test]
    fn test_bbo_tick_to_ticker() {
        let adapter = adapter();
        let wire = r#"{"ch":"market.btcusd.bbo","ts":1549757127140,"tick":{"bid":"3669.50","ask":"3669.75","quoteTime":1549757127000}}"#;
        let parsed = adapter.parse(wire).unwrap();
        let Classified::Update(update) = adapter.classify(&parsed) else {
            panic!("expected channel update");
        };
        let events = adapter.extract(&update);
        assert_eq!(events.len(), 1);
        let MarketEvent::Ticker(ticker) = &events[0] else {
            panic!("expected ticker");
        };
        assert_eq!(ticker.bid, dec!(3669.50));
        assert_eq!(ticker.ask, dec!(3669.75));
        assert_eq!(ticker.timestamp_ms, 1_549_757_127_000);
    }
}
