//! Coinbase Adapter - Batched Subscribe and Heartbeat Liveness
//!
//! Coinbase accepts one subscribe message covering every product and
//! channel, acks it with a `subscriptions` message, and streams plain
//! JSON keyed by `type`. Liveness rides the `heartbeat` channel: a
//! heartbeat per product per second, no reply required — silence
//! beyond the window means the connection is dead.

use serde_json::{json, Value};
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

use super::{decimal_field, rfc3339_ms, str_field};

const EXCHANGE: ExchangeId = "COINBASE";
const WS_ENDPOINT: &str = "wss://ws-feed.exchange.coinbase.com";

/// Heartbeats arrive once per second per product.
const LIVENESS_WINDOW: std::time::Duration = std::time::Duration::from_secs(15);

pub struct CoinbaseAdapter {
    translator: SymbolTranslator,
}

impl CoinbaseAdapter {
    pub fn new(pairs: PairMap) -> Result<Self, ConfigError> {
        let channels = ChannelMap::new(
            "coinbase",
            [
                (Channel::Trades, "matches".to_string()),
                (Channel::Ticker, "ticker".to_string()),
                (Channel::Book, "level2".to_string()),
            ],
        )?;
        Ok(Self {
            translator: SymbolTranslator::new(channels, pairs),
        })
    }

    fn canonical_pair(&self, msg: &Value) -> Option<String> {
        let wire = msg.get("product_id")?.as_str()?;
        self.translator
            .pairs()
            .to_canonical(wire)
            .map(str::to_string)
    }

    fn extract_trade(&self, update: &ChannelUpdate) -> Result<Trade, DecodeError> {
        let msg = &update.payload;
        // Wire side is the maker order's side; emit the aggressor.
        let side = match str_field(msg, "side")? {
            "sell" => Side::Buy,
            "buy" => Side::Sell,
            other => return Err(DecodeError::Field(format!("side: {other}"))),
        };
        let trade_id = msg
            .get("trade_id")
            .map(Value::to_string)
            .ok_or_else(|| DecodeError::Field("trade_id".to_string()))?;

        Trade::new(
            EXCHANGE,
            update.symbol.clone(),
            rfc3339_ms(msg, "time")?,
            trade_id,
            side,
            decimal_field(msg, "size")?,
            decimal_field(msg, "price")?,
        )
    }

    fn extract_ticker(&self, update: &ChannelUpdate) -> Result<Ticker, DecodeError> {
        let msg = &update.payload;
        Ok(Ticker {
            exchange: EXCHANGE,
            symbol: update.symbol.clone(),
            timestamp_ms: rfc3339_ms(msg, "time")?,
            bid: decimal_field(msg, "best_bid")?,
            ask: decimal_field(msg, "best_ask")?,
        })
    }

    fn extract_book(&self, update: &ChannelUpdate, snapshot: bool) -> BookUpdate {
        let msg = &update.payload;
        let timestamp_ms = rfc3339_ms(msg, "time").unwrap_or(0);

        if snapshot {
            return BookUpdate {
                exchange: EXCHANGE,
                symbol: update.symbol.clone(),
                timestamp_ms,
                bids: super::book_levels(msg.get("bids")),
                asks: super::book_levels(msg.get("asks")),
                is_snapshot: true,
            };
        }

        // l2update carries [side, price, size] triples
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        if let Some(changes) = msg.get("changes").and_then(Value::as_array) {
            for change in changes {
                let Some(entries) = change.as_array() else { continue };
                let (Some(side), Some(price), Some(size)) = (
                    entries.first().and_then(Value::as_str),
                    entries.get(1),
                    entries.get(2),
                ) else {
                    continue;
                };
                let (Ok(price), Ok(size)) = (
                    super::decimal_value(price, "price"),
                    super::decimal_value(size, "size"),
                ) else {
                    continue;
                };
                match side {
                    "buy" => bids.push((price, size)),
                    "sell" => asks.push((price, size)),
                    _ => {}
                }
            }
        }

        BookUpdate {
            exchange: EXCHANGE,
            symbol: update.symbol.clone(),
            timestamp_ms,
            bids,
            asks,
            is_snapshot: false,
        }
    }
}

impl ExchangeAdapter for CoinbaseAdapter {
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

    /// One batched subscribe for the whole set, plus the heartbeat
    /// channel that backs the liveness window.
    fn subscribe_messages(&self, subs: &[Subscription]) -> Result<Vec<String>, ConfigError> {
        let mut product_ids = Vec::new();
        let mut channels = Vec::new();
        for (channel, pair) in subs {
            let wire_pair = self.translator.pairs().to_wire(pair)?.to_string();
            let wire_channel = self.translator.channels().to_wire(*channel)?.to_string();
            if !product_ids.contains(&wire_pair) {
                product_ids.push(wire_pair);
            }
            if !channels.contains(&wire_channel) {
                channels.push(wire_channel);
            }
        }
        channels.push("heartbeat".to_string());

        Ok(vec![json!({
            "type": "subscribe",
            "product_ids": product_ids,
            "channels": channels,
        })
        .to_string()])
    }

    fn decompress(&self, frame: &Frame) -> Result<String, DecodeError> {
        match frame {
            Frame::Text(text) => Ok(text.clone()),
            Frame::Binary(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| DecodeError::Decompress(e.to_string())),
        }
    }

    fn classify(&self, msg: &Value) -> Classified {
        let Some(kind) = msg.get("type").and_then(Value::as_str) else {
            return Classified::Unrecognized;
        };

        match kind {
            // No reply contract; heartbeats just feed the window.
            "heartbeat" => Classified::Keepalive { reply: None },
            "subscriptions" => Classified::StatusAck,
            "error" => {
                let message = msg
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unspecified")
                    .to_string();
                Classified::Error(message)
            }
            "match" | "last_match" => self
                .canonical_pair(msg)
                .map(|symbol| {
                    Classified::Update(ChannelUpdate {
                        channel: Channel::Trades,
                        symbol,
                        payload: msg.clone(),
                    })
                })
                .unwrap_or(Classified::Unrecognized),
            "ticker" => self
                .canonical_pair(msg)
                .map(|symbol| {
                    Classified::Update(ChannelUpdate {
                        channel: Channel::Ticker,
                        symbol,
                        payload: msg.clone(),
                    })
                })
                .unwrap_or(Classified::Unrecognized),
            "snapshot" | "l2update" => self
                .canonical_pair(msg)
                .map(|symbol| {
                    Classified::Update(ChannelUpdate {
                        channel: Channel::Book,
                        symbol,
                        payload: msg.clone(),
                    })
                })
                .unwrap_or(Classified::Unrecognized),
            _ => Classified::Unrecognized,
        }
    }

    fn extract(&self, update: &ChannelUpdate) -> Vec<MarketEvent> {
        match update.channel {
            Channel::Trades => match self.extract_trade(update) {
                Ok(trade) => vec![MarketEvent::Trade(trade)],
                Err(e) => {
                    warn!(symbol = %update.symbol, error = %e, "Malformed match");
                    Vec::new()
                }
            },
            Channel::Ticker => match self.extract_ticker(update) {
                Ok(ticker) => vec![MarketEvent::Ticker(ticker)],
                Err(e) => {
                    warn!(symbol = %update.symbol, error = %e, "Malformed ticker");
                    Vec::new()
                }
            },
            Channel::Book => {
                let snapshot = update
                    .payload
                    .get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t == "snapshot");
                vec![MarketEvent::Book(self.extract_book(update, snapshot))]
            }
        }
    }
}
