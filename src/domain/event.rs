//! Canonical Market Event Model
//!
//! Exchange-agnostic shapes delivered to callbacks. Pure data, no
//! behavior beyond invariant-checking constructors. Monetary fields
//! use `rust_decimal::Decimal` — exchange-reported values must survive
//! normalization without binary-float precision loss.

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DecodeError;

/// Short identifier of the source exchange (e.g. "HUOBI").
pub type ExchangeId = &'static str;

/// Trade aggressor side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A single executed trade (one fill; wire batches fan out to many).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    /// Source exchange.
    pub exchange: ExchangeId,
    /// Canonical pair, e.g. "BTC-USD".
    pub symbol: String,
    /// Exchange-reported event time (Unix ms). Monotonic per symbol
    /// is not guaranteed across exchanges.
    pub timestamp_ms: u64,
    /// Exchange-assigned trade/order identifier.
    pub order_id: String,
    /// Aggressor side.
    pub side: Side,
    /// Fill quantity. Always > 0.
    pub amount: Decimal,
    /// Fill price.
    pub price: Decimal,
}

impl Trade {
    /// Build a trade, enforcing `amount > 0`.
    pub fn new(
        exchange: ExchangeId,
        symbol: String,
        timestamp_ms: u64,
        order_id: String,
        side: Side,
        amount: Decimal,
        price: Decimal,
    ) -> Result<Self, DecodeError> {
        if amount <= Decimal::ZERO {
            return Err(DecodeError::Invariant(format!(
                "trade amount must be > 0, got {amount} ({exchange} {symbol})"
            )));
        }
        Ok(Self {
            exchange,
            symbol,
            timestamp_ms,
            order_id,
            side,
            amount,
            price,
        })
    }
}

/// Best bid/offer update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticker {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub timestamp_ms: u64,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// A single price level: (price, size). Size zero deletes the level.
pub type BookLevel = (Decimal, Decimal);

/// Level-2 order book update (snapshot or delta).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookUpdate {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub timestamp_ms: u64,
    /// Bid levels in the order the exchange reported them.
    pub bids: Vec<BookLevel>,
    /// Ask levels in the order the exchange reported them.
    pub asks: Vec<BookLevel>,
    /// True when this replaces prior book state rather than patching it.
    pub is_snapshot: bool,
}

/// The canonical event delivered to user callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MarketEvent {
    Trade(Trade),
    Ticker(Ticker),
    Book(BookUpdate),
}

impl MarketEvent {
    /// Canonical pair this event concerns.
    pub fn symbol(&self) -> &str {
        match self {
            Self::Trade(t) => &t.symbol,
            Self::Ticker(t) => &t.symbol,
            Self::Book(b) => &b.symbol,
        }
    }

    /// Source exchange identifier.
    pub fn exchange(&self) -> ExchangeId {
        match self {
            Self::Trade(t) => t.exchange,
            Self::Ticker(t) => t.exchange,
            Self::Book(b) => b.exchange,
        }
    }

    /// Exchange-reported event time (Unix ms).
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Trade(t) => t.timestamp_ms,
            Self::Ticker(t) => t.timestamp_ms,
            Self::Book(b) => b.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trade_rejects_zero_amount() {
        let result = Trade::new(
            "TEST",
            "BTC-USD".into(),
            1_549_757_127_140,
            "1".into(),
            Side::Buy,
            dec!(0),
            dec!(3669.69),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_trade_rejects_negative_amount() {
        let result = Trade::new(
            "TEST",
            "BTC-USD".into(),
            1_549_757_127_140,
            "1".into(),
            Side::Sell,
            dec!(-0.5),
            dec!(100),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_trade_keeps_exact_decimals() {
        let trade = Trade::new(
            "TEST",
            "BTC-USD".into(),
            1_549_757_127_140,
            "1".into(),
            Side::Buy,
            dec!(0.0777),
            dec!(3669.69),
        )
        .unwrap();
        assert_eq!(trade.amount.to_string(), "0.0777");
        assert_eq!(trade.price.to_string(), "3669.69");
    }
}
