//! Symbol and Channel Translation
//!
//! Bidirectional mapping between canonical names ("BTC-USD", Trades)
//! and each exchange's wire vocabulary ("btcusdt", "trade.detail").
//! Pure lookup, no state: maps are built once at startup, validated
//! for injectivity, and never mutated afterwards — safe to share
//! read-only across adapter tasks via `Arc`.

use std::collections::HashMap;

use super::error::ConfigError;

/// Canonical channel kinds the feed handler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Executed trades.
    Trades,
    /// Best bid/offer updates.
    Ticker,
    /// Level-2 order book updates.
    Book,
}

impl Channel {
    /// Canonical name as written in configuration files.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Trades => "trades",
            Self::Ticker => "ticker",
            Self::Book => "book",
        }
    }

    /// Parse a canonical channel name from configuration.
    pub fn from_canonical(name: &str) -> Option<Self> {
        match name {
            "trades" => Some(Self::Trades),
            "ticker" => Some(Self::Ticker),
            "book" => Some(Self::Book),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Immutable canonical-channel ↔ wire-string map for one exchange.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    exchange: String,
    to_wire: HashMap<Channel, String>,
    to_canonical: HashMap<String, Channel>,
}

impl ChannelMap {
    /// Build from (channel, wire) entries, rejecting duplicates in
    /// either direction so round-trips stay unambiguous.
    pub fn new(
        exchange: &str,
        entries: impl IntoIterator<Item = (Channel, String)>,
    ) -> Result<Self, ConfigError> {
        let mut to_wire = HashMap::new();
        let mut to_canonical = HashMap::new();
        for (channel, wire) in entries {
            if to_wire.insert(channel, wire.clone()).is_some() {
                return Err(ConfigError::DuplicateMapping {
                    exchange: exchange.to_string(),
                    entry: channel.to_string(),
                });
            }
            if to_canonical.insert(wire.clone(), channel).is_some() {
                return Err(ConfigError::DuplicateMapping {
                    exchange: exchange.to_string(),
                    entry: wire,
                });
            }
        }
        Ok(Self {
            exchange: exchange.to_string(),
            to_wire,
            to_canonical,
        })
    }

    /// Canonical channel → exchange wire string.
    pub fn to_wire(&self, channel: Channel) -> Result<&str, ConfigError> {
        self.to_wire
            .get(&channel)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnmappedChannel {
                exchange: self.exchange.clone(),
                channel: channel.to_string(),
            })
    }

    /// Exchange wire string → canonical channel.
    pub fn to_canonical(&self, wire: &str) -> Option<Channel> {
        self.to_canonical.get(wire).copied()
    }
}

/// Immutable canonical-pair ↔ wire-pair map for one exchange.
///
/// Populated from symbol discovery before any subscription occurs.
/// Both directions are O(1).
#[derive(Debug, Clone)]
pub struct PairMap {
    exchange: String,
    to_wire: HashMap<String, String>,
    to_canonical: HashMap<String, String>,
}

impl PairMap {
    /// Build from (canonical, wire) entries, rejecting duplicates in
    /// either direction.
    pub fn new(
        exchange: &str,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let mut to_wire = HashMap::new();
        let mut to_canonical = HashMap::new();
        for (canonical, wire) in entries {
            if to_wire.insert(canonical.clone(), wire.clone()).is_some() {
                return Err(ConfigError::DuplicateMapping {
                    exchange: exchange.to_string(),
                    entry: canonical,
                });
            }
            if to_canonical.insert(wire, canonical.clone()).is_some() {
                return Err(ConfigError::DuplicateMapping {
                    exchange: exchange.to_string(),
                    entry: canonical,
                });
            }
        }
        Ok(Self {
            exchange: exchange.to_string(),
            to_wire,
            to_canonical,
        })
    }

    /// Canonical pair ("BTC-USD") → wire symbol ("btcusdt").
    pub fn to_wire(&self, canonical: &str) -> Result<&str, ConfigError> {
        self.to_wire
            .get(canonical)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnmappedPair {
                exchange: self.exchange.clone(),
                pair: canonical.to_string(),
            })
    }

    /// Wire symbol → canonical pair.
    pub fn to_canonical(&self, wire: &str) -> Option<&str> {
        self.to_canonical.get(wire).map(String::as_str)
    }

    /// All canonical pairs known to this exchange.
    pub fn canonical_pairs(&self) -> impl Iterator<Item = &str> {
        self.to_wire.keys().map(String::as_str)
    }
}

/// Combined per-exchange translator injected into each adapter.
#[derive(Debug, Clone)]
pub struct SymbolTranslator {
    channels: ChannelMap,
    pairs: PairMap,
}

impl SymbolTranslator {
    pub fn new(channels: ChannelMap, pairs: PairMap) -> Self {
        Self { channels, pairs }
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    pub fn pairs(&self) -> &PairMap {
        &self.pairs
    }

    /// Fail-fast check that every requested (channel, pair) has a wire
    /// mapping. Called before any connection attempt so misconfiguration
    /// never surfaces at message-handling time.
    pub fn ensure_subscribable(
        &self,
        subscriptions: &[(Channel, String)],
    ) -> Result<(), ConfigError> {
        for (channel, pair) in subscriptions {
            self.channels.to_wire(*channel)?;
            self.pairs.to_wire(pair)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> SymbolTranslator {
        let channels = ChannelMap::new(
            "TEST",
            [
                (Channel::Trades, "trade.detail".to_string()),
                (Channel::Ticker, "bbo".to_string()),
            ],
        )
        .unwrap();
        let pairs = PairMap::new(
            "TEST",
            [("BTC-USD".to_string(), "btcusd".to_string())],
        )
        .unwrap();
        SymbolTranslator::new(channels, pairs)
    }

    #[test]
    fn test_pair_round_trip() {
        let t = translator();
        let wire = t.pairs().to_wire("BTC-USD").unwrap();
        assert_eq!(t.pairs().to_canonical(wire), Some("BTC-USD"));
    }

    #[test]
    fn test_channel_round_trip() {
        let t = translator();
        let wire = t.channels().to_wire(Channel::Trades).unwrap();
        assert_eq!(t.channels().to_canonical(wire), Some(Channel::Trades));
    }

    #[test]
    fn test_unmapped_pair_is_config_error() {
        let t = translator();
        let err = t
            .ensure_subscribable(&[(Channel::Trades, "DOGE-USD".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnmappedPair { .. }));
    }

    #[test]
    fn test_unmapped_channel_is_config_error() {
        let t = translator();
        let err = t
            .ensure_subscribable(&[(Channel::Book, "BTC-USD".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnmappedChannel { .. }));
    }

    #[test]
    fn test_duplicate_wire_value_rejected() {
        let result = PairMap::new(
            "TEST",
            [
                ("BTC-USD".to_string(), "btcusd".to_string()),
                ("BTC-USDT".to_string(), "btcusd".to_string()),
            ],
        );
        assert!(result.is_err());
    }
}
