//! Symbol Discovery - REST Pair Sources
//!
//! One `SymbolSource` per exchange, hitting the venue's public
//! instrument listing once at startup to build the canonical-pair ↔
//! wire-symbol mapping. Only instruments in a tradeable state are
//! included. A `StaticSymbolSource` covers offline runs and tests.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::ports::discovery::SymbolSource;

/// Fixed mapping supplied by configuration; no network.
pub struct StaticSymbolSource {
    entries: Vec<(String, String)>,
}

impl StaticSymbolSource {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl SymbolSource for StaticSymbolSource {
    async fn fetch_pairs(&self) -> anyhow::Result<Vec<(String, String)>> {
        Ok(self.entries.clone())
    }
}

/// Build the REST source for a configured exchange id.
pub fn rest_source(exchange: &str, client: reqwest::Client) -> Option<Box<dyn SymbolSource>> {
    match exchange {
        "huobi" => Some(Box::new(HuobiSymbolSource {
            client,
            base_url: "https://api.huobi.pro".to_string(),
        })),
        "binance" => Some(Box::new(BinanceSymbolSource {
            client,
            base_url: "https://api.binance.com".to_string(),
        })),
        "coinbase" => Some(Box::new(CoinbaseSymbolSource {
            client,
            base_url: "https://api.exchange.coinbase.com".to_string(),
        })),
        _ => None,
    }
}

// ── Huobi ───────────────────────────────────────────────────

pub struct HuobiSymbolSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct HuobiSymbols {
    data: Vec<HuobiSymbol>,
}

#[derive(Deserialize)]
struct HuobiSymbol {
    #[serde(rename = "base-currency")]
    base: String,
    #[serde(rename = "quote-currency")]
    quote: String,
    symbol: String,
    state: String,
}

#[async_trait]
impl SymbolSource for HuobiSymbolSource {
    async fn fetch_pairs(&self) -> anyhow::Result<Vec<(String, String)>> {
        let url = format!("{}/v1/common/symbols", self.base_url);
        let response: HuobiSymbols =
            self.client.get(&url).send().await?.error_for_status()?.json().await?;

        let pairs: Vec<_> = response
            .data
            .into_iter()
            .filter(|s| s.state == "online")
            .map(|s| {
                let canonical =
                    format!("{}-{}", s.base.to_uppercase(), s.quote.to_uppercase());
                (canonical, s.symbol)
            })
            .collect();
        info!(exchange = "huobi", pairs = pairs.len(), "Symbols discovered");
        Ok(pairs)
    }
}

// ── Binance ─────────────────────────────────────────────────

pub struct BinanceSymbolSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct BinanceExchangeInfo {
    symbols: Vec<BinanceSymbol>,
}

#[derive(Deserialize)]
struct BinanceSymbol {
    symbol: String,
    #[serde(rename = "baseAsset")]
    base: String,
    #[serde(rename = "quoteAsset")]
    quote: String,
    status: String,
}

#[async_trait]
impl SymbolSource for BinanceSymbolSource {
    async fn fetch_pairs(&self) -> anyhow::Result<Vec<(String, String)>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let response: BinanceExchangeInfo =
            self.client.get(&url).send().await?.error_for_status()?.json().await?;

        let pairs: Vec<_> = response
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| {
                let canonical = format!("{}-{}", s.base, s.quote);
                // stream names are lowercase on the wire
                (canonical, s.symbol.to_lowercase())
            })
            .collect();
        info!(exchange = "binance", pairs = pairs.len(), "Symbols discovered");
        Ok(pairs)
    }
}

// ── Coinbase ────────────────────────────────────────────────

pub struct CoinbaseSymbolSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CoinbaseProduct {
    id: String,
    base_currency: String,
    quote_currency: String,
    status: String,
}

#[async_trait]
impl SymbolSource for CoinbaseSymbolSource {
    async fn fetch_pairs(&self) -> anyhow::Result<Vec<(String, String)>> {
        let url = format!("{}/products", self.base_url);
        let response: Vec<CoinbaseProduct> =
            self.client.get(&url).send().await?.error_for_status()?.json().await?;

        let pairs: Vec<_> = response
            .into_iter()
            .filter(|p| p.status == "online")
            .map(|p| {
                let canonical = format!("{}-{}", p.base_currency, p.quote_currency);
                (canonical, p.id)
            })
            .collect();
        info!(exchange = "coinbase", pairs = pairs.len(), "Symbols discovered");
        Ok(pairs)
    }
}
