//! Symbol Discovery Port - Pair Mapping Source
//!
//! Contract for the REST collaborator that maps canonical pairs to
//! exchange wire symbols. Called once per exchange before the first
//! connection attempt; failure is fatal to that exchange's adapter
//! startup only, never to the whole process.

use async_trait::async_trait;

/// Fetches the canonical-pair → wire-symbol mapping for one exchange.
#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// Returns (canonical pair, wire symbol) entries, e.g.
    /// ("BTC-USD", "btcusd"). The result seeds an immutable `PairMap`.
    async fn fetch_pairs(&self) -> anyhow::Result<Vec<(String, String)>>;
}
