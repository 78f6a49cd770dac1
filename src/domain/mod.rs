//! Domain layer - Core feed-handler models.
//!
//! Pure types for the canonical event model, symbol translation, and
//! the error taxonomy. No transport or runtime dependencies here
//! (hexagonal architecture inner ring); everything is testable in
//! isolation.

pub mod error;
pub mod event;
pub mod symbols;

// Re-export core types for convenience
pub use error::{ConfigError, DecodeError, FeedError, TransportError};
pub use event::{BookLevel, BookUpdate, ExchangeId, MarketEvent, Side, Ticker, Trade};
pub use symbols::{Channel, ChannelMap, PairMap, SymbolTranslator};
