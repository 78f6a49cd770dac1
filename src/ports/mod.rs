//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the driver layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ExchangeAdapter`: per-exchange decode/keepalive/subscription strategy
//! - `Transport`/`Connector`: frame-level WebSocket abstraction
//! - `SymbolSource`: REST pair discovery collaborator

pub mod discovery;
pub mod exchange;
pub mod transport;

pub use discovery::SymbolSource;
pub use exchange::{
    ChannelUpdate, Classified, ExchangeAdapter, KeepalivePolicy, Subscription,
};
pub use transport::{Connector, Frame, Transport};
