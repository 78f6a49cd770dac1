//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits with concrete external dependencies.
//!
//! Adapter categories:
//! - `exchanges`: per-exchange wire protocol strategies
//! - `ws`: tokio-tungstenite transport
//! - `discovery`: REST symbol discovery (reqwest)
//! - `supervisor`: feed task lifecycle and health
//! - `metrics`: Prometheus export

pub mod discovery;
pub mod exchanges;
pub mod metrics;
pub mod supervisor;
pub mod ws;

pub use supervisor::{FeedSpec, FeedSupervisor};
pub use ws::WsConnector;
