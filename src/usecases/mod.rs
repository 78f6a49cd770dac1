//! Use Cases Layer - Feed Orchestration Logic
//!
//! The exchange-agnostic machinery that turns per-exchange strategy
//! objects into a running feed: the driver loop, the liveness state
//! machine, and callback fan-out. Depends on ports only, never on
//! concrete adapters.

pub mod dispatch;
pub mod driver;
pub mod keepalive;

pub use dispatch::{EventCallback, EventDispatcher};
pub use driver::{
    ConnectionPhase, ConnectionState, DriverStats, FeedDriver, ReconnectPolicy,
};
pub use keepalive::{Liveness, LivenessMonitor};
