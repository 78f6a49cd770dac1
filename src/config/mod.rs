//! Configuration Module - TOML-based Feed Configuration
//!
//! Loads and validates configuration from `config.toml`. Subscription
//! sets, reconnect policy, and endpoints for observability are all
//! externalized here - nothing is hardcoded in the domain layer.

pub mod loader;

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level feed handler configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any connection attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Process identity and logging.
    pub feed: FeedConfig,
    /// One entry per exchange connection.
    pub exchanges: Vec<ExchangeConfig>,
    /// Reconnection policy shared by all drivers.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Event fan-out configuration.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Metrics and health endpoints.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Process identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Human-readable handler name.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One exchange connection definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Exchange id: huobi, binance, coinbase.
    pub id: String,
    /// Whether this connection is started.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Canonical pairs to subscribe, e.g. "BTC-USDT".
    pub pairs: Vec<String>,
    /// Canonical channels to subscribe: trades, ticker, book.
    pub channels: Vec<String>,
    /// Optional canonical → wire overrides. When non-empty, REST
    /// symbol discovery is skipped for this exchange.
    #[serde(default)]
    pub pair_overrides: HashMap<String, String>,
}

/// Reconnection policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// First backoff delay (milliseconds).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff cap (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Retry budget per driver. Absent means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: None,
        }
    }
}

/// Event fan-out configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Broadcast channel buffer. Lagging consumers skip the oldest
    /// events rather than blocking the receive loops.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
        }
    }
}

/// Metrics and health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus/health HTTP server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Health/metrics server bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
        }
    }
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_buffer() -> usize {
    4_096
}

fn default_bind_address() -> String {
    "0.0.0.0:9090".to_string()
}
