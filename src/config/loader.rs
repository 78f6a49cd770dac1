//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters, and
//! providing clear error messages for misconfiguration. Validation
//! failures surface before any connection attempt.

use std::path::Path;

use anyhow::{Context, Result};

use crate::adapters::exchanges::SUPPORTED;
use crate::domain::symbols::Channel;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;

    validate_config(&config)?;

    // Runs before tracing is initialized, so success is logged by the
    // caller once the subscriber is up.
    Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
    anyhow::ensure!(
        config.exchanges.iter().any(|e| e.enabled),
        "At least one exchange must be enabled"
    );

    for (i, exchange) in config.exchanges.iter().enumerate() {
        anyhow::ensure!(
            SUPPORTED.contains(&exchange.id.as_str()),
            "Exchange {} has unknown id {:?} (supported: {:?})",
            i,
            exchange.id,
            SUPPORTED
        );
        anyhow::ensure!(
            !exchange.pairs.is_empty(),
            "Exchange {} ({}) has no pairs configured",
            i,
            exchange.id
        );
        anyhow::ensure!(
            !exchange.channels.is_empty(),
            "Exchange {} ({}) has no channels configured",
            i,
            exchange.id
        );
        for pair in &exchange.pairs {
            anyhow::ensure!(
                pair.split('-').count() == 2,
                "Exchange {} ({}) pair {:?} is not of the form BASE-QUOTE",
                i,
                exchange.id,
                pair
            );
        }
        for channel in &exchange.channels {
            anyhow::ensure!(
                Channel::from_canonical(channel).is_some(),
                "Exchange {} ({}) has unknown channel {:?}",
                i,
                exchange.id,
                channel
            );
        }
    }

    anyhow::ensure!(
        config.reconnect.base_delay_ms > 0,
        "reconnect.base_delay_ms must be positive"
    );
    anyhow::ensure!(
        config.reconnect.max_delay_ms >= config.reconnect.base_delay_ms,
        "reconnect.max_delay_ms must be >= base_delay_ms"
    );
    anyhow::ensure!(config.dispatch.buffer > 0, "dispatch.buffer must be positive");
    anyhow::ensure!(
        !config.metrics.bind_address.is_empty(),
        "metrics.bind_address must not be empty"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_exchange() {
        let config: AppConfig = toml::from_str(
            r#"
            [feed]
            name = "test"

            [[exchanges]]
            id = "kraken"
            pairs = ["BTC-USD"]
            channels = ["trades"]
            "#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_pair_format() {
        let config: AppConfig = toml::from_str(
            r#"
            [feed]
            name = "test"

            [[exchanges]]
            id = "huobi"
            pairs = ["BTCUSD"]
            channels = ["trades"]
            "#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_accepts_minimal_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [feed]
            name = "test"

            [[exchanges]]
            id = "coinbase"
            pairs = ["BTC-USD"]
            channels = ["trades", "ticker"]
            "#,
        )
        .unwrap();
        assert!(validate_config(&config).is_ok());
    }
}
