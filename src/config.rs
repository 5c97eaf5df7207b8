//! Configuration for the trading plugin
//!
//! Everything is environment-sourced with static fallbacks, so the plugin
//! can be registered with a host without a config file:
//!
//! ```bash
//! export ETHEREUM_RPC_URL="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! export SOLANA_RPC_URL="https://api.mainnet-beta.solana.com"
//! export TRADING_PRIVATE_KEY="..."   # hex for Ethereum, base58 for Solana
//! ```
//!
//! A JSON config file can override the defaults; the trading key is only
//! ever read from the environment and is never serialized.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::types::Network;

/// Environment variable names
pub mod env_vars {
    pub const ETHEREUM_RPC_URL: &str = "ETHEREUM_RPC_URL";
    pub const SOLANA_RPC_URL: &str = "SOLANA_RPC_URL";
    pub const TRADING_PRIVATE_KEY: &str = "TRADING_PRIVATE_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const SOLANA: &str = "https://api.mainnet-beta.solana.com";
}

/// RPC endpoint for one network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// RPC endpoints for the supported networks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworksConfig {
    pub ethereum: NetworkConfig,
    pub solana: NetworkConfig,
}

impl NetworksConfig {
    /// Build from `ETHEREUM_RPC_URL` / `SOLANA_RPC_URL`, falling back to
    /// public endpoints.
    pub fn from_env() -> Self {
        let ethereum = match std::env::var(env_vars::ETHEREUM_RPC_URL) {
            Ok(url) if !url.is_empty() => NetworkConfig {
                rpc_url: url,
                chain_id: Some(1),
            },
            _ => {
                tracing::warn!("No RPC configured for Ethereum, using public RPC (rate limited)");
                NetworkConfig {
                    rpc_url: public_rpcs::ETHEREUM.to_string(),
                    chain_id: Some(1),
                }
            }
        };

        let solana = match std::env::var(env_vars::SOLANA_RPC_URL) {
            Ok(url) if !url.is_empty() => NetworkConfig {
                rpc_url: url,
                chain_id: None,
            },
            _ => {
                tracing::warn!("No RPC configured for Solana, using public RPC (rate limited)");
                NetworkConfig {
                    rpc_url: public_rpcs::SOLANA.to_string(),
                    chain_id: None,
                }
            }
        };

        Self { ethereum, solana }
    }

    pub fn get(&self, network: Network) -> &NetworkConfig {
        match network {
            Network::Ethereum => &self.ethereum,
            Network::Solana => &self.solana,
        }
    }
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Trade submission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Maximum slippage tolerance (e.g., 0.5 for 0.5%)
    pub max_slippage_percent: f64,
    /// Gas limit for Ethereum transfers
    pub gas_limit: u64,
    /// Timeout for upstream calls (milliseconds)
    pub timeout_ms: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_slippage_percent: 0.5,
            gas_limit: 300_000,
            timeout_ms: 30_000,
        }
    }
}

/// Risk management settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum trade amount in native-asset units (not value)
    pub max_position_size: f64,
    /// Default stop-loss distance (percent)
    pub stop_loss_percent: f64,
    /// Default take-profit distance (percent)
    pub take_profit_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: 1000.0,
            stop_loss_percent: 5.0,
            take_profit_percent: 10.0,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub networks: NetworksConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    /// Shared trading key, environment-only. Never serialized, never logged.
    #[serde(skip)]
    pub trading_key: Option<SecretString>,
}

impl Config {
    /// Build the full configuration from the environment.
    pub fn from_env() -> Self {
        let trading_key = std::env::var(env_vars::TRADING_PRIVATE_KEY)
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        if trading_key.is_none() {
            tracing::warn!(
                "{} not set - portfolio and trade actions will fail",
                env_vars::TRADING_PRIVATE_KEY
            );
        }

        Self {
            networks: NetworksConfig::from_env(),
            trading: TradingConfig::default(),
            risk: RiskConfig::default(),
            trading_key,
        }
    }

    /// Load configuration from a JSON file. The trading key still comes from
    /// the environment; it is never read from files.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            crate::error::Error::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.trading_key = std::env::var(env_vars::TRADING_PRIVATE_KEY)
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        Ok(config)
    }

    pub fn rpc_url(&self, network: Network) -> &str {
        &self.networks.get(network).rpc_url
    }

    /// The trading key, or a wallet error when none is configured.
    pub fn require_trading_key(&self) -> crate::error::Result<&SecretString> {
        self.trading_key.as_ref().ok_or_else(|| {
            crate::error::Error::Wallet(format!(
                "{} is not configured",
                env_vars::TRADING_PRIVATE_KEY
            ))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trading_defaults() {
        let trading = TradingConfig::default();
        assert_eq!(trading.max_slippage_percent, 0.5);
        assert_eq!(trading.gas_limit, 300_000);
        assert_eq!(trading.timeout_ms, 30_000);
    }

    #[test]
    fn risk_defaults() {
        let risk = RiskConfig::default();
        assert_eq!(risk.max_position_size, 1000.0);
        assert_eq!(risk.stop_loss_percent, 5.0);
        assert_eq!(risk.take_profit_percent, 10.0);
    }

    #[test]
    fn config_file_overrides_sections() {
        let value = serde_json::json!({
            "networks": {
                "ethereum": { "rpc_url": "https://custom.rpc", "chain_id": 1 },
                "solana": { "rpc_url": "https://custom.solana.rpc" }
            },
            "risk": {
                "max_position_size": 50.0,
                "stop_loss_percent": 2.0,
                "take_profit_percent": 4.0
            }
        });

        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.rpc_url(Network::Ethereum), "https://custom.rpc");
        assert_eq!(parsed.networks.solana.chain_id, None);
        assert_eq!(parsed.risk.max_position_size, 50.0);
        // Trading section was omitted and falls back to defaults.
        assert_eq!(parsed.trading.gas_limit, 300_000);
        // The key never comes from a file.
        assert!(parsed.trading_key.is_none());
    }

    #[test]
    fn trading_key_is_never_serialized() {
        let config = Config {
            networks: NetworksConfig {
                ethereum: NetworkConfig {
                    rpc_url: "https://example.invalid".to_string(),
                    chain_id: Some(1),
                },
                solana: NetworkConfig {
                    rpc_url: "https://example.invalid".to_string(),
                    chain_id: None,
                },
            },
            trading: TradingConfig::default(),
            risk: RiskConfig::default(),
            trading_key: Some(SecretString::from("super-secret".to_string())),
        };

        let serialized = serde_json::to_string(&config).unwrap();
        assert!(!serialized.contains("super-secret"));
        assert!(!serialized.contains("trading_key"));
    }
}
