//! Domain types shared across the plugin services.
//!
//! Monetary quantities (amounts, prices, balances, values) are carried as
//! decimal strings end-to-end and only parsed to `f64` where a comparison or
//! multiplication happens. Wire serialization uses camelCase field names,
//! matching the JSON surface agent hosts consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Solana,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Solana => "solana",
        }
    }

    /// EVM chain id, where the network has one.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Network::Ethereum => Some(1),
            Network::Solana => None,
        }
    }

    /// Ticker symbol of the network's native asset.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Network::Ethereum => "ETH",
            Network::Solana => "SOL",
        }
    }

    /// Asset id of the native asset on the price index.
    pub fn price_index_id(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Solana => "solana",
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Error> {
        match tag.to_lowercase().as_str() {
            "ethereum" => Ok(Network::Ethereum),
            "solana" => Ok(Network::Solana),
            other => Err(Error::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl FromStr for TradeSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(Error::Validation(format!("invalid trade side: {other}"))),
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("buy"),
            TradeSide::Sell => f.write_str("sell"),
        }
    }
}

/// Lifecycle state of a submitted trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Completed,
    Failed,
}

/// A trade as requested by the host, before submission.
///
/// For on-chain submission the `token` field is interpreted as the
/// destination address of a native-asset transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub network: Network,
    pub side: TradeSide,
    pub token: String,
    /// Amount in native-asset units, as a decimal string.
    pub amount: String,
    /// Unit price in USD, as a decimal string.
    pub price: String,
}

/// A submitted trade, as returned to the host. Immutable once returned;
/// nothing retains it beyond the caller's reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub network: Network,
    pub side: TradeSide,
    pub token: String,
    pub amount: String,
    pub price: String,
    pub timestamp: DateTime<Utc>,
    pub status: TradeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// Balance and USD value of a single asset, as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    pub balance: String,
    pub value: String,
}

/// Whether contract-token balances (ERC-20 / SPL) were enumerated.
///
/// Distinguishes "no tokens held" from "enumeration not implemented" so
/// callers are never handed a silently-empty map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenScan {
    Complete,
    NotSupported,
}

/// A wallet's holdings on one network, recomputed fresh on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub network: Network,
    pub tokens: HashMap<String, TokenBalance>,
    pub total_value: String,
    pub contract_tokens: TokenScan,
}

/// A point-in-time market quote, from a pull query or a push tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub token: String,
    pub price: String,
    pub volume_24h: String,
    pub change_24h: String,
    pub timestamp: DateTime<Utc>,
}

/// A named trading strategy with free-form parameters. Stored in memory,
/// keyed by id, last write wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingStrategy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub active: bool,
}

/// Outcome of storing a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyApplication {
    /// Strategy recorded; it was not flagged active.
    Stored,
    /// Strategy recorded, but applying an active strategy is not implemented.
    ActivationNotSupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_parses_supported_tags() {
        assert_eq!("ethereum".parse::<Network>().unwrap(), Network::Ethereum);
        assert_eq!("Solana".parse::<Network>().unwrap(), Network::Solana);
    }

    #[test]
    fn network_rejects_unknown_tags() {
        let err = "polygon".parse::<Network>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedNetwork(tag) if tag == "polygon"));
    }

    #[test]
    fn trade_serializes_camel_case() {
        let trade = Trade {
            id: "t-1".to_string(),
            network: Network::Ethereum,
            side: TradeSide::Buy,
            token: "0x0000000000000000000000000000000000000000".to_string(),
            amount: "1.5".to_string(),
            price: "2000".to_string(),
            timestamp: Utc::now(),
            status: TradeStatus::Completed,
            tx_hash: Some("0xabc".to_string()),
        };

        let value = serde_json::to_value(&trade).unwrap();
        assert_eq!(value["network"], "ethereum");
        assert_eq!(value["side"], "buy");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["txHash"], "0xabc");
    }

    #[test]
    fn portfolio_marks_unimplemented_token_scan() {
        let portfolio = Portfolio {
            network: Network::Solana,
            tokens: HashMap::new(),
            total_value: "0".to_string(),
            contract_tokens: TokenScan::NotSupported,
        };

        let value = serde_json::to_value(&portfolio).unwrap();
        assert_eq!(value["totalValue"], "0");
        assert_eq!(value["contractTokens"], "notSupported");
    }

    #[test]
    fn strategy_defaults_optional_fields() {
        let strategy: TradingStrategy =
            serde_json::from_value(serde_json::json!({ "id": "s1", "name": "momentum" })).unwrap();
        assert!(strategy.description.is_empty());
        assert!(strategy.parameters.is_empty());
        assert!(!strategy.active);
    }
}
