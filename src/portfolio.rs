//! Portfolio reader
//!
//! Reads the wallet's native-asset balance on a network and prices it via
//! the market data feed. Recomputed fresh on every call; nothing is cached.
//! Contract-token enumeration (ERC-20 / SPL) is not implemented and the
//! portfolio says so explicitly instead of returning an empty holding set.

use alloy::primitives::U256;
use alloy::providers::{Provider, ProviderBuilder};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::market::MarketDataService;
use crate::types::{Network, Portfolio, TokenBalance, TokenScan};
use crate::wallet::{EvmWallet, SolanaWallet};

pub struct PortfolioService {
    config: Arc<Config>,
    market: Arc<MarketDataService>,
}

impl PortfolioService {
    pub fn new(config: Arc<Config>, market: Arc<MarketDataService>) -> Self {
        Self { config, market }
    }

    /// Read the wallet's holdings on the given network.
    pub async fn get_portfolio(&self, network: Network) -> Result<Portfolio> {
        let result = match network {
            Network::Ethereum => self.ethereum_portfolio().await,
            Network::Solana => self.solana_portfolio().await,
        };

        if let Err(e) = &result {
            tracing::error!(network = %network, error = %e, "Failed to read portfolio");
        }
        result
    }

    async fn ethereum_portfolio(&self) -> Result<Portfolio> {
        let wallet = EvmWallet::from_key(self.config.require_trading_key()?)?;

        let url: url::Url = self
            .config
            .rpc_url(Network::Ethereum)
            .parse()
            .map_err(|e| Error::Config(format!("invalid Ethereum RPC URL: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url);

        let balance_wei = provider
            .get_balance(wallet.address())
            .await
            .map_err(|e| Error::Upstream(format!("Ethereum balance query failed: {e}")))?;
        let balance = format_units(balance_wei, 18);

        let quote = self
            .market
            .get_market_data(Network::Ethereum.price_index_id())
            .await?;

        native_portfolio(Network::Ethereum, &balance, &quote.price)
    }

    async fn solana_portfolio(&self) -> Result<Portfolio> {
        let wallet = SolanaWallet::from_key(self.config.require_trading_key()?)?;

        let client = RpcClient::new(self.config.rpc_url(Network::Solana).to_string());
        let lamports = client
            .get_balance(&wallet.pubkey())
            .await
            .map_err(|e| Error::Upstream(format!("Solana balance query failed: {e}")))?;
        let balance = lamports_display(lamports);

        let quote = self
            .market
            .get_market_data(Network::Solana.price_index_id())
            .await?;

        native_portfolio(Network::Solana, &balance, &quote.price)
    }
}

/// Assemble a native-asset-only portfolio from a balance and a unit price,
/// both decimal strings. Parsed to f64 only for the value multiplication.
fn native_portfolio(network: Network, balance: &str, price: &str) -> Result<Portfolio> {
    let balance_units: f64 = balance
        .parse()
        .map_err(|_| Error::Upstream(format!("unparseable balance: {balance}")))?;
    let unit_price: f64 = price
        .parse()
        .map_err(|_| Error::Upstream(format!("unparseable price: {price}")))?;

    let value = balance_units * unit_price;

    let mut tokens = HashMap::new();
    tokens.insert(
        network.native_symbol().to_string(),
        TokenBalance {
            balance: balance.to_string(),
            value: value.to_string(),
        },
    );

    Ok(Portfolio {
        network,
        tokens,
        // Only the native asset is populated, so its value is the total.
        total_value: value.to_string(),
        contract_tokens: TokenScan::NotSupported,
    })
}

/// Format lamports as a decimal SOL string.
fn lamports_display(lamports: u64) -> String {
    (lamports as f64 / LAMPORTS_PER_SOL as f64).to_string()
}

/// Format a U256 value with decimals, trimming trailing zeros.
fn format_units(value: U256, decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}
