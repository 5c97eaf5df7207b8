//! Trade execution and strategy storage
//!
//! `execute_trade` validates the request and submits a single native-asset
//! transfer on the trade's network, with the `token` field interpreted as
//! the destination address. Submission does not wait for confirmation: the
//! returned trade is marked completed as soon as the node accepts it, and no
//! pending/failed transition is ever produced for a revert or timeout.
//!
//! Strategies live in an in-memory map keyed by id, last write wins, never
//! persisted. Applying an active strategy is not implemented; callers get an
//! explicit marker instead of a silent no-op.

use alloy::network::TransactionBuilder;
use alloy::primitives::utils::parse_ether;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use chrono::Utc;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{
    Network, StrategyApplication, Trade, TradeRequest, TradeStatus, TradingStrategy,
};
use crate::wallet::{EvmWallet, SolanaWallet};

pub struct TradingService {
    config: Arc<Config>,
    strategies: RwLock<HashMap<String, TradingStrategy>>,
}

impl TradingService {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            strategies: RwLock::new(HashMap::new()),
        }
    }

    /// Validate and submit a trade, returning the completed trade record.
    pub async fn execute_trade(&self, request: TradeRequest) -> Result<Trade> {
        match self.submit(&request).await {
            Ok(trade) => {
                tracing::info!(
                    id = %trade.id,
                    network = %trade.network,
                    side = %trade.side,
                    amount = %trade.amount,
                    tx_hash = trade.tx_hash.as_deref().unwrap_or(""),
                    "Trade submitted"
                );
                Ok(trade)
            }
            Err(e) => {
                tracing::error!(network = %request.network, token = %request.token, error = %e, "Trade execution failed");
                Err(e)
            }
        }
    }

    async fn submit(&self, request: &TradeRequest) -> Result<Trade> {
        let amount = validate_request(request, self.config.risk.max_position_size)?;

        let tx_hash = match request.network {
            Network::Ethereum => self.submit_ethereum(request).await?,
            Network::Solana => self.submit_solana(request, amount).await?,
        };

        Ok(Trade {
            id: Uuid::new_v4().to_string(),
            network: request.network,
            side: request.side,
            token: request.token.clone(),
            amount: request.amount.clone(),
            price: request.price.clone(),
            timestamp: Utc::now(),
            status: TradeStatus::Completed,
            tx_hash: Some(tx_hash),
        })
    }

    async fn submit_ethereum(&self, request: &TradeRequest) -> Result<String> {
        let wallet = EvmWallet::from_key(self.config.require_trading_key()?)?;

        let to = Address::from_str(&request.token).map_err(|e| {
            Error::Validation(format!("token is not a valid destination address: {e}"))
        })?;
        let value = parse_ether(&request.amount)
            .map_err(|e| Error::Validation(format!("unparseable amount: {e}")))?;

        let url: url::Url = self
            .config
            .rpc_url(Network::Ethereum)
            .parse()
            .map_err(|e| Error::Config(format!("invalid Ethereum RPC URL: {e}")))?;
        let provider = ProviderBuilder::new()
            .wallet(wallet.wallet().clone())
            .connect_http(url);

        let tx = TransactionRequest::default()
            .with_to(to)
            .with_value(value)
            .with_gas_limit(self.config.trading.gas_limit);

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| Error::Upstream(format!("Ethereum submission failed: {e}")))?;

        Ok(pending.tx_hash().to_string())
    }

    async fn submit_solana(&self, request: &TradeRequest, amount: f64) -> Result<String> {
        let wallet = SolanaWallet::from_key(self.config.require_trading_key()?)?;

        let to = Pubkey::from_str(&request.token).map_err(|e| {
            Error::Validation(format!("token is not a valid destination address: {e}"))
        })?;
        let lamports = (amount * LAMPORTS_PER_SOL as f64) as u64;

        let client = RpcClient::new(self.config.rpc_url(Network::Solana).to_string());
        let blockhash = client
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::Upstream(format!("Solana blockhash query failed: {e}")))?;

        let instruction = system_instruction::transfer(&wallet.pubkey(), &to, lamports);
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&wallet.pubkey()),
            &[wallet.keypair()],
            blockhash,
        );

        let signature = client
            .send_transaction(&transaction)
            .await
            .map_err(|e| Error::Upstream(format!("Solana submission failed: {e}")))?;

        Ok(signature.to_string())
    }

    /// Store a strategy, overwriting any previous one with the same id.
    pub async fn set_trading_strategy(
        &self,
        strategy: TradingStrategy,
    ) -> Result<StrategyApplication> {
        validate_strategy(&strategy)?;

        let id = strategy.id.clone();
        let active = strategy.active;
        {
            let mut strategies = self.strategies.write().await;
            strategies.insert(id.clone(), strategy);
        }

        if active {
            self.apply_strategy(&id).await
        } else {
            Ok(StrategyApplication::Stored)
        }
    }

    /// Look up a stored strategy by id.
    pub async fn strategy(&self, id: &str) -> Option<TradingStrategy> {
        self.strategies.read().await.get(id).cloned()
    }

    async fn apply_strategy(&self, id: &str) -> Result<StrategyApplication> {
        if let Some(strategy) = self.strategies.read().await.get(id) {
            tracing::info!(
                id = %strategy.id,
                name = %strategy.name,
                "Strategy marked active; automated application is not implemented"
            );
        }
        Ok(StrategyApplication::ActivationNotSupported)
    }
}

/// Check the request fields and the position-size cap; returns the parsed
/// amount.
fn validate_request(request: &TradeRequest, max_position_size: f64) -> Result<f64> {
    if request.token.trim().is_empty() {
        return Err(Error::Validation("missing token".to_string()));
    }
    if request.amount.trim().is_empty() {
        return Err(Error::Validation("missing amount".to_string()));
    }
    if request.price.trim().is_empty() {
        return Err(Error::Validation("missing price".to_string()));
    }

    let amount: f64 = request
        .amount
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("unparseable amount: {}", request.amount)))?;

    if amount > max_position_size {
        return Err(Error::Validation(format!(
            "trade amount {amount} exceeds maximum position size {max_position_size}"
        )));
    }

    Ok(amount)
}

fn validate_strategy(strategy: &TradingStrategy) -> Result<()> {
    if strategy.id.trim().is_empty() {
        return Err(Error::Validation("missing strategy id".to_string()));
    }
    if strategy.name.trim().is_empty() {
        return Err(Error::Validation("missing strategy name".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfig, NetworksConfig, RiskConfig, TradingConfig};
    use crate::types::TradeSide;

    fn test_service() -> TradingService {
        let config = Arc::new(Config {
            networks: NetworksConfig {
                ethereum: NetworkConfig {
                    rpc_url: "http://127.0.0.1:1".to_string(),
                    chain_id: Some(1),
                },
                solana: NetworkConfig {
                    rpc_url: "http://127.0.0.1:1".to_string(),
                    chain_id: None,
                },
            },
            trading: TradingConfig::default(),
            risk: RiskConfig::default(),
            trading_key: None,
        });
        TradingService::new(config)
    }

    fn request(amount: &str) -> TradeRequest {
        TradeRequest {
            network: Network::Ethereum,
            side: TradeSide::Buy,
            token: "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".to_string(),
            amount: amount.to_string(),
            price: "2000".to_string(),
        }
    }

    #[test]
    fn validation_rejects_empty_fields() {
        let mut req = request("1");
        req.token = String::new();
        assert!(matches!(
            validate_request(&req, 1000.0),
            Err(Error::Validation(_))
        ));

        let mut req = request("1");
        req.price = " ".to_string();
        assert!(matches!(
            validate_request(&req, 1000.0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn validation_rejects_unparseable_amount() {
        assert!(matches!(
            validate_request(&request("a lot"), 1000.0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn validation_enforces_position_size_cap() {
        assert!(matches!(
            validate_request(&request("1500"), 1000.0),
            Err(Error::Validation(msg)) if msg.contains("position size")
        ));
        assert_eq!(validate_request(&request("1000"), 1000.0).unwrap(), 1000.0);
    }

    #[tokio::test]
    async fn oversized_trade_never_reaches_submission() {
        let service = test_service();
        let err = service.execute_trade(request("5000")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("position size")));
    }

    #[tokio::test]
    async fn missing_key_is_a_wallet_error() {
        let service = test_service();
        let err = service.execute_trade(request("1")).await.unwrap_err();
        assert!(matches!(err, Error::Wallet(_)));
    }

    fn strategy(id: &str, active: bool) -> TradingStrategy {
        TradingStrategy {
            id: id.to_string(),
            name: "momentum".to_string(),
            description: String::new(),
            parameters: HashMap::new(),
            active,
        }
    }

    #[tokio::test]
    async fn strategy_requires_id_and_name() {
        let service = test_service();
        let err = service
            .set_trading_strategy(strategy("", false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let mut unnamed = strategy("s1", false);
        unnamed.name = String::new();
        let err = service.set_trading_strategy(unnamed).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn strategies_are_stored_and_overwritten_by_id() {
        let service = test_service();

        service
            .set_trading_strategy(strategy("s1", false))
            .await
            .unwrap();
        assert_eq!(service.strategy("s1").await.unwrap().name, "momentum");

        let mut replacement = strategy("s1", false);
        replacement.name = "mean-reversion".to_string();
        service.set_trading_strategy(replacement).await.unwrap();
        assert_eq!(service.strategy("s1").await.unwrap().name, "mean-reversion");
    }

    #[tokio::test]
    async fn active_strategy_reports_unimplemented_application() {
        let service = test_service();

        let outcome = service
            .set_trading_strategy(strategy("s1", true))
            .await
            .unwrap();
        assert_eq!(outcome, StrategyApplication::ActivationNotSupported);

        let outcome = service
            .set_trading_strategy(strategy("s2", false))
            .await
            .unwrap();
        assert_eq!(outcome, StrategyApplication::Stored);
    }
}
