//! Plugin facade
//!
//! Declares the plugin's named actions and dispatches host invocations to
//! the services. A host either walks `actions()` and registers each one
//! under its name, or calls `invoke(name, args)` directly. All services are
//! owned by the plugin instance and shared via `Arc`; there is no ambient
//! global state.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::market::MarketDataService;
use crate::portfolio::PortfolioService;
use crate::risk::RiskManager;
use crate::trading::TradingService;
use crate::types::{Network, TradeRequest, TradeSide, TradingStrategy};

pub const ACTION_EXECUTE_TRADE: &str = "executeTrade";
pub const ACTION_GET_MARKET_DATA: &str = "getMarketData";
pub const ACTION_GET_PORTFOLIO: &str = "getPortfolio";
pub const ACTION_SET_TRADING_STRATEGY: &str = "setTradingStrategy";
pub const ACTION_MONITOR_MARKET: &str = "monitorMarket";

/// A named action exposed to the hosting agent runtime.
#[async_trait]
pub trait PluginAction: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema for the action's arguments.
    fn input_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<Value>;
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str> {
    args.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Validation(format!("missing '{field}' field")))
}

struct ExecuteTradeAction {
    trading: Arc<TradingService>,
}

#[async_trait]
impl PluginAction for ExecuteTradeAction {
    fn name(&self) -> &'static str {
        ACTION_EXECUTE_TRADE
    }

    fn description(&self) -> &'static str {
        "Execute a trade on the specified network"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "network": {
                    "type": "string",
                    "enum": ["ethereum", "solana"],
                    "description": "Network to trade on"
                },
                "side": {
                    "type": "string",
                    "enum": ["buy", "sell"],
                    "description": "Trade direction"
                },
                "token": {
                    "type": "string",
                    "description": "Destination address for the transfer"
                },
                "amount": {
                    "type": "string",
                    "description": "Amount in native-asset units (decimal string)"
                },
                "price": {
                    "type": "string",
                    "description": "Unit price in USD (decimal string)"
                }
            },
            "required": ["network", "side", "token", "amount", "price"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let network: Network = required_str(&args, "network")?.parse()?;
        let side: TradeSide = required_str(&args, "side")?.parse()?;

        let request = TradeRequest {
            network,
            side,
            token: required_str(&args, "token")?.to_string(),
            amount: required_str(&args, "amount")?.to_string(),
            price: required_str(&args, "price")?.to_string(),
        };

        let trade = self.trading.execute_trade(request).await?;
        Ok(serde_json::to_value(trade)?)
    }
}

struct GetMarketDataAction {
    market: Arc<MarketDataService>,
}

#[async_trait]
impl PluginAction for GetMarketDataAction {
    fn name(&self) -> &'static str {
        ACTION_GET_MARKET_DATA
    }

    fn description(&self) -> &'static str {
        "Fetch real-time market data for a token"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token": {
                    "type": "string",
                    "description": "Price index asset id, e.g. 'bitcoin' or 'ethereum'"
                }
            },
            "required": ["token"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let token = required_str(&args, "token")?;
        let data = self.market.get_market_data(token).await?;
        Ok(serde_json::to_value(data)?)
    }
}

struct GetPortfolioAction {
    portfolio: Arc<PortfolioService>,
}

#[async_trait]
impl PluginAction for GetPortfolioAction {
    fn name(&self) -> &'static str {
        ACTION_GET_PORTFOLIO
    }

    fn description(&self) -> &'static str {
        "Get the wallet's current portfolio on a network"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "network": {
                    "type": "string",
                    "enum": ["ethereum", "solana"],
                    "description": "Network to read"
                }
            },
            "required": ["network"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let network: Network = required_str(&args, "network")?.parse()?;
        let portfolio = self.portfolio.get_portfolio(network).await?;
        Ok(serde_json::to_value(portfolio)?)
    }
}

struct SetTradingStrategyAction {
    trading: Arc<TradingService>,
}

#[async_trait]
impl PluginAction for SetTradingStrategyAction {
    fn name(&self) -> &'static str {
        ACTION_SET_TRADING_STRATEGY
    }

    fn description(&self) -> &'static str {
        "Configure trading strategy parameters"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "name": { "type": "string" },
                "description": { "type": "string" },
                "parameters": {
                    "type": "object",
                    "description": "Free-form strategy parameters"
                },
                "active": { "type": "boolean" }
            },
            "required": ["id", "name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let strategy: TradingStrategy = serde_json::from_value(args)
            .map_err(|e| Error::Validation(format!("invalid strategy: {e}")))?;

        let id = strategy.id.clone();
        let application = self.trading.set_trading_strategy(strategy).await?;

        Ok(json!({
            "id": id,
            "application": application,
        }))
    }
}

struct MonitorMarketAction {
    market: Arc<MarketDataService>,
}

#[async_trait]
impl PluginAction for MonitorMarketAction {
    fn name(&self) -> &'static str {
        ACTION_MONITOR_MARKET
    }

    fn description(&self) -> &'static str {
        "Open live price feeds for a list of tokens"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tokens": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Exchange symbols to monitor, e.g. ['ETH', 'SOL']"
                }
            },
            "required": ["tokens"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let tokens: Vec<String> = args
            .get("tokens")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Validation("missing 'tokens' field".to_string()))?
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect();

        if tokens.is_empty() {
            return Err(Error::Validation("'tokens' must not be empty".to_string()));
        }

        self.market.monitor_market(&tokens).await?;

        Ok(json!({
            "status": "monitoring",
            "tokens": tokens,
        }))
    }
}

/// The plugin: owns the services, declares the actions, dispatches by name.
pub struct TradeAiPlugin {
    config: Arc<Config>,
    market: Arc<MarketDataService>,
    portfolio: Arc<PortfolioService>,
    risk: Arc<RiskManager>,
    trading: Arc<TradingService>,
    actions: Vec<Arc<dyn PluginAction>>,
}

impl TradeAiPlugin {
    pub const NAME: &'static str = "tradeai";

    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let market = Arc::new(MarketDataService::new(&config));
        let portfolio = Arc::new(PortfolioService::new(
            Arc::clone(&config),
            Arc::clone(&market),
        ));
        let risk = Arc::new(RiskManager::new(
            config.risk.clone(),
            Arc::clone(&portfolio),
            Arc::clone(&market),
        ));
        let trading = Arc::new(TradingService::new(Arc::clone(&config)));

        let actions: Vec<Arc<dyn PluginAction>> = vec![
            Arc::new(ExecuteTradeAction {
                trading: Arc::clone(&trading),
            }),
            Arc::new(GetMarketDataAction {
                market: Arc::clone(&market),
            }),
            Arc::new(GetPortfolioAction {
                portfolio: Arc::clone(&portfolio),
            }),
            Arc::new(SetTradingStrategyAction {
                trading: Arc::clone(&trading),
            }),
            Arc::new(MonitorMarketAction {
                market: Arc::clone(&market),
            }),
        ];

        Self {
            config,
            market,
            portfolio,
            risk,
            trading,
            actions,
        }
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn description(&self) -> &'static str {
        "On-chain trading actions for AI agents: trade execution, market data, \
         portfolio reads, strategy storage, and market monitoring"
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The declared actions, for hosts that register tools one by one.
    pub fn actions(&self) -> &[Arc<dyn PluginAction>] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&Arc<dyn PluginAction>> {
        self.actions.iter().find(|a| a.name() == name)
    }

    /// Dispatch a host invocation by action name.
    pub async fn invoke(&self, action: &str, args: Value) -> Result<Value> {
        match self.action(action) {
            Some(action) => action.execute(args).await,
            None => Err(Error::Validation(format!("unknown action: {action}"))),
        }
    }

    pub fn market(&self) -> &Arc<MarketDataService> {
        &self.market
    }

    pub fn portfolio(&self) -> &Arc<PortfolioService> {
        &self.portfolio
    }

    /// The risk evaluator. Not bound to an action: hosts call it directly
    /// to gate trades or evaluate stop-loss / take-profit levels.
    pub fn risk(&self) -> &Arc<RiskManager> {
        &self.risk
    }

    pub fn trading(&self) -> &Arc<TradingService> {
        &self.trading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfig, NetworksConfig, RiskConfig, TradingConfig};

    fn test_plugin() -> TradeAiPlugin {
        TradeAiPlugin::new(Config {
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
        })
    }

    #[test]
    fn declares_the_five_actions() {
        let plugin = test_plugin();
        let names: Vec<&str> = plugin.actions().iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                ACTION_EXECUTE_TRADE,
                ACTION_GET_MARKET_DATA,
                ACTION_GET_PORTFOLIO,
                ACTION_SET_TRADING_STRATEGY,
                ACTION_MONITOR_MARKET,
            ]
        );
    }

    #[test]
    fn every_action_has_an_object_schema() {
        let plugin = test_plugin();
        for action in plugin.actions() {
            let schema = action.input_schema();
            assert_eq!(schema["type"], "object", "action {}", action.name());
            assert!(schema["properties"].is_object(), "action {}", action.name());
        }
    }

    #[tokio::test]
    async fn unknown_action_is_a_validation_error() {
        let plugin = test_plugin();
        let err = plugin.invoke("selfDestruct", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn portfolio_rejects_unsupported_network_tag() {
        let plugin = test_plugin();
        let err = plugin
            .invoke(ACTION_GET_PORTFOLIO, json!({ "network": "polygon" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedNetwork(tag) if tag == "polygon"));
    }

    #[tokio::test]
    async fn trade_rejects_unsupported_network_tag() {
        let plugin = test_plugin();
        let err = plugin
            .invoke(
                ACTION_EXECUTE_TRADE,
                json!({
                    "network": "dogechain",
                    "side": "buy",
                    "token": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
                    "amount": "1",
                    "price": "2000"
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedNetwork(_)));
    }

    #[tokio::test]
    async fn trade_rejects_missing_fields() {
        let plugin = test_plugin();
        let err = plugin
            .invoke(ACTION_EXECUTE_TRADE, json!({ "network": "ethereum" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn strategy_action_reports_application_state() {
        let plugin = test_plugin();
        let result = plugin
            .invoke(
                ACTION_SET_TRADING_STRATEGY,
                json!({
                    "id": "s1",
                    "name": "momentum",
                    "parameters": { "lookback": 14 },
                    "active": true
                }),
            )
            .await
            .unwrap();

        assert_eq!(result["id"], "s1");
        assert_eq!(result["application"], "activationNotSupported");
        assert!(plugin.trading().strategy("s1").await.is_some());
    }

    #[tokio::test]
    async fn monitor_requires_a_token_list() {
        let plugin = test_plugin();
        let err = plugin
            .invoke(ACTION_MONITOR_MARKET, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = plugin
            .invoke(ACTION_MONITOR_MARKET, json!({ "tokens": [] }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
