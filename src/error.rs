//! Error types for the trading plugin

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("invalid trade or strategy: {0}")]
    Validation(String),

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
