//! Error types for the rebalancer.

use std::path::PathBuf;

use pairbalance_broker::BrokerError;

/// All errors that can stop a rebalancer command.
///
/// Per-tick failures (prices, balances, swaps, audit writes) are logged and
/// absorbed by the session; only startup and CLI-level problems surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("baseline error: {0}")]
    Core(#[from] pairbalance::Error),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
