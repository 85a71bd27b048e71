//! Configuration: environment keys plus an optional TOML settings file.
//!
//! The four wallet/strategy keys come from the environment (a `.env` file is
//! loaded first when present). Tunables live in the settings file, and every
//! one of them has a default, so the file itself is optional.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use pairbalance::{BaselineStore, Mint, TokenPair, DEFAULT_THRESHOLD_PERCENT};
use pairbalance_broker::RetryPolicy;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

pub const ENV_RPC_URL: &str = "SOLANA_RPC_URL";
pub const ENV_KEYPAIR_SECRET: &str = "SOLANA_KEYPAIR_SECRET";
pub const ENV_TOKEN_MINTS: &str = "TOKEN_MINTS";
pub const ENV_THRESHOLD: &str = "REBALANCE_THRESHOLD_PERCENT";

/// Tunables read from the TOML settings file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub strategy: StrategySettings,
    pub price: PriceSettings,
    pub swap: SwapSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StrategySettings {
    #[serde(default = "default_threshold")]
    pub threshold_percent: f64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_PERCENT
}
fn default_poll_interval() -> u64 {
    10
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            threshold_percent: default_threshold(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceSettings {
    #[serde(default = "default_price_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_price_timeout")]
    pub timeout_ms: u64,
}

fn default_price_endpoint() -> String {
    "https://lite-api.jup.ag/price/v3".into()
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    3000
}
fn default_price_timeout() -> u64 {
    5000
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            endpoint: default_price_endpoint(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            timeout_ms: default_price_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwapSettings {
    #[serde(default = "default_swap_endpoint")]
    pub endpoint: String,
}

fn default_swap_endpoint() -> String {
    "https://lite-api.jup.ag/ultra/v1".into()
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            endpoint: default_swap_endpoint(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_dir")]
    pub dir: String,
    #[serde(default = "default_value_file")]
    pub value_file: String,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_dir() -> String {
    ".".into()
}
fn default_value_file() -> String {
    pairbalance::baseline::VALUE_FILE.into()
}
fn default_snapshot_file() -> String {
    pairbalance::baseline::SNAPSHOT_FILE.into()
}
fn default_audit_file() -> String {
    "logs/audit.jsonl".into()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            value_file: default_value_file(),
            snapshot_file: default_snapshot_file(),
            audit_file: default_audit_file(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. A missing file means all defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: Settings = toml::from_str(&contents)?;
        Ok(settings)
    }
}

/// Validated runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub rpc_url: String,
    /// 64-byte ed25519 keypair (seed followed by public key).
    pub keypair_secret: Zeroizing<Vec<u8>>,
    pub pair: TokenPair,
    pub threshold_percent: f64,
    pub settings: Settings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("keypair_secret", &"<redacted>")
            .field("pair", &self.pair)
            .field("threshold_percent", &self.threshold_percent)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Config {
    /// Load the env file (if any), the settings file, then the process environment.
    ///
    /// An explicit `env_file` must exist; the implicit `.env` is optional.
    pub fn load(settings_path: &Path, env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|source| Error::EnvFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            None => {
                if let Ok(path) = dotenvy::dotenv() {
                    info!("Loaded environment from {}", path.display());
                }
            }
        }

        let settings = Settings::load(settings_path)?;
        Self::from_sources(|key| std::env::var(key).ok(), settings)
    }

    /// Build from an environment lookup and parsed settings, then validate.
    pub fn from_sources<F>(lookup: F, settings: Settings) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup(ENV_RPC_URL).unwrap_or_default().trim().to_string();
        if rpc_url.is_empty() {
            return Err(Error::Config(format!("{ENV_RPC_URL} must be set")));
        }

        let secret = Zeroizing::new(lookup(ENV_KEYPAIR_SECRET).unwrap_or_default());
        if secret.trim().is_empty() {
            return Err(Error::Config(format!("{ENV_KEYPAIR_SECRET} must be set")));
        }
        let keypair_secret = parse_secret(&secret)?;

        let pair = parse_mints(&lookup(ENV_TOKEN_MINTS).unwrap_or_default())?;

        let threshold_percent = match lookup(ENV_THRESHOLD).filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                Error::Config(format!("{ENV_THRESHOLD} must be a number, got {raw:?}"))
            })?,
            None => settings.strategy.threshold_percent,
        };

        let config = Config {
            rpc_url,
            keypair_secret,
            pair,
            threshold_percent,
            settings,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.threshold_percent.is_finite() || self.threshold_percent < 0.0 {
            return Err(Error::Config(format!(
                "{ENV_THRESHOLD} must be a non-negative number"
            )));
        }
        if self.settings.strategy.poll_interval_secs == 0 {
            return Err(Error::Config("strategy.poll_interval_secs must be > 0".into()));
        }
        if self.settings.price.timeout_ms == 0 {
            return Err(Error::Config("price.timeout_ms must be > 0".into()));
        }
        if self.settings.price.endpoint.trim().is_empty() {
            return Err(Error::Config("price.endpoint must not be empty".into()));
        }
        if self.settings.swap.endpoint.trim().is_empty() {
            return Err(Error::Config("swap.endpoint must not be empty".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.settings.strategy.poll_interval_secs)
    }

    pub fn price_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.price.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.settings.price.retries,
            Duration::from_millis(self.settings.price.retry_delay_ms),
        )
    }

    pub fn baseline_store(&self) -> BaselineStore {
        let dir = Path::new(&self.settings.storage.dir);
        BaselineStore::new(
            dir.join(&self.settings.storage.value_file),
            dir.join(&self.settings.storage.snapshot_file),
        )
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.settings.storage.dir).join(&self.settings.storage.audit_file)
    }
}

/// Decode a JSON array of byte values.
fn parse_secret(raw: &str) -> Result<Zeroizing<Vec<u8>>> {
    serde_json::from_str::<Vec<u8>>(raw.trim())
        .map(Zeroizing::new)
        .map_err(|_| {
            Error::Config(format!(
                "{ENV_KEYPAIR_SECRET} must be a JSON array of byte values (0-255)"
            ))
        })
}

/// Split a comma-separated mint list into exactly two distinct mints.
fn parse_mints(raw: &str) -> Result<TokenPair> {
    let mints: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    match mints.as_slice() {
        [] => Err(Error::Config(format!("{ENV_TOKEN_MINTS} must list two mints"))),
        [a, b] if a == b => Err(Error::Config(format!(
            "{ENV_TOKEN_MINTS} must list two different mints"
        ))),
        [a, b] => Ok(TokenPair::new(Mint::new(*a), Mint::new(*b))),
        other => Err(Error::Config(format!(
            "{ENV_TOKEN_MINTS} must list exactly two mints, got {}",
            other.len()
        ))),
    }
}
