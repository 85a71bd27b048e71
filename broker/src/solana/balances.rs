//! Wallet token balances via `getTokenAccountsByOwner`.

use std::str::FromStr;

use log::{error, info, warn};
use pairbalance::{Holding, HoldingMap, Mint};
use serde_json::Value;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

use crate::error::BrokerError;
use crate::BalanceOracle;

/// Balance lookups at `confirmed` commitment.
pub struct SolanaBalanceClient {
    rpc: RpcClient,
}

impl SolanaBalanceClient {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed()),
        }
    }

    /// Holding in the owner's first token account for `mint`, or `None`
    /// when the owner has no account for it.
    pub fn fetch(&self, owner: &Pubkey, mint: &Mint) -> Result<Option<Holding>, BrokerError> {
        let mint_key = Pubkey::from_str(mint.as_str())
            .map_err(|e| BrokerError::InvalidMint(format!("{mint}: {e}")))?;

        let accounts = self
            .rpc
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(mint_key))
            .map_err(|e| BrokerError::Rpc(format!("getTokenAccountsByOwner failed: {e}")))?;

        let Some(first) = accounts.first() else {
            return Ok(None);
        };

        let data = serde_json::to_value(&first.account.data)
            .map_err(|e| BrokerError::Parse(format!("token account data: {e}")))?;
        parse_token_amount(&data).map(Some)
    }
}

impl BalanceOracle for SolanaBalanceClient {
    fn balances(&self, owner: &str, mints: &[Mint]) -> HoldingMap {
        let owner_key = Pubkey::from_str(owner).map_err(|e| format!("invalid owner {owner}: {e}"));

        mints
            .iter()
            .map(|mint| {
                let fetched = match &owner_key {
                    Ok(key) => self.fetch(key, mint),
                    Err(e) => Err(BrokerError::Wallet(e.clone())),
                };
                let holding = match fetched {
                    Ok(Some(h)) => {
                        info!(
                            "Token balance for {mint}: {} (decimals: {})",
                            h.balance, h.decimals
                        );
                        h
                    }
                    Ok(None) => {
                        warn!("No token account found for {mint}");
                        Holding::ZERO
                    }
                    Err(e) => {
                        error!("Error fetching balance for {mint}: {e}");
                        Holding::ZERO
                    }
                };
                (mint.clone(), holding)
            })
            .collect()
    }
}

/// Extract `parsed.info.tokenAmount` from jsonParsed token account data.
///
/// Uses `uiAmount` when present, otherwise `amount / 10^decimals`.
pub fn parse_token_amount(data: &Value) -> Result<Holding, BrokerError> {
    let amount = data
        .pointer("/parsed/info/tokenAmount")
        .ok_or_else(|| BrokerError::Parse("token account missing parsed tokenAmount".into()))?;

    let decimals = amount
        .get("decimals")
        .and_then(Value::as_u64)
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| BrokerError::Parse("tokenAmount missing decimals".into()))?;

    let balance = match amount.get("uiAmount").and_then(Value::as_f64) {
        Some(ui) => ui,
        None => {
            let raw: u64 = amount
                .get("amount")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| BrokerError::Parse("tokenAmount missing amount".into()))?;
            raw as f64 / 10f64.powi(i32::from(decimals))
        }
    };

    Ok(Holding::new(balance, decimals))
}
