//! Jupiter API response types and normalization.

use std::collections::BTreeMap;

use pairbalance::{Mint, PriceMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BrokerError;

/// Turn a price v3 response body into a price map.
///
/// The body is an object keyed by mint; entries without a numeric
/// `usdPrice` are skipped. An empty body, or one with no usable entry,
/// is an error so the caller can retry.
pub fn normalize_prices(body: &str) -> Result<PriceMap, BrokerError> {
    let raw: Option<BTreeMap<String, Value>> =
        serde_json::from_str(body).map_err(|e| BrokerError::Parse(format!("price response: {e}")))?;
    let raw = raw.unwrap_or_default();
    if raw.is_empty() {
        return Err(BrokerError::Parse("empty token price data".into()));
    }

    let prices: PriceMap = raw
        .iter()
        .filter_map(|(mint, entry)| {
            let price = entry.get("usdPrice").and_then(Value::as_f64)?;
            Some((Mint::new(mint.as_str()), price))
        })
        .collect();

    if prices.is_empty() {
        return Err(BrokerError::Parse("no valid token price entries".into()));
    }
    Ok(prices)
}

/// Ultra `GET /order` response (fields this client reads).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UltraOrder {
    #[serde(default)]
    pub input_mint: String,
    #[serde(default)]
    pub output_mint: String,
    #[serde(default)]
    pub in_amount: String,
    #[serde(default)]
    pub out_amount: String,
    #[serde(default)]
    pub slippage_bps: u32,
    #[serde(default)]
    pub router: String,
    /// Base64 unsigned transaction; absent when no route was found.
    pub transaction: Option<String>,
    #[serde(default)]
    pub gasless: bool,
    #[serde(default)]
    pub request_id: String,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

impl UltraOrder {
    /// The transaction to sign, or why there is none.
    pub fn require_transaction(&self) -> Result<&str, BrokerError> {
        match self.transaction.as_deref() {
            Some(tx) if !tx.is_empty() => Ok(tx),
            _ => Err(BrokerError::NoTransaction {
                router: self.router.clone(),
                reason: self
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "No transaction returned".into()),
            }),
        }
    }
}

/// Ultra `POST /execute` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UltraExecuteRequest<'a> {
    pub request_id: &'a str,
    pub signed_transaction: &'a str,
}

/// Ultra `POST /execute` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UltraExecuteResponse {
    pub status: String,
    pub signature: Option<String>,
    pub slot: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub code: i64,
    pub input_amount_result: Option<String>,
    pub output_amount_result: Option<String>,
}

impl UltraExecuteResponse {
    /// `Ok(signature)` on `status == "Success"` and `code == 0`.
    /// The router may omit the signature even on success.
    pub fn into_result(self) -> Result<Option<String>, BrokerError> {
        if self.status != "Success" || self.code != 0 {
            return Err(BrokerError::ExecuteFailed {
                status: self.status,
                code: self.code,
                error: self.error.unwrap_or_else(|| "unknown".into()),
            });
        }
        Ok(self.signature)
    }
}
