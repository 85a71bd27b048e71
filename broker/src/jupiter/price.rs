//! Jupiter price API client.

use std::time::Duration;

use log::debug;
use pairbalance::{Mint, PriceMap};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use super::USER_AGENT;
use super::types::normalize_prices;
use crate::error::BrokerError;
use crate::types::RetryPolicy;
use crate::PriceOracle;

/// Blocking client for the batch price endpoint, with bounded retry.
pub struct JupiterPriceClient {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl JupiterPriceClient {
    /// Create a client with a per-request `timeout`.
    pub fn new(endpoint: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BrokerError::Http(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            retry,
        })
    }

    /// One request, no retry (GET {endpoint}?ids=a,b).
    pub fn fetch_once(&self, mints: &[Mint]) -> Result<PriceMap, BrokerError> {
        let ids = mints.iter().map(Mint::as_str).collect::<Vec<_>>().join(",");

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("ids", ids.as_str())])
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| BrokerError::Http(format!("price request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| BrokerError::Http(format!("failed to read price response: {e}")))?;

        if !status.is_success() {
            return Err(BrokerError::Status {
                service: "price api",
                status: status.as_u16(),
                body,
            });
        }

        let prices = normalize_prices(&body)?;
        debug!("Fetched {} prices for {} mints", prices.len(), mints.len());
        Ok(prices)
    }
}

impl PriceOracle for JupiterPriceClient {
    fn prices(&self, mints: &[Mint]) -> Option<PriceMap> {
        self.retry.run("token prices", || self.fetch_once(mints))
    }
}
