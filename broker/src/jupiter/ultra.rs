//! Jupiter Ultra swap flow: order → sign → simulate → execute.

use log::{info, warn};
use pairbalance::SwapOrder;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use solana_client::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;

use super::USER_AGENT;
use super::types::{UltraExecuteRequest, UltraExecuteResponse, UltraOrder};
use crate::error::BrokerError;
use crate::solana::rpc::simulate;
use crate::solana::wallet::{decode_transaction, encode_transaction, Wallet};
use crate::types::SwapReceipt;
use crate::SwapExecutor;

/// Swap executor backed by Jupiter Ultra, signing with a local wallet and
/// simulating through the configured Solana RPC before submitting.
pub struct UltraSwapClient {
    http: Client,
    endpoint: String,
    wallet: Wallet,
    rpc: RpcClient,
}

impl UltraSwapClient {
    pub fn new(endpoint: &str, wallet: Wallet, rpc_url: &str) -> Result<Self, BrokerError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BrokerError::Http(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            wallet,
            rpc: RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::processed()),
        })
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Request an order (GET /order).
    pub fn order(&self, order: &SwapOrder) -> Result<UltraOrder, BrokerError> {
        let url = format!("{}/order", self.endpoint);
        let amount = order.amount.to_string();
        let taker = self.wallet.address();

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("inputMint", order.input_mint.as_str()),
                ("outputMint", order.output_mint.as_str()),
                ("amount", amount.as_str()),
                ("taker", taker.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| BrokerError::Http(format!("order request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| BrokerError::Http(format!("failed to read order response: {e}")))?;

        if !status.is_success() {
            return Err(BrokerError::Status {
                service: "ultra order",
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| BrokerError::Parse(format!("order response: {e}")))
    }

    /// Submit a signed transaction (POST /execute).
    pub fn submit(&self, request_id: &str, signed_transaction: &str) -> Result<UltraExecuteResponse, BrokerError> {
        let url = format!("{}/execute", self.endpoint);

        let resp = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&UltraExecuteRequest {
                request_id,
                signed_transaction,
            })
            .send()
            .map_err(|e| BrokerError::Http(format!("execute request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| BrokerError::Http(format!("failed to read execute response: {e}")))?;

        if !status.is_success() {
            return Err(BrokerError::Status {
                service: "ultra execute",
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| BrokerError::Parse(format!("execute response: {e}")))
    }
}

impl SwapExecutor for UltraSwapClient {
    fn execute(&self, order: &SwapOrder) -> Result<SwapReceipt, BrokerError> {
        if order.amount == 0 {
            warn!("Skip swap: calculated amount is not positive.");
            return Err(BrokerError::ZeroAmount);
        }

        let quote = self.order(order)?;
        let mut tx = decode_transaction(quote.require_transaction()?)?;
        info!(
            "Ultra order {} via {}: {} {} → {} {}",
            quote.request_id,
            quote.router,
            quote.in_amount,
            order.input_mint,
            quote.out_amount,
            order.output_mint,
        );

        let local_signature = self.wallet.sign_transaction(&mut tx)?;
        simulate(&self.rpc, &tx)?;

        let signed = encode_transaction(&tx)?;
        let result = self.submit(&quote.request_id, &signed)?;

        let receipt = match result.into_result()? {
            Some(signature) => SwapReceipt {
                signature,
                confirmed_by_router: true,
            },
            None => SwapReceipt {
                signature: local_signature.to_string(),
                confirmed_by_router: false,
            },
        };
        Ok(receipt)
    }
}
