//! Transaction simulation through RPC.

use log::debug;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::transaction::VersionedTransaction;

use crate::error::BrokerError;

/// Simulate `tx` at `processed` commitment with a fresh blockhash.
///
/// Signatures are not verified (the router may still need to co-sign).
/// A simulation error carries the program logs.
pub fn simulate(rpc: &RpcClient, tx: &VersionedTransaction) -> Result<(), BrokerError> {
    let config = RpcSimulateTransactionConfig {
        sig_verify: false,
        replace_recent_blockhash: true,
        commitment: Some(CommitmentConfig::processed()),
        ..RpcSimulateTransactionConfig::default()
    };

    let response = rpc
        .simulate_transaction_with_config(tx, config)
        .map_err(|e| BrokerError::Rpc(format!("simulateTransaction failed: {e}")))?;

    let result = response.value;
    if let Some(err) = result.err {
        return Err(BrokerError::Simulation {
            error: format!("{err:?}"),
            logs: result.logs.unwrap_or_default(),
        });
    }

    if let Some(units) = result.units_consumed {
        debug!("Simulation ok, {units} compute units");
    }
    Ok(())
}
