//! Local signing wallet and versioned-transaction wire helpers.

use std::fmt;

use base64::{prelude::BASE64_STANDARD, Engine};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;

use crate::error::BrokerError;

/// An ed25519 keypair that signs router-built transactions.
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    /// Build from the 64-byte secret (32-byte seed followed by the public key).
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, BrokerError> {
        #[allow(deprecated)]
        let keypair = Keypair::from_bytes(bytes)
            .map_err(|e| BrokerError::Wallet(format!("invalid keypair bytes: {e}")))?;
        Ok(Self { keypair })
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Base58 public key.
    pub fn address(&self) -> String {
        self.pubkey().to_string()
    }

    /// Sign `tx` in this wallet's required-signer slot.
    ///
    /// Other signature slots are left as the router provided them.
    pub fn sign_transaction(&self, tx: &mut VersionedTransaction) -> Result<Signature, BrokerError> {
        let pubkey = self.pubkey();
        let required = usize::from(tx.message.header().num_required_signatures);
        let slot = tx
            .message
            .static_account_keys()
            .iter()
            .take(required)
            .position(|key| *key == pubkey)
            .ok_or_else(|| {
                BrokerError::Signing(format!("{pubkey} is not a required signer of this transaction"))
            })?;

        if tx.signatures.len() < required {
            tx.signatures.resize(required, Signature::default());
        }

        let signature = self.keypair.sign_message(&tx.message.serialize());
        tx.signatures[slot] = signature;
        Ok(signature)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address()).finish()
    }
}

/// Decode a base64 wire transaction.
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, BrokerError> {
    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| BrokerError::Parse(format!("transaction is not base64: {e}")))?;
    bincode::deserialize(&bytes)
        .map_err(|e| BrokerError::Parse(format!("failed to deserialize transaction: {e}")))
}

/// Encode a transaction to base64 wire format.
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String, BrokerError> {
    let bytes = bincode::serialize(tx)
        .map_err(|e| BrokerError::Signing(format!("failed to serialize transaction: {e}")))?;
    Ok(BASE64_STANDARD.encode(bytes))
}
