//! External collaborators for pairbalance.
//!
//! Three traits abstract the outside world the rebalancer depends on:
//!
//! - [`PriceOracle`]: USD prices for a batch of mints
//! - [`BalanceOracle`]: wallet holdings per mint
//! - [`SwapExecutor`]: route and execute a swap
//!
//! Implementations:
//!
//! - **Jupiter price** (feature `jupiter`): `lite-api.jup.ag/price/v3`
//! - **Solana RPC** (feature `solana`): token balances, wallet signing, simulation
//! - **Jupiter Ultra** (feature `ultra`): order, sign, simulate, execute
//! - [`mock::MockBroker`]: in-memory, for tests

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "jupiter")]
pub mod jupiter;

#[cfg(feature = "solana")]
pub mod solana;

pub use error::BrokerError;
pub use types::*;

use std::sync::Arc;

use pairbalance::{HoldingMap, Mint, PriceMap, SwapOrder};

/// Batch USD price lookup.
pub trait PriceOracle {
    /// Prices keyed by mint, or `None` when the service stayed unavailable
    /// through every retry. Mints the service does not know are simply absent.
    fn prices(&self, mints: &[Mint]) -> Option<PriceMap>;
}

/// Wallet balance lookup.
pub trait BalanceOracle {
    /// Holdings for every requested mint. A mint that cannot be fetched
    /// degrades to a zero holding instead of failing the batch.
    fn balances(&self, owner: &str, mints: &[Mint]) -> HoldingMap;
}

/// Swap routing and execution on behalf of one wallet.
pub trait SwapExecutor {
    fn execute(&self, order: &SwapOrder) -> Result<SwapReceipt, BrokerError>;
}

impl<T: PriceOracle + ?Sized> PriceOracle for Arc<T> {
    fn prices(&self, mints: &[Mint]) -> Option<PriceMap> {
        (**self).prices(mints)
    }
}

impl<T: BalanceOracle + ?Sized> BalanceOracle for Arc<T> {
    fn balances(&self, owner: &str, mints: &[Mint]) -> HoldingMap {
        (**self).balances(owner, mints)
    }
}

impl<T: SwapExecutor + ?Sized> SwapExecutor for Arc<T> {
    fn execute(&self, order: &SwapOrder) -> Result<SwapReceipt, BrokerError> {
        (**self).execute(order)
    }
}
