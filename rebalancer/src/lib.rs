//! pairbalance-rebalancer: keeps a Solana wallet's two-token portfolio at 50/50.
//!
//! Polls Jupiter for prices and Solana RPC for balances, evaluates drift with
//! the `pairbalance` engine, persists the first-observed baseline, and swaps
//! the excess through Jupiter Ultra when one side drifts past the threshold.

pub mod audit;
pub mod broker;
pub mod config;
pub mod error;
pub mod execution;
pub mod scheduler;
