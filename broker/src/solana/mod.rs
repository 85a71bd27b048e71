//! Solana RPC access: token balances, local wallet signing, simulation.

pub mod balances;
pub mod rpc;
pub mod wallet;

pub use balances::SolanaBalanceClient;
pub use wallet::Wallet;
