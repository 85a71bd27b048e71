//! Jupiter HTTP services: batch USD prices and Ultra swap routing.
//!
//! Blocking (sync) via `reqwest::blocking`, like the rest of the broker layer.

pub mod price;
pub mod types;

#[cfg(feature = "solana")]
pub mod ultra;

pub use price::JupiterPriceClient;

#[cfg(feature = "solana")]
pub use ultra::UltraSwapClient;

/// Jupiter price API v3.
pub const PRICE_ENDPOINT: &str = "https://lite-api.jup.ag/price/v3";

/// Jupiter Ultra API v1 (order + execute).
pub const ULTRA_ENDPOINT: &str = "https://lite-api.jup.ag/ultra/v1";

/// User agent sent with every Jupiter request.
pub const USER_AGENT: &str = "PairBalance/1.0";
