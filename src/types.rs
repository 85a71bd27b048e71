//! Core types: Mint, Holding, PriceMap, HoldingMap, TokenPair

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Opaque token identifier (a base58 mint address on Solana).
///
/// The core never interprets the string; broker adapters parse it into
/// whatever address type their chain needs.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mint(String);

impl Mint {
    pub fn new(id: impl Into<String>) -> Self {
        Mint(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mint {
    fn from(s: &str) -> Self {
        Mint::new(s)
    }
}

/// Quantity of a token held by the wallet, in human units, plus its decimals.
///
/// `Holding { balance: 1.5, decimals: 6 }` is 1_500_000 base units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub balance: f64,
    pub decimals: u8,
}

impl Holding {
    pub const ZERO: Holding = Holding {
        balance: 0.0,
        decimals: 0,
    };

    pub fn new(balance: f64, decimals: u8) -> Self {
        Self { balance, decimals }
    }
}

/// Current USD price per token, fetched fresh each tick.
pub type PriceMap = FxHashMap<Mint, f64>;

/// Current holdings per token, fetched fresh each tick.
pub type HoldingMap = FxHashMap<Mint, Holding>;

/// The two configured tokens, in fixed (A, B) order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub a: Mint,
    pub b: Mint,
}

impl TokenPair {
    pub fn new(a: Mint, b: Mint) -> Self {
        Self { a, b }
    }

    /// Both mints in (A, B) order, for batch lookups.
    pub fn mints(&self) -> [Mint; 2] {
        [self.a.clone(), self.b.clone()]
    }
}

/// Which way a rebalancing swap moves value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Sell token A for token B.
    AToB,
    /// Sell token B for token A.
    BToA,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToB => write!(f, "A → B"),
            Direction::BToA => write!(f, "B → A"),
        }
    }
}

/// Status label for an overall PnL figure.
pub fn pnl_status(profit: f64) -> &'static str {
    if profit >= 0.0 { "Profit" } else { "Loss" }
}
