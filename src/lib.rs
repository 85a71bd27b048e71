//! # pairbalance
//!
//! Drift detection and rebalance decisions for a two-token portfolio held at
//! a 50/50 USD target.
//!
//! ## Quick Start
//!
//! ```
//! use chrono::Utc;
//! use pairbalance::{evaluate, Baseline, Holding, HoldingMap, MarketView, Mint, PriceMap, TokenPair};
//!
//! let pair = TokenPair::new(Mint::new("A"), Mint::new("B"));
//!
//! let mut prices = PriceMap::default();
//! prices.insert(pair.a.clone(), 1.0);
//! prices.insert(pair.b.clone(), 3.0);
//!
//! let mut holdings = HoldingMap::default();
//! holdings.insert(pair.a.clone(), Holding::new(100.0, 6));
//! holdings.insert(pair.b.clone(), Holding::new(50.0, 6));
//!
//! let mut baseline = Baseline::default();
//! let view = MarketView { pair: &pair, prices: &prices, holdings: &holdings, now: Utc::now() };
//! let eval = evaluate(&view, &mut baseline, 1.7).unwrap();
//!
//! // 60% of the value sits in B: sell 8 whole B (8_000_000 base units) for A.
//! let order = eval.decision.swap().unwrap();
//! assert_eq!(order.amount, 8_000_000);
//! ```
//!
//! ## Baseline
//!
//! The first tick with both prices available fixes the reference point for
//! all later PnL figures. See [`baseline`] for the write-once persistence.

pub mod baseline;
pub mod engine;
pub mod error;
pub mod types;

pub use baseline::{Baseline, BaselineStore, PortfolioSnapshot, TokenSnapshot};
pub use engine::{
    evaluate, Captured, Decision, Evaluation, MarketView, Pnl, RebalancePnl, SwapOrder, TokenDelta,
    DEFAULT_THRESHOLD_PERCENT,
};
pub use error::{Error, Result};
pub use types::{Direction, Holding, HoldingMap, Mint, PriceMap, TokenPair};
