//! Rebalance decision engine.
//!
//! One call per tick: value both holdings, fill any empty baseline slot,
//! measure PnL against the baseline, and decide whether the allocation has
//! drifted far enough from 50/50 to warrant a swap.
//!
//! The engine does no I/O. Slots it fills are flagged in [`Captured`] so the
//! caller can persist them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::baseline::{Baseline, PortfolioSnapshot, TokenSnapshot};
use crate::error::{Error, Result};
use crate::types::{pnl_status, Direction, Holding, HoldingMap, Mint, PriceMap, TokenPair};

/// Allocation target for each side, in percent.
pub const TARGET_PERCENT: f64 = 50.0;

/// Default drift (percentage points above 50%) tolerated before swapping.
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 1.7;

/// Live inputs for one tick.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    pub pair: &'a TokenPair,
    pub prices: &'a PriceMap,
    pub holdings: &'a HoldingMap,
    pub now: DateTime<Utc>,
}

/// Quantity change since the snapshot, and its value at the current price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TokenDelta {
    pub tokens: f64,
    pub value: f64,
}

/// PnL from trading alone: current balances valued at snapshot prices versus
/// snapshot balances at snapshot prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RebalancePnl {
    pub value_at_initial_prices: f64,
    pub baseline_value: f64,
    pub profit: f64,
    pub percent: f64,
}

/// Overall PnL against the initial total value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pnl {
    pub initial_value: f64,
    pub profit: f64,
    pub percent: f64,
}

impl Pnl {
    pub fn status(&self) -> &'static str {
        pnl_status(self.profit)
    }
}

/// A swap the engine wants executed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapOrder {
    pub direction: Direction,
    pub input_mint: Mint,
    pub output_mint: Mint,
    /// Whole tokens of the input mint.
    pub tokens: f64,
    /// Base units of the input mint (`tokens * 10^decimals`).
    pub amount: u64,
    /// USD value of the input side above the 50% target.
    pub excess_value: f64,
}

/// Outcome of the drift check. Exactly one per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Decision {
    /// Neither side is above `50 + threshold`.
    Balanced,
    /// Total value is zero; allocation is undefined.
    NoValue,
    /// One side drifted, but its excess rounds down to zero base units.
    BelowMinimum {
        direction: Direction,
        excess_value: f64,
    },
    Swap(SwapOrder),
}

impl Decision {
    pub fn swap(&self) -> Option<&SwapOrder> {
        match self {
            Decision::Swap(order) => Some(order),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Balanced => "balanced",
            Decision::NoValue => "no_value",
            Decision::BelowMinimum { .. } => "below_minimum",
            Decision::Swap(_) => "swap",
        }
    }
}

/// Baseline slots filled during this evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Captured {
    pub snapshot: bool,
    pub initial_value: bool,
}

/// Everything computed for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub value_a: f64,
    pub value_b: f64,
    pub total: f64,
    pub delta_a: TokenDelta,
    pub delta_b: TokenDelta,
    pub rebalance_value_impact: f64,
    pub rebalance_pnl: Option<RebalancePnl>,
    pub pnl: Pnl,
    pub allocation_a: f64,
    pub allocation_b: f64,
    pub deviation: f64,
    pub threshold: f64,
    pub decision: Decision,
    pub captured: Captured,
}

/// Evaluate one tick.
///
/// Fails only when a price is missing, in which case `baseline` is left
/// untouched. Otherwise any empty baseline slot is filled from this tick.
pub fn evaluate(view: &MarketView<'_>, baseline: &mut Baseline, threshold: f64) -> Result<Evaluation> {
    let pair = view.pair;
    let price_a = usable_price(view.prices, &pair.a)?;
    let price_b = usable_price(view.prices, &pair.b)?;

    let hold_a = holding(view.holdings, &pair.a);
    let hold_b = holding(view.holdings, &pair.b);

    let value_a = hold_a.balance * price_a;
    let value_b = hold_b.balance * price_b;
    let total = value_a + value_b;

    let mut captured = Captured::default();

    if baseline.snapshot.is_none() {
        baseline.snapshot = Some(capture_snapshot(
            pair,
            (hold_a, price_a),
            (hold_b, price_b),
            view.now,
        ));
        captured.snapshot = true;
    }

    let snapshot = baseline.snapshot.as_ref();
    let initial_a = snapshot.and_then(|s| s.token(&pair.a));
    let initial_b = snapshot.and_then(|s| s.token(&pair.b));

    let delta_a = token_delta(hold_a.balance, price_a, initial_a);
    let delta_b = token_delta(hold_b.balance, price_b, initial_b);
    let rebalance_value_impact = delta_a.value + delta_b.value;

    let rebalance_pnl = match (initial_a, initial_b) {
        (Some(a), Some(b)) => Some(rebalance_only_pnl(hold_a.balance, hold_b.balance, a, b)),
        _ => None,
    };

    let initial_value = match baseline.initial_value {
        Some(v) => v,
        None => {
            baseline.initial_value = Some(total);
            captured.initial_value = true;
            total
        }
    };
    let profit = total - initial_value;
    let pnl = Pnl {
        initial_value,
        profit,
        percent: percent_of(profit, initial_value),
    };

    let (allocation_a, allocation_b, deviation) = allocation(value_a, total);

    let decision = if total > 0.0 {
        decide(
            pair,
            threshold,
            (allocation_a, allocation_b),
            (value_a, value_b, total),
            (price_a, price_b),
            (hold_a.decimals, hold_b.decimals),
        )
    } else {
        Decision::NoValue
    };

    Ok(Evaluation {
        value_a,
        value_b,
        total,
        delta_a,
        delta_b,
        rebalance_value_impact,
        rebalance_pnl,
        pnl,
        allocation_a,
        allocation_b,
        deviation,
        threshold,
        decision,
        captured,
    })
}

/// Allocation of A and B in percent, and the deviation of the larger side
/// above 50. All zero when `total` is not positive.
pub fn allocation(value_a: f64, total: f64) -> (f64, f64, f64) {
    if total <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let a = value_a / total * 100.0;
    let b = 100.0 - a;
    (a, b, a.max(b) - TARGET_PERCENT)
}

/// Whole tokens and base units needed to shed `excess_value` at `price`.
pub fn swap_size(excess_value: f64, price: f64, decimals: u8) -> (f64, f64) {
    let tokens = (excess_value / price).floor();
    let amount = tokens * 10f64.powi(i32::from(decimals));
    (tokens, amount)
}

fn decide(
    pair: &TokenPair,
    threshold: f64,
    (allocation_a, allocation_b): (f64, f64),
    (value_a, value_b, total): (f64, f64, f64),
    (price_a, price_b): (f64, f64),
    (decimals_a, decimals_b): (u8, u8),
) -> Decision {
    let limit = TARGET_PERCENT + threshold;
    let target_value = total / 2.0;

    let (direction, excess_value, price, decimals, input, output) = if allocation_a > limit {
        (Direction::AToB, value_a - target_value, price_a, decimals_a, &pair.a, &pair.b)
    } else if allocation_b > limit {
        (Direction::BToA, value_b - target_value, price_b, decimals_b, &pair.b, &pair.a)
    } else {
        return Decision::Balanced;
    };

    let (tokens, amount) = swap_size(excess_value, price, decimals);
    if !amount.is_finite() || amount < 1.0 {
        return Decision::BelowMinimum {
            direction,
            excess_value,
        };
    }

    Decision::Swap(SwapOrder {
        direction,
        input_mint: input.clone(),
        output_mint: output.clone(),
        tokens,
        amount: amount as u64,
        excess_value,
    })
}

fn usable_price(prices: &PriceMap, mint: &Mint) -> Result<f64> {
    match prices.get(mint) {
        Some(&p) if p.is_finite() && p > 0.0 => Ok(p),
        _ => Err(Error::PriceUnavailable(mint.clone())),
    }
}

fn holding(holdings: &HoldingMap, mint: &Mint) -> Holding {
    holdings.get(mint).copied().unwrap_or(Holding::ZERO)
}

fn capture_snapshot(
    pair: &TokenPair,
    (hold_a, price_a): (Holding, f64),
    (hold_b, price_b): (Holding, f64),
    now: DateTime<Utc>,
) -> PortfolioSnapshot {
    let entry = |h: Holding, price: f64| TokenSnapshot {
        balance: h.balance,
        price,
        decimals: h.decimals,
    };
    PortfolioSnapshot {
        timestamp: now,
        tokens: [
            (pair.a.clone(), entry(hold_a, price_a)),
            (pair.b.clone(), entry(hold_b, price_b)),
        ]
        .into_iter()
        .collect(),
    }
}

fn token_delta(balance: f64, price: f64, initial: Option<&TokenSnapshot>) -> TokenDelta {
    let tokens = initial.map_or(0.0, |s| balance - s.balance);
    TokenDelta {
        tokens,
        value: tokens * price,
    }
}

fn rebalance_only_pnl(
    balance_a: f64,
    balance_b: f64,
    initial_a: &TokenSnapshot,
    initial_b: &TokenSnapshot,
) -> RebalancePnl {
    let value_at_initial_prices = balance_a * initial_a.price + balance_b * initial_b.price;
    let baseline_value = initial_a.value() + initial_b.value();
    let profit = value_at_initial_prices - baseline_value;
    RebalancePnl {
        value_at_initial_prices,
        baseline_value,
        profit,
        percent: percent_of(profit, baseline_value),
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0.
fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "${:.2} (Token A)", self.value_a)?;
        writeln!(f, "${:.2} (Token B)", self.value_b)?;
        writeln!(f, "Total portfolio value: ${:.2}", self.total)?;
        writeln!(
            f,
            "Token deltas: A {}, B {}",
            self.delta_a.tokens, self.delta_b.tokens
        )?;
        writeln!(
            f,
            "Rebalance value impact: ${:.2} (A: ${:.2}, B: ${:.2})",
            self.rebalance_value_impact, self.delta_a.value, self.delta_b.value
        )?;
        if let Some(r) = &self.rebalance_pnl {
            writeln!(
                f,
                "Rebalance-only PnL at initial prices: ${:.2} ({:.2}%), portfolio value at initial prices ${:.2}",
                r.profit, r.percent, r.value_at_initial_prices
            )?;
        }
        writeln!(
            f,
            "{}: ${:.2} ({:.2}%)",
            self.pnl.status(),
            self.pnl.profit,
            self.pnl.percent
        )?;
        writeln!(
            f,
            "Allocations: Token A {:.2}%, Token B {:.2}%",
            self.allocation_a, self.allocation_b
        )?;
        writeln!(
            f,
            "Current threshold deviation: {:.2}% (limit: {}%)",
            self.deviation, self.threshold
        )?;
        match &self.decision {
            Decision::Balanced => writeln!(f, "Portfolio is balanced. No swap needed."),
            Decision::NoValue => writeln!(f, "Portfolio has no value. No swap possible."),
            Decision::BelowMinimum {
                direction,
                excess_value,
            } => writeln!(
                f,
                "Skip swap {direction}: excess ${excess_value:.2} is less than one whole token"
            ),
            Decision::Swap(order) => writeln!(
                f,
                "Swapping {} tokens ({} base units) from {}",
                order.tokens, order.amount, order.direction
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair::new(Mint::new("A"), Mint::new("B"))
    }

    fn market(price_a: f64, price_b: f64, bal_a: f64, bal_b: f64) -> (PriceMap, HoldingMap) {
        let p = pair();
        let mut prices = PriceMap::default();
        prices.insert(p.a.clone(), price_a);
        prices.insert(p.b.clone(), price_b);
        let mut holdings = HoldingMap::default();
        holdings.insert(p.a.clone(), Holding::new(bal_a, 6));
        holdings.insert(p.b.clone(), Holding::new(bal_b, 6));
        (prices, holdings)
    }

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn run(prices: &PriceMap, holdings: &HoldingMap, baseline: &mut Baseline, threshold: f64) -> Result<Evaluation> {
        let p = pair();
        let view = MarketView {
            pair: &p,
            prices,
            holdings,
            now: now(),
        };
        evaluate(&view, baseline, threshold)
    }

    #[test]
    fn b_heavy_portfolio_swaps_b_to_a() {
        let (prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();

        assert_eq!(eval.value_a, 100.0);
        assert_eq!(eval.value_b, 150.0);
        assert_eq!(eval.total, 250.0);
        assert!((eval.allocation_a - 40.0).abs() < 1e-9);
        assert!((eval.allocation_b - 60.0).abs() < 1e-9);
        assert!((eval.deviation - 10.0).abs() < 1e-9);

        let order = eval.decision.swap().unwrap();
        assert_eq!(order.direction, Direction::BToA);
        assert_eq!(order.input_mint, Mint::new("B"));
        assert_eq!(order.output_mint, Mint::new("A"));
        assert_eq!(order.excess_value, 25.0);
        assert_eq!(order.tokens, 8.0);
        assert_eq!(order.amount, 8_000_000);
    }

    #[test]
    fn a_heavy_portfolio_swaps_a_to_b() {
        let (prices, holdings) = market(2.0, 1.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        let order = eval.decision.swap().unwrap();
        assert_eq!(order.direction, Direction::AToB);
        // value A = 200, target 125, excess 75 -> 37 tokens
        assert_eq!(order.tokens, 37.0);
        assert_eq!(order.amount, 37_000_000);
    }

    #[test]
    fn even_split_is_balanced() {
        let (prices, holdings) = market(2.0, 4.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        assert_eq!(eval.deviation, 0.0);
        assert_eq!(eval.decision, Decision::Balanced);
        assert!(eval.to_string().contains("Portfolio is balanced"));
    }

    #[test]
    fn deviation_at_threshold_does_not_swap() {
        // A = 60, B = 40 -> deviation exactly 10
        let (prices, holdings) = market(1.0, 1.0, 60.0, 40.0);
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 10.0).unwrap();
        assert_eq!(eval.decision, Decision::Balanced);
    }

    #[test]
    fn excess_below_one_token_is_skipped() {
        // A = 52 * $1, B = 48 * $1, excess 2 USD but price of A is $10
        let (prices, holdings) = market(10.0, 1.0, 5.2, 48.0);
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        assert!(matches!(
            eval.decision,
            Decision::BelowMinimum {
                direction: Direction::AToB,
                ..
            }
        ));
        assert!(eval.decision.swap().is_none());
    }

    #[test]
    fn missing_price_leaves_baseline_untouched() {
        let (mut prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        prices.remove(&Mint::new("B"));
        let mut baseline = Baseline::default();
        let err = run(&prices, &holdings, &mut baseline, 1.7).unwrap_err();
        assert!(matches!(err, Error::PriceUnavailable(m) if m.as_str() == "B"));
        assert_eq!(baseline, Baseline::default());
    }

    #[test]
    fn zero_price_counts_as_missing() {
        let (prices, holdings) = market(0.0, 3.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        assert!(run(&prices, &holdings, &mut baseline, 1.7).is_err());
        assert!(baseline.snapshot.is_none());
    }

    #[test]
    fn first_tick_captures_both_slots() {
        let (prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();

        assert_eq!(
            eval.captured,
            Captured {
                snapshot: true,
                initial_value: true
            }
        );
        assert_eq!(baseline.initial_value, Some(250.0));
        let snap = baseline.snapshot.as_ref().unwrap();
        assert_eq!(snap.timestamp, now());
        assert_eq!(snap.token(&Mint::new("B")).unwrap().price, 3.0);
        assert_eq!(eval.pnl.profit, 0.0);
        assert_eq!(eval.rebalance_pnl.unwrap().profit, 0.0);
    }

    #[test]
    fn later_ticks_do_not_overwrite_baseline() {
        let (prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        let frozen = baseline.clone();

        let (prices, holdings) = market(2.0, 1.0, 10.0, 500.0);
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        assert_eq!(eval.captured, Captured::default());
        assert_eq!(baseline, frozen);
    }

    #[test]
    fn pnl_against_loaded_baseline() {
        let (prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        run(&prices, &holdings, &mut baseline, 1.7).unwrap();

        // After swapping 8 B for 24 A at unchanged prices, then B rallies to $4.
        let (prices, holdings) = market(1.0, 4.0, 124.0, 42.0);
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();

        assert_eq!(eval.delta_a.tokens, 24.0);
        assert_eq!(eval.delta_b.tokens, -8.0);
        assert_eq!(eval.delta_b.value, -32.0);
        assert_eq!(eval.rebalance_value_impact, -8.0);

        let r = eval.rebalance_pnl.unwrap();
        // 124 * 1 + 42 * 3 = 250 -> trade was value-neutral at initial prices
        assert_eq!(r.value_at_initial_prices, 250.0);
        assert_eq!(r.profit, 0.0);

        // total now 124 + 168 = 292
        assert_eq!(eval.pnl.profit, 42.0);
        assert!((eval.pnl.percent - 16.8).abs() < 1e-9);
        assert_eq!(eval.pnl.status(), "Profit");
    }

    #[test]
    fn value_slot_captured_after_snapshot_loaded() {
        let (prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        let mut seeded = Baseline::default();
        run(&prices, &holdings, &mut seeded, 1.7).unwrap();
        let mut baseline = Baseline {
            initial_value: None,
            snapshot: seeded.snapshot.clone(),
        };

        let (prices, holdings) = market(1.0, 2.0, 100.0, 50.0);
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        assert_eq!(
            eval.captured,
            Captured {
                snapshot: false,
                initial_value: true
            }
        );
        assert_eq!(baseline.initial_value, Some(200.0));
        assert_eq!(baseline.snapshot, seeded.snapshot);
    }

    #[test]
    fn zero_baseline_value_gives_zero_percent() {
        let (prices, holdings) = market(1.0, 3.0, 0.0, 0.0);
        let mut baseline = Baseline::default();
        run(&prices, &holdings, &mut baseline, 1.7).unwrap();

        let (prices, holdings) = market(1.0, 3.0, 10.0, 0.0);
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        let r = eval.rebalance_pnl.unwrap();
        assert_eq!(r.baseline_value, 0.0);
        assert_eq!(r.profit, 10.0);
        assert_eq!(r.percent, 0.0);
        assert_eq!(eval.pnl.percent, 0.0);
    }

    #[test]
    fn empty_wallet_has_no_value() {
        let (prices, holdings) = market(1.0, 3.0, 0.0, 0.0);
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        assert_eq!(eval.total, 0.0);
        assert_eq!(eval.decision, Decision::NoValue);
        assert_eq!(eval.deviation, 0.0);
    }

    #[test]
    fn missing_holding_is_zero() {
        let (prices, mut holdings) = market(1.0, 3.0, 100.0, 50.0);
        holdings.remove(&Mint::new("A"));
        let mut baseline = Baseline::default();
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        assert_eq!(eval.value_a, 0.0);
        assert_eq!(eval.allocation_b, 100.0);
        // all of B above 50% is excess: 75 USD / $3 = 25 tokens
        assert_eq!(eval.decision.swap().unwrap().tokens, 25.0);
    }

    #[test]
    fn loss_label() {
        let (prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        let (prices, holdings) = market(0.5, 3.0, 100.0, 50.0);
        let eval = run(&prices, &holdings, &mut baseline, 1.7).unwrap();
        assert_eq!(eval.pnl.status(), "Loss");
        assert!(eval.to_string().contains("Loss: $-50.00 (-20.00%)"));
    }

    #[test]
    fn report_uses_two_decimals() {
        let (prices, holdings) = market(1.0, 3.0, 100.0, 50.0);
        let mut baseline = Baseline::default();
        let report = run(&prices, &holdings, &mut baseline, 1.7)
            .unwrap()
            .to_string();
        assert!(report.contains("$100.00 (Token A)"));
        assert!(report.contains("Total portfolio value: $250.00"));
        assert!(report.contains("Allocations: Token A 40.00%, Token B 60.00%"));
        assert!(report.contains("Current threshold deviation: 10.00% (limit: 1.7%)"));
        assert!(report.contains("Swapping 8 tokens (8000000 base units) from B → A"));
    }

    #[test]
    fn swap_size_scales_by_decimals() {
        assert_eq!(swap_size(25.0, 3.0, 6), (8.0, 8_000_000.0));
        assert_eq!(swap_size(25.0, 3.0, 0), (8.0, 8.0));
        assert_eq!(swap_size(0.5, 3.0, 9), (0.0, 0.0));
    }

    #[test]
    fn allocation_sums_to_hundred() {
        let (a, b, dev) = allocation(30.0, 120.0);
        assert_eq!(a + b, 100.0);
        assert_eq!(dev, 25.0);
        assert_eq!(allocation(0.0, 0.0), (0.0, 0.0, 0.0));
    }
}
