//! Mock broker for testing: implements all three collaborator traits with
//! configurable behavior.
//!
//! Use this in integration tests to drive ticks without network calls.
//!
//! ```
//! use pairbalance::Mint;
//! use pairbalance_broker::mock::{MockBroker, SwapMode};
//!
//! let broker = MockBroker::builder()
//!     .with_price(Mint::new("A"), 1.0)
//!     .with_holding(Mint::new("A"), 100.0, 6)
//!     .swap_mode(SwapMode::Settle)
//!     .build();
//! assert_eq!(broker.price_calls(), 0);
//! ```

use std::sync::{Mutex, MutexGuard};

use pairbalance::{Holding, HoldingMap, Mint, PriceMap, SwapOrder};

use crate::error::BrokerError;
use crate::types::SwapReceipt;
use crate::{BalanceOracle, PriceOracle, SwapExecutor};

/// How the mock handles executed swaps.
#[derive(Clone, Debug, PartialEq)]
pub enum SwapMode {
    /// Record the swap, return a receipt, leave holdings alone.
    Accept,
    /// Record the swap and move value between the two holdings at current prices.
    Settle,
    /// Record the swap and fail with an execute error.
    Reject,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    prices: PriceMap,
    holdings: HoldingMap,
    failing_balances: Vec<Mint>,
    price_outage: bool,
    swap_mode: SwapMode,
}

impl MockBrokerBuilder {
    pub fn with_price(mut self, mint: Mint, price: f64) -> Self {
        self.prices.insert(mint, price);
        self
    }

    pub fn with_holding(mut self, mint: Mint, balance: f64, decimals: u8) -> Self {
        self.holdings.insert(mint, Holding::new(balance, decimals));
        self
    }

    /// Balance lookups for `mint` fail and degrade to zero.
    pub fn failing_balance(mut self, mint: Mint) -> Self {
        self.failing_balances.push(mint);
        self
    }

    /// The price service is unavailable until [`MockBroker::set_price_outage`] clears it.
    pub fn price_outage(mut self) -> Self {
        self.price_outage = true;
        self
    }

    pub fn swap_mode(mut self, mode: SwapMode) -> Self {
        self.swap_mode = mode;
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            state: Mutex::new(State {
                prices: self.prices,
                holdings: self.holdings,
                failing_balances: self.failing_balances,
                price_outage: self.price_outage,
                swap_mode: self.swap_mode,
                price_calls: 0,
                balance_queries: Vec::new(),
                swaps: Vec::new(),
            }),
        }
    }
}

struct State {
    prices: PriceMap,
    holdings: HoldingMap,
    failing_balances: Vec<Mint>,
    price_outage: bool,
    swap_mode: SwapMode,
    price_calls: usize,
    balance_queries: Vec<String>,
    swaps: Vec<SwapOrder>,
}

/// In-memory broker that records every call. Interior mutability lets tests
/// change prices and holdings between ticks through a shared reference.
pub struct MockBroker {
    state: Mutex<State>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            prices: PriceMap::default(),
            holdings: HoldingMap::default(),
            failing_balances: Vec::new(),
            price_outage: false,
            swap_mode: SwapMode::Accept,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_price(&self, mint: Mint, price: f64) {
        self.state().prices.insert(mint, price);
    }

    pub fn remove_price(&self, mint: &Mint) {
        self.state().prices.remove(mint);
    }

    pub fn set_holding(&self, mint: Mint, balance: f64, decimals: u8) {
        self.state().holdings.insert(mint, Holding::new(balance, decimals));
    }

    pub fn set_price_outage(&self, down: bool) {
        self.state().price_outage = down;
    }

    pub fn set_swap_mode(&self, mode: SwapMode) {
        self.state().swap_mode = mode;
    }

    pub fn holding(&self, mint: &Mint) -> Holding {
        self.state().holdings.get(mint).copied().unwrap_or(Holding::ZERO)
    }

    /// Every swap passed to `execute`, including rejected ones.
    pub fn swaps(&self) -> Vec<SwapOrder> {
        self.state().swaps.clone()
    }

    pub fn price_calls(&self) -> usize {
        self.state().price_calls
    }

    /// Owners passed to `balances`, one entry per call.
    pub fn balance_queries(&self) -> Vec<String> {
        self.state().balance_queries.clone()
    }
}

impl PriceOracle for MockBroker {
    fn prices(&self, mints: &[Mint]) -> Option<PriceMap> {
        let mut state = self.state();
        state.price_calls += 1;
        if state.price_outage {
            return None;
        }
        Some(
            mints
                .iter()
                .filter_map(|m| state.prices.get(m).map(|p| (m.clone(), *p)))
                .collect(),
        )
    }
}

impl BalanceOracle for MockBroker {
    fn balances(&self, owner: &str, mints: &[Mint]) -> HoldingMap {
        let mut state = self.state();
        state.balance_queries.push(owner.to_string());
        mints
            .iter()
            .map(|m| {
                let holding = if state.failing_balances.contains(m) {
                    Holding::ZERO
                } else {
                    state.holdings.get(m).copied().unwrap_or(Holding::ZERO)
                };
                (m.clone(), holding)
            })
            .collect()
    }
}

impl SwapExecutor for MockBroker {
    fn execute(&self, order: &SwapOrder) -> Result<SwapReceipt, BrokerError> {
        let mut state = self.state();
        state.swaps.push(order.clone());
        let n = state.swaps.len();

        if order.amount == 0 {
            return Err(BrokerError::ZeroAmount);
        }

        let mode = state.swap_mode.clone();
        match mode {
            SwapMode::Reject => {
                return Err(BrokerError::ExecuteFailed {
                    status: "Failed".into(),
                    code: -1,
                    error: "mock: swap rejected".into(),
                });
            }
            SwapMode::Settle => settle(&mut state, order),
            SwapMode::Accept => {}
        }

        Ok(SwapReceipt {
            signature: format!("mock-signature-{n}"),
            confirmed_by_router: true,
        })
    }
}

/// Move `order.tokens` of the input mint into the output mint at current prices.
fn settle(state: &mut State, order: &SwapOrder) {
    let price_in = state.prices.get(&order.input_mint).copied().unwrap_or(0.0);
    let price_out = state.prices.get(&order.output_mint).copied().unwrap_or(0.0);
    if price_out <= 0.0 {
        return;
    }
    let received = order.tokens * price_in / price_out;

    if let Some(h) = state.holdings.get_mut(&order.input_mint) {
        h.balance -= order.tokens;
    }
    state
        .holdings
        .entry(order.output_mint.clone())
        .or_insert(Holding::ZERO)
        .balance += received;
}
