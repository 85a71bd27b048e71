//! Per-tick orchestration: prices → balances → evaluate → persist → swap.
//!
//! A [`Session`] owns the in-memory baseline for the life of the process.
//! Nothing that goes wrong inside a tick is returned as an error: failures
//! are logged (and audited) and the outcome says what happened.

use chrono::Utc;
use log::{error, info, log, warn, Level};
use pairbalance::{
    evaluate, Baseline, BaselineStore, Decision, Error as CoreError, Evaluation, MarketView, Mint,
    SwapOrder, TokenPair,
};
use pairbalance_broker::SwapReceipt;

use crate::audit::{self, AuditLog};
use crate::broker::{self, Gateways};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::scheduler;

/// Options for the `run` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Stop after this many ticks; `None` runs forever.
    pub ticks: Option<u64>,
}

/// Why a tick stopped before evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The price service stayed unavailable through every retry.
    PricesUnavailable,
    /// The service answered but had no usable price for this mint.
    PriceMissing(Mint),
}

impl SkipReason {
    fn label(&self) -> &'static str {
        match self {
            SkipReason::PricesUnavailable => "prices_unavailable",
            SkipReason::PriceMissing(_) => "price_missing",
        }
    }
}

/// What happened to the swap the engine asked for, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    NotNeeded,
    DryRun(SwapOrder),
    Executed(SwapReceipt),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Evaluated {
        evaluation: Box<Evaluation>,
        swap: SwapOutcome,
    },
}

/// Long-lived state for one rebalancer process.
pub struct Session {
    pair: TokenPair,
    gateways: Gateways,
    store: BaselineStore,
    baseline: Baseline,
    audit: Option<AuditLog>,
    threshold: f64,
}

impl Session {
    /// Create a session, loading whatever baseline the store already holds.
    pub fn new(pair: TokenPair, gateways: Gateways, store: BaselineStore, threshold: f64) -> Self {
        let baseline = store.load();
        if let Some(v) = baseline.initial_value {
            info!("Loaded initial portfolio value: ${v:.2}");
        }
        if baseline.snapshot.is_some() {
            info!("Loaded initial token snapshot from {}", store.snapshot_path().display());
        }
        Self {
            pair,
            gateways,
            store,
            baseline,
            audit: None,
            threshold,
        }
    }

    /// Connect the production collaborators and open the audit trail.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateways = broker::connect(config)?;
        let audit = AuditLog::open(&config.audit_path())?;
        Ok(Self::new(
            config.pair.clone(),
            gateways,
            config.baseline_store(),
            config.threshold_percent,
        )
        .with_audit(audit))
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn wallet(&self) -> &str {
        &self.gateways.wallet
    }

    /// Run one full tick. Never fails; see [`TickOutcome`].
    pub fn tick(&mut self, dry_run: bool) -> TickOutcome {
        info!("Wallet: {}", self.gateways.wallet);

        let observed = observe(&self.pair, &self.gateways, self.threshold, &mut self.baseline);

        let evaluation = match observed {
            Ok(evaluation) => evaluation,
            Err(reason) => {
                self.audit_with(|a| audit::log_tick_skipped(a, reason.label()));
                return TickOutcome::Skipped(reason);
            }
        };

        self.persist_captured(&evaluation);

        log_report(&evaluation);
        self.audit_with(|a| audit::log_tick_evaluated(a, &evaluation));

        let swap = match evaluation.decision.swap() {
            None => SwapOutcome::NotNeeded,
            Some(order) if dry_run => {
                info!("[DRY RUN] Swap not submitted.");
                SwapOutcome::DryRun(order.clone())
            }
            Some(order) => self.execute(order),
        };

        TickOutcome::Evaluated {
            evaluation: Box::new(evaluation),
            swap,
        }
    }

    /// Evaluate once against a copy of the baseline: nothing is persisted,
    /// audited or swapped.
    pub fn status(&self) -> std::result::Result<Evaluation, SkipReason> {
        info!("Wallet: {}", self.gateways.wallet);
        let mut scratch = self.baseline.clone();
        let evaluation = observe(&self.pair, &self.gateways, self.threshold, &mut scratch)?;
        if evaluation.captured.snapshot || evaluation.captured.initial_value {
            info!("No baseline recorded yet; figures are relative to this observation.");
        }
        log_report(&evaluation);
        Ok(evaluation)
    }

    /// Write any baseline slot this tick filled. A failed write keeps the
    /// value in memory and is not retried.
    fn persist_captured(&mut self, evaluation: &Evaluation) {
        if evaluation.captured.snapshot {
            if let Some(snapshot) = self.baseline.snapshot.clone() {
                match self.store.save_snapshot(&snapshot) {
                    Ok(()) => info!("Initial token snapshot recorded."),
                    Err(e) => error!("Failed to persist initial snapshot: {e}"),
                }
                let data = serde_json::to_value(&snapshot).unwrap_or_default();
                self.audit_with(|a| audit::log_baseline_captured(a, "snapshot", data));
            }
        }

        if evaluation.captured.initial_value {
            if let Some(value) = self.baseline.initial_value {
                match self.store.save_initial_value(value) {
                    Ok(()) => info!("Initial portfolio value recorded: ${value:.2}"),
                    Err(e) => error!("Failed to persist initial portfolio value: {e}"),
                }
                self.audit_with(|a| {
                    audit::log_baseline_captured(a, "initial_value", serde_json::json!(value))
                });
            }
        }
    }

    fn execute(&mut self, order: &SwapOrder) -> SwapOutcome {
        self.audit_with(|a| audit::log_swap_submitted(a, order));

        match self.gateways.swaps.execute(order) {
            Ok(receipt) => {
                info!("Swap successful: {}", receipt.explorer_url());
                if !receipt.confirmed_by_router {
                    warn!("Router did not report a signature; using the locally signed one.");
                }
                self.audit_with(|a| audit::log_swap_succeeded(a, order, &receipt));
                SwapOutcome::Executed(receipt)
            }
            Err(e) => {
                let message = e.to_string();
                error!("Swap {} failed: {message}", order.direction);
                self.audit_with(|a| audit::log_swap_failed(a, order, &message));
                SwapOutcome::Failed(message)
            }
        }
    }

    fn audit_with<F>(&mut self, write: F)
    where
        F: FnOnce(&mut AuditLog) -> Result<()>,
    {
        if let Some(audit) = self.audit.as_mut() {
            if let Err(e) = write(audit) {
                warn!("Failed to write audit event: {e}");
            }
        }
    }
}

/// Fetch prices and balances, then evaluate against `baseline`.
///
/// `baseline` is the session's own, updated in place.
fn observe(
    pair: &TokenPair,
    gateways: &Gateways,
    threshold: f64,
    baseline: &mut Baseline,
) -> std::result::Result<Evaluation, SkipReason> {
    let mints = pair.mints();

    let Some(prices) = gateways.prices.prices(&mints) else {
        error!("Could not fetch token prices. Skipping this tick.");
        return Err(SkipReason::PricesUnavailable);
    };

    let holdings = gateways.balances.balances(&gateways.wallet, &mints);

    let view = MarketView {
        pair,
        prices: &prices,
        holdings: &holdings,
        now: Utc::now(),
    };

    evaluate(&view, baseline, threshold).map_err(|e| match e {
        CoreError::PriceUnavailable(mint) => {
            error!("Price unavailable for {mint}. Skipping this tick.");
            SkipReason::PriceMissing(mint)
        }
        other => {
            error!("Evaluation failed: {other}. Skipping this tick.");
            SkipReason::PricesUnavailable
        }
    })
}

/// Level for the report's closing decision line.
fn decision_level(decision: &Decision) -> Level {
    match decision {
        Decision::BelowMinimum { .. } => Level::Warn,
        _ => Level::Info,
    }
}

/// Emit the report line by line; the decision line goes out at
/// [`decision_level`].
fn log_report(evaluation: &Evaluation) {
    let report = evaluation.to_string();
    let mut lines = report.lines().peekable();
    while let Some(line) = lines.next() {
        if lines.peek().is_some() {
            info!("{line}");
        } else {
            log!(decision_level(&evaluation.decision), "{line}");
        }
    }
}

/// The `run` command: tick immediately, then every poll interval.
pub fn run(config: &Config, opts: &RunOptions) -> Result<()> {
    let mut session = Session::from_config(config)?;

    info!(
        "Rebalancing {} / {} at {}% threshold every {}s{}",
        config.pair.a,
        config.pair.b,
        config.threshold_percent,
        config.settings.strategy.poll_interval_secs,
        if opts.dry_run { " (dry run)" } else { "" },
    );
    let wallet = session.wallet().to_string();
    session.audit_with(|a| {
        audit::log_run_started(a, &wallet, &config.pair, config.threshold_percent, opts.dry_run)
    });

    let dry_run = opts.dry_run;
    let ticks = scheduler::run_loop(config.poll_interval(), opts.ticks, || {
        session.tick(dry_run);
    });
    info!("Stopped after {ticks} ticks.");
    Ok(())
}

/// The `status` command.
pub fn check_status(config: &Config) -> Result<()> {
    let session = Session::from_config(config)?;
    if let Err(reason) = session.status() {
        warn!("Status unavailable: {}", reason.label());
    }
    Ok(())
}

/// The `baseline` command: print the persisted baseline, optionally reset it.
pub fn show_baseline(config: &Config, reset: bool, force: bool) -> Result<()> {
    let store = config.baseline_store();
    let baseline = store.load();

    match baseline.initial_value {
        Some(v) => println!("Initial portfolio value: ${v:.2}  ({})", store.value_path().display()),
        None => println!("Initial portfolio value: not recorded"),
    }
    match &baseline.snapshot {
        Some(snapshot) => {
            println!("Initial snapshot taken {}:", snapshot.timestamp);
            for (mint, token) in &snapshot.tokens {
                println!(
                    "  {mint}: {} @ ${:.2} = ${:.2} (decimals: {})",
                    token.balance,
                    token.price,
                    token.value(),
                    token.decimals
                );
            }
        }
        None => println!("Initial snapshot: not recorded"),
    }

    if !reset {
        return Ok(());
    }

    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Delete the baseline? PnL will be measured from the next tick.")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        if !confirmed {
            return Err(Error::Aborted("baseline left unchanged".into()));
        }
    }

    let removed = store.reset()?;
    println!("Removed {removed} baseline file(s).");
    Ok(())
}
