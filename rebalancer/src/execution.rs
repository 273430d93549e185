//! Run workflow: fetch → analyze → plan → confirm → execute → notify.
//!
//! This is the main workflow that ties together all components.

use std::time::Duration;

use log::{info, warn};
use rebalancer_broker::{Broker, Position};

use crate::allocation::AllocationPolicy;
use crate::audit::{self, AuditLog};
use crate::config::{Config, TradingMode};
use crate::deviation::{self, DeviationReport};
use crate::error::{Error, Result};
use crate::executor::{OrderIntent, OrderOutcome};
use crate::notify::Notifier;
use crate::orchestrator::{ExecutedOrder, RebalanceOutcome, Rebalancer};

/// Sent when every holding sits inside its band.
pub const NO_REBALANCE_MESSAGE: &str =
    "Did not rebalance portfolio--no allocations deviated by more than 5%.";

/// Options for a rebalance run.
pub struct RunOptions {
    pub mode: TradingMode,
    pub dry_run: bool,
    pub force: bool,
    pub allocation_file: String,
}

/// How a run that did not fail ended.
#[derive(Debug)]
pub enum RunSummary {
    /// Every holding was inside its band.
    NoRebalance(DeviationReport),
    /// Orders were planned but not submitted.
    DryRun(Vec<OrderIntent>),
    /// The operator declined the confirmation prompt.
    Declined(Vec<OrderIntent>),
    /// Every planned order reached a terminal state.
    Rebalanced {
        orders: Vec<ExecutedOrder>,
        message: String,
    },
}

impl RunSummary {
    pub fn message(&self) -> String {
        match self {
            RunSummary::NoRebalance(_) => NO_REBALANCE_MESSAGE.to_string(),
            RunSummary::DryRun(plan) => format!(
                "Dry run: {} order(s) planned, none submitted",
                plan.iter().filter(|o| o.is_actionable()).count()
            ),
            RunSummary::Declined(_) => "Rebalance declined at confirmation".to_string(),
            RunSummary::Rebalanced { message, .. } => message.clone(),
        }
    }

    /// The text to send through the notifier, if this outcome warrants one.
    pub fn notification(&self) -> Option<String> {
        match self {
            RunSummary::Declined(_) => None,
            other => Some(other.message()),
        }
    }
}

/// Execute a full rebalance run and report its outcome through `notifier`.
///
/// A notifier failure is logged and never changes the returned result.
pub fn run<B: Broker>(
    config: &Config,
    policy: &AllocationPolicy,
    broker: &B,
    notifier: &dyn Notifier,
    opts: &RunOptions,
) -> Result<RunSummary> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    record(audit::log_run_started(
        &mut audit,
        &opts.allocation_file,
        opts.mode,
        opts.dry_run,
    ));

    let result = rebalance_once(config, policy, broker, opts, &mut audit);

    let notification = match &result {
        Ok(summary) => {
            record(audit::log_run_completed(&mut audit, &summary.message()));
            summary.notification()
        }
        Err(e) => {
            record(audit::log_run_failed(&mut audit, e));
            Some(format!("Failed to rebalance portfolio: {e}"))
        }
    };

    if let Some(message) = notification {
        if let Err(e) = notifier.notify(&message) {
            warn!("Notification failed: {e}");
        }
    }

    result
}

/// Audit writes are best effort once the audit file is open: a failed write is
/// logged and the run carries on with its own result.
fn record(written: Result<()>) {
    if let Err(e) = written {
        warn!("Audit log write failed: {e}");
    }
}

fn rebalance_once<B: Broker>(
    config: &Config,
    policy: &AllocationPolicy,
    broker: &B,
    opts: &RunOptions,
    audit: &mut AuditLog,
) -> Result<RunSummary> {
    let account = broker
        .account()
        .map_err(|e| Error::from_broker("account", e))?;
    let positions = broker
        .positions()
        .map_err(|e| Error::from_broker("positions", e))?;
    record(audit::log_positions(audit, &positions, &account));

    println!(
        "Alpaca {} account: ${:.2} equity, ${:.2} buying power",
        opts.mode, account.equity, account.buying_power
    );
    display_positions(&positions, account.equity);

    let report = deviation::analyze(&positions, policy, account.equity)?;
    record(audit::log_deviation(audit, &report));
    print!("\n{report}");

    let held: Vec<&str> = positions.iter().map(|p| p.symbol.as_str()).collect();
    for symbol in policy.unheld(&held) {
        warn!("{symbol} has a target allocation but no position and will not be bought");
    }

    if !report.needs_rebalance {
        record(audit.log_simple("no_rebalance_needed"));
        return Ok(RunSummary::NoRebalance(report));
    }

    let rebalancer = Rebalancer::new(policy, broker)
        .with_order_interval(Duration::from_millis(config.execution.order_interval_ms));
    let plan = rebalancer.plan(&positions, &report)?;
    record(audit::log_plan(audit, &plan, opts.dry_run));
    display_plan(&plan, &positions);

    if opts.dry_run {
        println!("\n[DRY RUN] No orders submitted.");
        return Ok(RunSummary::DryRun(plan));
    }

    if opts.mode == TradingMode::Live && !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Submit these orders with real money?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        record(audit.log("user_confirmed", serde_json::json!({ "approved": confirmed })));
        if !confirmed {
            println!("Aborted.");
            return Ok(RunSummary::Declined(plan));
        }
    }

    info!(
        "Submitting {} orders",
        plan.iter().filter(|o| o.is_actionable()).count()
    );
    let outcome = rebalancer.execute(&plan);
    record(audit::log_outcome(audit, &outcome));
    display_outcome(&outcome, plan.len());

    let message = outcome.message();
    let orders = outcome.into_result()?;
    Ok(RunSummary::Rebalanced { orders, message })
}

/// Show account equity and current positions.
pub fn show_positions<B: Broker>(broker: &B, mode: TradingMode) -> Result<()> {
    let account = broker
        .account()
        .map_err(|e| Error::from_broker("account", e))?;
    let positions = broker
        .positions()
        .map_err(|e| Error::from_broker("positions", e))?;

    println!(
        "Alpaca {mode} account: ${:.2} equity, ${:.2} cash, ${:.2} buying power\n",
        account.equity, account.cash, account.buying_power
    );
    display_positions(&positions, account.equity);
    Ok(())
}

/// Check that the broker answers with the configured credentials.
pub fn check_status<B: Broker>(broker: &B, mode: TradingMode, endpoint: &str) -> Result<()> {
    print!("Connecting to Alpaca {mode} at {endpoint}... ");
    let account = broker
        .account()
        .map_err(|e| Error::from_broker("account", e))?;
    println!("OK");
    println!("Equity: ${:.2}", account.equity);
    Ok(())
}

/// Print the deviation table without planning or placing anything.
pub fn show_drift<B: Broker>(broker: &B, policy: &AllocationPolicy) -> Result<DeviationReport> {
    let account = broker
        .account()
        .map_err(|e| Error::from_broker("account", e))?;
    let positions = broker
        .positions()
        .map_err(|e| Error::from_broker("positions", e))?;

    let report = deviation::analyze(&positions, policy, account.equity)?;
    print!("{report}");
    Ok(report)
}

// === Helpers ===

fn display_positions(positions: &[Position], equity: f64) {
    if positions.is_empty() {
        println!("No positions.");
        return;
    }

    println!("CURRENT PORTFOLIO:");
    for pos in positions {
        let weight = if equity > 0.0 {
            pos.market_value / equity
        } else {
            0.0
        };
        println!(
            "  {:8} {:>10.2} @ ${:>9.2} = ${:>12.2}  ({:.1}%)",
            pos.symbol,
            pos.quantity,
            pos.current_price,
            pos.market_value,
            weight * 100.0,
        );
    }
}

fn display_plan(plan: &[OrderIntent], positions: &[Position]) {
    println!("\nREBALANCE ORDERS:");
    println!(
        "  {:>3}  {:6} {:8} {:>8} {:>10} {:>12}",
        "#", "Side", "Symbol", "Shares", "Price", "Est. value"
    );

    for (i, order) in plan.iter().enumerate() {
        if !order.is_actionable() {
            println!(
                "  {:>3}  {:6} {:8} {:>8}   (skipped: nothing to trade)",
                i + 1,
                order.direction.to_string(),
                order.symbol,
                order.shares,
            );
            continue;
        }
        let price = positions
            .iter()
            .find(|p| p.symbol == order.symbol)
            .map_or(0.0, |p| p.current_price);
        println!(
            "  {:>3}  {:6} {:8} {:>8} ${:>9.2} ${:>11.2}",
            i + 1,
            order.direction.to_string(),
            order.symbol,
            order.shares,
            price,
            order.shares as f64 * price,
        );
    }
}

fn display_outcome(outcome: &RebalanceOutcome, planned: usize) {
    for (i, executed) in outcome.executed.iter().enumerate() {
        let intent = &executed.intent;
        match &executed.outcome {
            OrderOutcome::Accepted {
                ack,
                quantity,
                attempts,
            } => println!(
                "[{}/{planned}] {} {quantity} {} ... ACCEPTED {} after {attempts} attempt(s)",
                i + 1,
                intent.direction,
                intent.symbol,
                ack.id,
            ),
            OrderOutcome::Skipped { quantity, .. } => println!(
                "[{}/{planned}] {} {} ... SKIPPED (quantity {quantity})",
                i + 1,
                intent.direction,
                intent.symbol,
            ),
        }
    }

    if let (Some(intent), Some(err)) = (&outcome.failed, &outcome.error) {
        println!(
            "[{}/{planned}] {} {} {} ... FAILED: {err}",
            outcome.executed.len() + 1,
            intent.direction,
            intent.shares,
            intent.symbol,
        );
    }
    println!("\n{outcome}");
}
