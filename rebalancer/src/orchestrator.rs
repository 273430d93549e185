//! Sell-then-buy sequencing across all drifted holdings.
//!
//! Every order is sized before the first one is sent, so a sizing error never
//! leaves a half-executed plan. Execution stops at the first fatal order
//! error; orders already accepted stay in place.

use std::fmt;
use std::time::Duration;

use log::{error, info};
use rebalancer_broker::{Broker, Position};

use crate::allocation::AllocationPolicy;
use crate::deviation::{DeviationReport, Drift};
use crate::error::{Error, Result};
use crate::executor::{OrderExecutor, OrderIntent, OrderOutcome};
use crate::sizing::{self, Direction};

/// An order together with how it ended.
#[derive(Debug, Clone)]
pub struct ExecutedOrder {
    pub intent: OrderIntent,
    pub outcome: OrderOutcome,
}

/// Aggregate result of one rebalance pass.
#[derive(Debug)]
pub struct RebalanceOutcome {
    /// Orders that reached a terminal state, in submission order.
    pub executed: Vec<ExecutedOrder>,
    /// The order that failed, if any.
    pub failed: Option<OrderIntent>,
    /// The fatal error that stopped the pass, if any.
    pub error: Option<Error>,
}

impl RebalanceOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Orders the broker accepted.
    pub fn accepted(&self) -> impl Iterator<Item = (&OrderIntent, u64)> {
        self.executed.iter().filter_map(|e| match e.outcome {
            OrderOutcome::Accepted { quantity, .. } => Some((&e.intent, quantity)),
            OrderOutcome::Skipped { .. } => None,
        })
    }

    /// Human-readable summary suitable for a notification.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Orders as `placed` would list them, e.g. `"sell 10 TSLA, buy 10 NVDA"`.
    pub fn placed_summary(&self) -> String {
        self.accepted()
            .map(|(intent, qty)| format!("{} {qty} {}", intent.direction.as_str(), intent.symbol))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The executed orders, or the fatal error. An error that follows
    /// accepted orders is wrapped so the caller still learns what was placed.
    pub fn into_result(self) -> Result<Vec<ExecutedOrder>> {
        let placed = self.placed_summary();
        match self.error {
            None => Ok(self.executed),
            Some(e) if placed.is_empty() => Err(e),
            Some(e) => Err(Error::PartiallyExecuted {
                placed,
                source: Box::new(e),
            }),
        }
    }
}

impl fmt::Display for RebalanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "Successfully rebalanced portfolio")?,
            Some(e) => write!(f, "Failed to rebalance portfolio: {e}")?,
        }
        let placed = self.placed_summary();
        if !placed.is_empty() {
            write!(f, " (placed: {placed})")?;
        }
        Ok(())
    }
}

/// Drives one rebalance: plans orders from a deviation report and executes them.
pub struct Rebalancer<'a, B> {
    policy: &'a AllocationPolicy,
    executor: OrderExecutor<B>,
    order_interval: Duration,
}

impl<'a, B: Broker> Rebalancer<'a, B> {
    pub fn new(policy: &'a AllocationPolicy, broker: B) -> Self {
        Self {
            policy,
            executor: OrderExecutor::new(broker),
            order_interval: Duration::ZERO,
        }
    }

    /// Pause between consecutive submissions.
    pub fn with_order_interval(mut self, interval: Duration) -> Self {
        self.order_interval = interval;
        self
    }

    pub fn policy(&self) -> &AllocationPolicy {
        self.policy
    }

    /// Size every drifted holding: all sells first, then all buys, each in
    /// the order the broker listed the positions.
    pub fn plan(&self, positions: &[Position], report: &DeviationReport) -> Result<Vec<OrderIntent>> {
        let mut orders = Vec::new();

        for (drift, direction) in [(Drift::Over, Direction::Sell), (Drift::Under, Direction::Buy)] {
            for pos in positions {
                let Some(record) = report.get(&pos.symbol) else {
                    continue;
                };
                if record.drift != drift {
                    continue;
                }
                let fraction = self
                    .policy
                    .fraction(&pos.symbol)
                    .ok_or_else(|| Error::UnmanagedTicker {
                        ticker: pos.symbol.clone(),
                    })?;
                let shares = sizing::share_delta(pos, fraction, report.equity, direction)?;
                orders.push(OrderIntent::new(&pos.symbol, direction, shares));
            }
        }

        Ok(orders)
    }

    /// Submit `plan` in order, stopping at the first fatal error.
    pub fn execute(&self, plan: &[OrderIntent]) -> RebalanceOutcome {
        let mut executed = Vec::with_capacity(plan.len());

        for (i, intent) in plan.iter().enumerate() {
            if i > 0 && !self.order_interval.is_zero() {
                std::thread::sleep(self.order_interval);
            }

            match self.executor.execute(intent.clone()) {
                Ok(outcome) => executed.push(ExecutedOrder {
                    intent: intent.clone(),
                    outcome,
                }),
                Err(e) => {
                    error!(
                        "Order {} {} failed, aborting {} remaining: {e}",
                        intent.direction,
                        intent.symbol,
                        plan.len() - i - 1
                    );
                    return RebalanceOutcome {
                        executed,
                        failed: Some(intent.clone()),
                        error: Some(e),
                    };
                }
            }
        }

        info!("Rebalance complete: {} orders processed", executed.len());
        RebalanceOutcome {
            executed,
            failed: None,
            error: None,
        }
    }

    /// Plan and execute in one step.
    pub fn rebalance(&self, positions: &[Position], report: &DeviationReport) -> Result<RebalanceOutcome> {
        let plan = self.plan(positions, report)?;
        Ok(self.execute(&plan))
    }
}

#[cfg(test)]
mod tests {
    use rebalancer_broker::BrokerSide;
    use rebalancer_broker::mock::{MockBroker, OrderReply};

    use super::*;
    use crate::deviation;

    fn position(symbol: &str, qty: f64, price: f64) -> Position {
        Position {
            symbol: symbol.to_string(),
            quantity: qty,
            market_value: qty * price,
            current_price: price,
        }
    }

    fn half_half() -> AllocationPolicy {
        AllocationPolicy::from_pairs([("NVDA", 0.5), ("TSLA", 0.5)]).unwrap()
    }

    #[test]
    fn plan_sells_before_buys() {
        let policy = half_half();
        // Under-allocated NVDA listed first on purpose.
        let positions = vec![position("NVDA", 40.0, 100.0), position("TSLA", 60.0, 100.0)];
        let report = deviation::analyze(&positions, &policy, 10_000.0).unwrap();
        let broker = MockBroker::builder().build();

        let plan = Rebalancer::new(&policy, &broker)
            .plan(&positions, &report)
            .unwrap();

        assert_eq!(
            plan,
            vec![
                OrderIntent::new("TSLA", Direction::Sell, 10),
                OrderIntent::new("NVDA", Direction::Buy, 10),
            ]
        );
    }

    #[test]
    fn execute_submits_in_plan_order() {
        let policy = half_half();
        let positions = vec![position("NVDA", 40.0, 100.0), position("TSLA", 60.0, 100.0)];
        let report = deviation::analyze(&positions, &policy, 10_000.0).unwrap();
        let broker = MockBroker::builder().build();

        let outcome = Rebalancer::new(&policy, &broker)
            .rebalance(&positions, &report)
            .unwrap();

        assert!(outcome.is_success());
        let sent = broker.submitted_orders();
        assert_eq!(sent.len(), 2);
        assert_eq!((sent[0].symbol.as_str(), sent[0].side), ("TSLA", BrokerSide::Sell));
        assert_eq!((sent[1].symbol.as_str(), sent[1].side), ("NVDA", BrokerSide::Buy));
        assert_eq!(
            outcome.message(),
            "Successfully rebalanced portfolio (placed: sell 10 TSLA, buy 10 NVDA)"
        );
    }

    #[test]
    fn positions_order_kept_within_each_side() {
        let policy =
            AllocationPolicy::from_pairs([("A", 0.25), ("B", 0.25), ("C", 0.25), ("D", 0.25)])
                .unwrap();
        let positions = vec![
            position("D", 10.0, 100.0), // under
            position("A", 40.0, 100.0), // over
            position("C", 15.0, 100.0), // under
            position("B", 35.0, 100.0), // over
        ];
        let report = deviation::analyze(&positions, &policy, 10_000.0).unwrap();
        let broker = MockBroker::builder().build();

        let plan = Rebalancer::new(&policy, &broker)
            .plan(&positions, &report)
            .unwrap();
        let order: Vec<_> = plan
            .iter()
            .map(|o| (o.symbol.as_str(), o.direction))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A", Direction::Sell),
                ("B", Direction::Sell),
                ("D", Direction::Buy),
                ("C", Direction::Buy),
            ]
        );
    }

    #[test]
    fn first_failure_aborts_rest() {
        let policy = half_half();
        let positions = vec![position("TSLA", 60.0, 100.0), position("NVDA", 40.0, 100.0)];
        let report = deviation::analyze(&positions, &policy, 10_000.0).unwrap();
        let broker = MockBroker::builder()
            .order_replies([OrderReply::Status(500)])
            .build();

        let outcome = Rebalancer::new(&policy, &broker)
            .rebalance(&positions, &report)
            .unwrap();

        assert!(!outcome.is_success());
        assert!(outcome.executed.is_empty());
        assert_eq!(outcome.failed.as_ref().unwrap().symbol, "TSLA");
        // The buy was never attempted.
        assert_eq!(broker.submitted_orders().len(), 1);
        assert!(outcome.message().starts_with("Failed to rebalance portfolio: "));
        assert!(matches!(
            outcome.into_result(),
            Err(Error::BrokerRejection { status: 500, .. })
        ));
    }

    #[test]
    fn failure_after_partial_progress_keeps_placed_orders() {
        let policy = half_half();
        let positions = vec![position("TSLA", 60.0, 100.0), position("NVDA", 40.0, 100.0)];
        let report = deviation::analyze(&positions, &policy, 10_000.0).unwrap();
        let broker = MockBroker::builder()
            .order_replies([OrderReply::Accept, OrderReply::Transport])
            .build();

        let outcome = Rebalancer::new(&policy, &broker)
            .rebalance(&positions, &report)
            .unwrap();

        assert_eq!(outcome.executed.len(), 1);
        assert!(matches!(outcome.error, Some(Error::Transport(_))));
        assert!(outcome.message().contains("(placed: sell 10 TSLA)"));
        match outcome.into_result() {
            Err(Error::PartiallyExecuted { placed, source }) => {
                assert_eq!(placed, "sell 10 TSLA");
                assert!(matches!(*source, Error::Transport(_)));
            }
            other => panic!("expected PartiallyExecuted, got {other:?}"),
        }
    }

    #[test]
    fn zero_delta_is_skipped_not_sent() {
        let policy = half_half();
        // TSLA over target by half a share → sell delta 0; NVDA well under.
        let positions = vec![position("TSLA", 50.5, 100.0), position("NVDA", 30.0, 100.0)];
        let report = deviation::analyze(&positions, &policy, 10_000.0).unwrap();
        let broker = MockBroker::builder().build();

        let outcome = Rebalancer::new(&policy, &broker)
            .rebalance(&positions, &report)
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.executed.len(), 2);
        assert!(matches!(
            outcome.executed[0].outcome,
            OrderOutcome::Skipped { quantity: 0, .. }
        ));
        let sent = broker.submitted_orders();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].symbol, "NVDA");
        assert_eq!(sent[0].quantity, 20);
    }

    #[test]
    fn sizing_error_places_nothing() {
        let policy = half_half();
        let positions = vec![position("TSLA", 60.0, 100.0), position("NVDA", 40.0, 0.0)];
        let report = deviation::analyze(&positions, &policy, 10_000.0).unwrap();
        let broker = MockBroker::builder().build();

        let result = Rebalancer::new(&policy, &broker).rebalance(&positions, &report);
        assert!(matches!(result, Err(Error::InvalidPrice { .. })));
        assert!(broker.submitted_orders().is_empty());
    }
}
