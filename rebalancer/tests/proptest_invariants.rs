//! Property-based tests for drift detection and order sizing.
//!
//! These tests use proptest to verify that key invariants hold
//! across randomly generated portfolios.

use proptest::prelude::*;
use rebalancer::allocation::AllocationPolicy;
use rebalancer::deviation::{self, Drift, TOLERANCE};
use rebalancer::orchestrator::Rebalancer;
use rebalancer::sizing::{self, Direction};
use rebalancer_broker::Position;
use rebalancer_broker::mock::MockBroker;

const SYMBOLS: [&str; 4] = ["AAPL", "MSFT", "NVDA", "TSLA"];

/// Generate a positive share price
fn price_strategy() -> impl Strategy<Value = f64> {
    (1u32..=200_000u32).prop_map(|c| f64::from(c) / 100.0)
}

/// Generate a whole-share quantity
fn quantity_strategy() -> impl Strategy<Value = u32> {
    0u32..=5_000u32
}

/// Generate a portfolio over `SYMBOLS` with equal target weights
fn portfolio_strategy() -> impl Strategy<Value = (Vec<Position>, f64)> {
    (
        prop::collection::vec((quantity_strategy(), price_strategy()), SYMBOLS.len()),
        0u32..=1_000_000u32,
    )
        .prop_map(|(holdings, cash)| {
            let positions: Vec<Position> = SYMBOLS
                .iter()
                .zip(holdings)
                .map(|(symbol, (qty, price))| Position {
                    symbol: symbol.to_string(),
                    quantity: f64::from(qty),
                    market_value: f64::from(qty) * price,
                    current_price: price,
                })
                .collect();
            let equity = positions.iter().map(|p| p.market_value).sum::<f64>() + f64::from(cash);
            (positions, equity)
        })
}

fn equal_weights() -> AllocationPolicy {
    let weight = 1.0 / SYMBOLS.len() as f64;
    AllocationPolicy::from_pairs(SYMBOLS.iter().map(|s| (*s, weight))).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // DRIFT DETECTION
    // ========================================================================

    /// A rebalance is needed exactly when some holding leaves its band
    #[test]
    fn rebalance_needed_iff_any_outside_band((positions, equity) in portfolio_strategy()) {
        let policy = equal_weights();
        let report = deviation::analyze(&positions, &policy, equity).unwrap();

        let any_outside = report.records.iter().any(|r| {
            r.actual_value < (r.target_fraction - TOLERANCE) * equity
                || r.actual_value > (r.target_fraction + TOLERANCE) * equity
        });
        prop_assert_eq!(report.needs_rebalance, any_outside);
    }

    /// Holdings at or above target are over-allocated, the rest under
    #[test]
    fn drift_splits_at_target_value((positions, equity) in portfolio_strategy()) {
        let policy = equal_weights();
        let report = deviation::analyze(&positions, &policy, equity).unwrap();

        for r in &report.records {
            let expected = if r.actual_value >= r.target_value { Drift::Over } else { Drift::Under };
            prop_assert_eq!(r.drift, expected, "{} misclassified", &r.symbol);
        }
    }

    // ========================================================================
    // SIZING
    // ========================================================================

    /// The desired position never costs more than its target value
    #[test]
    fn desired_quantity_fits_target(
        equity in 0u32..=10_000_000u32,
        weight in 0u32..=100u32,
        price in price_strategy(),
    ) {
        let equity = f64::from(equity);
        let fraction = f64::from(weight) / 100.0;
        let desired = sizing::desired_quantity(equity, fraction, price);

        prop_assert!(desired >= 0);
        prop_assert!(desired as f64 * price <= equity * fraction + 1e-6);
        prop_assert!((desired + 1) as f64 * price > equity * fraction - 1e-6);
    }

    /// Buy and sell deltas mirror each other and depend only on their inputs
    #[test]
    fn share_delta_is_pure_and_symmetric(
        qty in quantity_strategy(),
        price in price_strategy(),
        equity in 1u32..=10_000_000u32,
        weight in 0u32..=100u32,
    ) {
        let pos = Position {
            symbol: "NVDA".into(),
            quantity: f64::from(qty),
            market_value: f64::from(qty) * price,
            current_price: price,
        };
        let equity = f64::from(equity);
        let fraction = f64::from(weight) / 100.0;

        let buy = sizing::share_delta(&pos, fraction, equity, Direction::Buy).unwrap();
        let sell = sizing::share_delta(&pos, fraction, equity, Direction::Sell).unwrap();

        prop_assert_eq!(buy, -sell);
        prop_assert_eq!(buy, sizing::share_delta(&pos, fraction, equity, Direction::Buy).unwrap());
    }

    // ========================================================================
    // ORDERING
    // ========================================================================

    /// Every planned sell precedes every planned buy
    #[test]
    fn plan_sells_before_buys((positions, equity) in portfolio_strategy()) {
        let policy = equal_weights();
        let report = deviation::analyze(&positions, &policy, equity).unwrap();
        let broker = MockBroker::builder().build();

        let plan = Rebalancer::new(&policy, &broker).plan(&positions, &report).unwrap();

        let first_buy = plan.iter().position(|o| o.direction == Direction::Buy);
        if let Some(first_buy) = first_buy {
            prop_assert!(plan[first_buy..].iter().all(|o| o.direction == Direction::Buy));
        }
        prop_assert!(broker.submitted_orders().is_empty());
    }
}
