//! Per-ticker drift from the target allocation.
//!
//! Two different thresholds are in play:
//!
//! - the **trigger**: a rebalance is needed when any holding's market value
//!   leaves the band `[(w - TOLERANCE) * equity, (w + TOLERANCE) * equity]`;
//! - the **direction**: each holding is bucketed as over- or under-allocated
//!   against the midpoint `w * equity`, band or not.
//!
//! A holding can therefore be over-allocated yet inside the band. Targets with
//! no holding are never looked at, so a ticker not yet owned is never bought.

use std::fmt;

use rebalancer_broker::Position;
use serde::Serialize;

use crate::allocation::AllocationPolicy;
use crate::error::{Error, Result};

/// Half-width of the no-rebalance band, in fraction of equity (5 points).
pub const TOLERANCE: f64 = 0.05;

/// Which side of the target midpoint a holding sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Drift {
    /// Value at or above target.
    Over,
    /// Value below target.
    Under,
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Drift::Over => write!(f, "OVER"),
            Drift::Under => write!(f, "UNDER"),
        }
    }
}

/// Deviation of one held ticker.
#[derive(Debug, Clone, Serialize)]
pub struct DeviationRecord {
    pub symbol: String,
    pub drift: Drift,
    pub target_fraction: f64,
    pub actual_value: f64,
    pub target_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl DeviationRecord {
    /// True when the actual value lies strictly outside the tolerance band.
    pub fn outside_band(&self) -> bool {
        self.actual_value < self.lower_bound || self.actual_value > self.upper_bound
    }

    /// Actual share of equity, given the equity the record was built from.
    pub fn actual_fraction(&self, equity: f64) -> f64 {
        if equity > 0.0 {
            self.actual_value / equity
        } else {
            0.0
        }
    }
}

/// Result of analyzing one position snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DeviationReport {
    pub equity: f64,
    /// One record per position, in the broker's order.
    pub records: Vec<DeviationRecord>,
    pub needs_rebalance: bool,
}

impl DeviationReport {
    pub fn over_allocated(&self) -> impl Iterator<Item = &DeviationRecord> {
        self.records.iter().filter(|r| r.drift == Drift::Over)
    }

    pub fn under_allocated(&self) -> impl Iterator<Item = &DeviationRecord> {
        self.records.iter().filter(|r| r.drift == Drift::Under)
    }

    pub fn get(&self, symbol: &str) -> Option<&DeviationRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }
}

/// Classify every held position and decide whether to rebalance.
///
/// Fails with [`Error::UnmanagedTicker`] on the first holding that has no
/// target, before anything else is computed.
pub fn analyze(
    positions: &[Position],
    policy: &AllocationPolicy,
    equity: f64,
) -> Result<DeviationReport> {
    let mut records = Vec::with_capacity(positions.len());
    let mut needs_rebalance = false;

    for pos in positions {
        let target = policy
            .fraction(&pos.symbol)
            .ok_or_else(|| Error::UnmanagedTicker {
                ticker: pos.symbol.clone(),
            })?;

        let target_value = target * equity;
        let record = DeviationRecord {
            symbol: pos.symbol.clone(),
            drift: if pos.market_value >= target_value {
                Drift::Over
            } else {
                Drift::Under
            },
            target_fraction: target,
            actual_value: pos.market_value,
            target_value,
            lower_bound: (target - TOLERANCE) * equity,
            upper_bound: (target + TOLERANCE) * equity,
        };

        needs_rebalance |= record.outside_band();
        records.push(record);
    }

    Ok(DeviationReport {
        equity,
        records,
        needs_rebalance,
    })
}

impl fmt::Display for DeviationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ALLOCATION DRIFT (equity ${:.2}):", self.equity)?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>12} {:>12}  {:6} {}",
            "Symbol", "Target%", "Actual%", "Target$", "Actual$", "Drift", "Band"
        )?;
        for r in &self.records {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>12.2} {:>12.2}  {:6} {}",
                r.symbol,
                r.target_fraction * 100.0,
                r.actual_fraction(self.equity) * 100.0,
                r.target_value,
                r.actual_value,
                r.drift.to_string(),
                if r.outside_band() { "OUTSIDE" } else { "inside" },
            )?;
        }
        if self.needs_rebalance {
            writeln!(f, "\n  Rebalance needed.")
        } else {
            writeln!(
                f,
                "\n  No allocation deviates by more than {:.0}%.",
                TOLERANCE * 100.0
            )
        }
    }
}
