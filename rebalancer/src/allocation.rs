//! Target allocation (allocation.json) loading and validation.

use std::path::Path;

use log::warn;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Slack allowed before the fraction sum is reported as off.
const SUM_WARN_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Deserialize)]
struct AllocationFile {
    targets: Vec<AllocationTarget>,
}

/// A single target: ticker + fraction of equity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AllocationTarget {
    pub symbol: String,
    pub weight: f64,
}

/// Immutable ticker → target fraction mapping for one run.
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    targets: Vec<AllocationTarget>,
    index: FxHashMap<String, f64>,
}

impl AllocationPolicy {
    /// Load and validate an allocation.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::AllocationRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: AllocationFile = serde_json::from_str(json)?;
        Self::new(file.targets)
    }

    /// Build from (symbol, weight) pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Result<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(symbol, weight)| AllocationTarget {
                    symbol: symbol.to_string(),
                    weight,
                })
                .collect(),
        )
    }

    fn new(targets: Vec<AllocationTarget>) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::Allocation("targets list is empty".into()));
        }

        let mut index = FxHashMap::default();
        for t in &targets {
            if t.symbol.trim().is_empty() {
                return Err(Error::Allocation("empty symbol".into()));
            }
            if !t.weight.is_finite() || !(0.0..=1.0).contains(&t.weight) {
                return Err(Error::Allocation(format!(
                    "weight for {} ({}) must be within [0.0, 1.0]",
                    t.symbol, t.weight
                )));
            }
            if index.insert(t.symbol.clone(), t.weight).is_some() {
                return Err(Error::Allocation(format!("duplicate symbol: {}", t.symbol)));
            }
        }

        let policy = Self { targets, index };
        let sum = policy.total_weight();
        if (sum - 1.0).abs() > SUM_WARN_EPSILON {
            warn!("Allocation weights sum to {sum:.4}, not 1.0");
        }
        Ok(policy)
    }

    /// Target fraction for `symbol`, or `None` if the ticker is unmanaged.
    pub fn fraction(&self, symbol: &str) -> Option<f64> {
        self.index.get(symbol).copied()
    }

    /// Targets in file order.
    pub fn targets(&self) -> &[AllocationTarget] {
        &self.targets
    }

    pub fn total_weight(&self) -> f64 {
        self.targets.iter().map(|t| t.weight).sum()
    }

    /// Targets with no matching holding. These are never bought into.
    pub fn unheld<'a>(&'a self, held: &[&str]) -> Vec<&'a str> {
        self.targets
            .iter()
            .map(|t| t.symbol.as_str())
            .filter(|s| !held.contains(s))
            .collect()
    }
}
