//! Share-count sizing for a single ticker.
//!
//! All quantities are truncated toward zero, so a fractional holding of 40.7
//! shares counts as 40 and a target worth 50.9 shares counts as 50.

use std::fmt;
use std::str::FromStr;

use rebalancer_broker::{BrokerSide, Position};
use serde::Serialize;

use crate::error::{Error, Result};

/// Trade direction for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }

    pub fn side(&self) -> BrokerSide {
        match self {
            Direction::Buy => BrokerSide::Buy,
            Direction::Sell => BrokerSide::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    /// Only the exact lowercase wire names are accepted.
    ///
    /// The order pipeline carries `Direction` values end to end, so this parse
    /// and its `InvalidDirection` error only apply to direction text coming
    /// from outside, such as a hand-edited plan or an operator prompt.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Whole shares worth `fraction` of `equity` at `price`.
///
/// `price` must be positive and finite; see [`share_delta`].
pub fn desired_quantity(equity: f64, fraction: f64, price: f64) -> i64 {
    (equity * fraction / price).trunc() as i64
}

/// Signed number of shares to trade in `direction` to bring `position` to
/// `target_fraction` of `equity`.
///
/// - buy:  `desired - trunc(qty)`
/// - sell: `trunc(qty) - desired`
///
/// The result can be zero or negative (for instance a sell of a holding that
/// is over target by less than one share). Callers must not submit those.
pub fn share_delta(
    position: &Position,
    target_fraction: f64,
    equity: f64,
    direction: Direction,
) -> Result<i64> {
    let price = position.current_price;
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidPrice {
            ticker: position.symbol.clone(),
            price,
        });
    }

    let desired = desired_quantity(equity, target_fraction, price);
    let held = position.quantity.trunc() as i64;

    Ok(match direction {
        Direction::Buy => desired - held,
        Direction::Sell => held - desired,
    })
}
