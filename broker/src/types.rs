//! Shared broker types: positions, accounts, orders.

use std::fmt;

/// Broker-level position snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Share quantity; brokers that support fractional shares report non-integers.
    pub quantity: f64,
    pub market_value: f64,
    pub current_price: f64,
}

/// Account summary from the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub equity: f64,
    pub buying_power: f64,
    pub cash: f64,
}

/// Order to submit to a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerOrder {
    pub symbol: String,
    pub side: BrokerSide,
    pub quantity: u64,
    pub order_type: BrokerOrderType,
    pub time_in_force: TimeInForce,
}

impl BrokerOrder {
    /// A market order good for the trading day.
    pub fn market_day(symbol: &str, side: BrokerSide, quantity: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            quantity,
            order_type: BrokerOrderType::Market,
            time_in_force: TimeInForce::Day,
        }
    }
}

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerSide {
    Buy,
    Sell,
}

impl BrokerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerSide::Buy => "buy",
            BrokerSide::Sell => "sell",
        }
    }
}

impl fmt::Display for BrokerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerOrderType {
    Market,
}

impl BrokerOrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerOrderType::Market => "market",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Day,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Day => "day",
        }
    }
}

/// Acknowledgement returned when the broker accepts an order.
///
/// Acceptance is not a fill: the order may still be rejected or partially
/// filled later, which this crate does not track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
}
