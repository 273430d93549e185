//! Order submission with insufficient-buying-power backoff.
//!
//! When the broker refuses an order with HTTP 403 the same order is resent
//! one share smaller, up to [`MAX_ORDER_ATTEMPTS`] submissions in total. The
//! one-share step assumes the shortfall is about one share's value; it is not
//! a search for the largest affordable quantity.

use log::{debug, info, warn};
use rebalancer_broker::{Broker, BrokerError, BrokerOrder, OrderAck};

use crate::error::{Error, Result};
use crate::sizing::Direction;

/// Submissions per order, the first one included.
pub const MAX_ORDER_ATTEMPTS: u32 = 5;

/// Status the broker uses for "insufficient buying power".
pub const INSUFFICIENT_BUYING_POWER: u16 = 403;

/// One order to place: the sized quantity plus the retry adjustment so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    pub symbol: String,
    pub direction: Direction,
    /// Quantity from the sizer; may be zero or negative.
    pub shares: i64,
    /// Starts at 0, decremented by one per 403.
    pub adjustment: i64,
}

impl OrderIntent {
    pub fn new(symbol: &str, direction: Direction, shares: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            direction,
            shares,
            adjustment: 0,
        }
    }

    /// Whether the sized quantity is worth submitting at all.
    pub fn is_actionable(&self) -> bool {
        self.shares > 0
    }

    /// Quantity the next submission will ask for.
    pub fn quantity(&self) -> i64 {
        self.shares + self.adjustment
    }
}

/// Terminal state of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// The broker accepted the order. Not a fill confirmation.
    Accepted {
        ack: OrderAck,
        quantity: u64,
        attempts: u32,
    },
    /// Nothing to trade: the quantity was zero or negative, possibly after
    /// retry adjustments. Nothing was sent for this state.
    Skipped { quantity: i64, attempts: u32 },
}

impl OrderOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            OrderOutcome::Accepted { attempts, .. } | OrderOutcome::Skipped { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Places market/day orders through a [`Broker`].
pub struct OrderExecutor<B> {
    broker: B,
    max_attempts: u32,
}

impl<B: Broker> OrderExecutor<B> {
    pub fn new(broker: B) -> Self {
        Self {
            broker,
            max_attempts: MAX_ORDER_ATTEMPTS,
        }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Submit `intent`, shrinking it by one share after every 403.
    ///
    /// Any other non-2xx answer and any transport failure end the order
    /// immediately with an error.
    pub fn execute(&self, mut intent: OrderIntent) -> Result<OrderOutcome> {
        let mut attempts = 0;

        loop {
            let quantity = intent.quantity();
            if quantity <= 0 {
                debug!(
                    "{} {}: quantity {quantity} after {attempts} attempts, nothing to submit",
                    intent.direction, intent.symbol
                );
                return Ok(OrderOutcome::Skipped { quantity, attempts });
            }

            attempts += 1;
            let order =
                BrokerOrder::market_day(&intent.symbol, intent.direction.side(), quantity as u64);

            match self.broker.submit_order(&order) {
                Ok(ack) => {
                    info!(
                        "{} {} {} accepted (id {}, attempt {attempts})",
                        intent.direction, quantity, intent.symbol, ack.id
                    );
                    return Ok(OrderOutcome::Accepted {
                        ack,
                        quantity: quantity as u64,
                        attempts,
                    });
                }
                Err(BrokerError::Status {
                    status: INSUFFICIENT_BUYING_POWER,
                    ..
                }) if attempts < self.max_attempts => {
                    warn!(
                        "{} {} {}: insufficient buying power, retrying with {} (attempt {attempts}/{})",
                        intent.direction,
                        quantity,
                        intent.symbol,
                        quantity - 1,
                        self.max_attempts
                    );
                    intent.adjustment -= 1;
                }
                Err(BrokerError::Status {
                    status: INSUFFICIENT_BUYING_POWER,
                    ..
                }) => {
                    return Err(Error::RetriesExhausted {
                        ticker: intent.symbol,
                        side: intent.direction.as_str(),
                        attempts,
                        last_quantity: quantity,
                    });
                }
                Err(BrokerError::Status { status, body, .. }) => {
                    return Err(Error::BrokerRejection {
                        context: format!("{} {quantity} {}", intent.direction.as_str(), intent.symbol),
                        status,
                        body,
                    });
                }
                Err(BrokerError::Transport(msg)) => return Err(Error::Transport(msg)),
                Err(other) => return Err(Error::Broker(other.to_string())),
            }
        }
    }
}
