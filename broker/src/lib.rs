//! Broker trait and implementations for the portfolio rebalancer.
//!
//! Provides a `Broker` trait that abstracts over the brokerage REST API.
//! Implementations:
//!
//! - **Alpaca** (feature `alpaca`): Alpaca-style trading REST API, blocking
//! - **Mock** (always available): scripted responses for tests

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "alpaca")]
pub mod alpaca;

pub use error::BrokerError;
pub use types::*;

/// A broker that can report the account, list positions, and accept orders.
///
/// All calls block until the broker answers or the transport fails.
pub trait Broker {
    /// Get the account summary (equity, buying power, cash).
    fn account(&self) -> Result<Account, BrokerError>;

    /// Get all current positions, in the order the broker lists them.
    fn positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Submit an order.
    ///
    /// A non-2xx answer is returned as [`BrokerError::Status`] so callers can
    /// tell retryable rejections from fatal ones.
    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderAck, BrokerError>;
}

impl<B: Broker + ?Sized> Broker for &B {
    fn account(&self) -> Result<Account, BrokerError> {
        (**self).account()
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        (**self).positions()
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderAck, BrokerError> {
        (**self).submit_order(order)
    }
}

impl<B: Broker + ?Sized> Broker for Box<B> {
    fn account(&self) -> Result<Account, BrokerError> {
        (**self).account()
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        (**self).positions()
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderAck, BrokerError> {
        (**self).submit_order(order)
    }
}
