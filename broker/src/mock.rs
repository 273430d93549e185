//! Mock broker for testing: implements the `Broker` trait with scripted behavior.
//!
//! Use this in tests to simulate broker responses without network calls.
//!
//! ```
//! use rebalancer_broker::mock::{MockBroker, OrderReply};
//! use rebalancer_broker::{Broker, BrokerOrder, BrokerSide};
//!
//! let broker = MockBroker::builder()
//!     .with_account(10_000.0, 2_000.0)
//!     .with_position("NVDA", 40.0, 100.0)
//!     .order_replies([OrderReply::Status(403), OrderReply::Accept])
//!     .build();
//!
//! let order = BrokerOrder::market_day("NVDA", BrokerSide::Buy, 10);
//! assert!(broker.submit_order(&order).is_err());
//! assert!(broker.submit_order(&order).is_ok());
//! assert_eq!(broker.submitted_orders().len(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::Broker;
use crate::error::BrokerError;
use crate::types::*;

/// How the mock answers one order submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderReply {
    /// 2xx: the order is accepted.
    Accept,
    /// Non-2xx with the given status code.
    Status(u16),
    /// The broker cannot be reached.
    Transport,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    positions: Vec<Position>,
    equity: f64,
    cash: f64,
    replies: VecDeque<OrderReply>,
    default_reply: OrderReply,
    account_unreachable: bool,
    positions_unreachable: bool,
}

impl MockBrokerBuilder {
    /// Add a position valued at `quantity * price`.
    pub fn with_position(mut self, symbol: &str, quantity: f64, price: f64) -> Self {
        self.positions.push(Position {
            symbol: symbol.to_string(),
            quantity,
            market_value: quantity * price,
            current_price: price,
        });
        self
    }

    pub fn with_account(mut self, equity: f64, cash: f64) -> Self {
        self.equity = equity;
        self.cash = cash;
        self
    }

    /// Replies consumed one per submission, in order. Once exhausted the
    /// default reply is used.
    pub fn order_replies(mut self, replies: impl IntoIterator<Item = OrderReply>) -> Self {
        self.replies.extend(replies);
        self
    }

    pub fn default_reply(mut self, reply: OrderReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Make `account()` fail with a transport error.
    pub fn account_unreachable(mut self) -> Self {
        self.account_unreachable = true;
        self
    }

    /// Make `positions()` fail with a transport error.
    pub fn positions_unreachable(mut self) -> Self {
        self.positions_unreachable = true;
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            positions: self.positions,
            equity: self.equity,
            cash: self.cash,
            account_unreachable: self.account_unreachable,
            positions_unreachable: self.positions_unreachable,
            default_reply: self.default_reply,
            replies: Mutex::new(self.replies),
            submitted_orders: Mutex::new(Vec::new()),
        }
    }
}

/// A mock broker that records submitted orders and returns scripted replies.
pub struct MockBroker {
    positions: Vec<Position>,
    equity: f64,
    cash: f64,
    account_unreachable: bool,
    positions_unreachable: bool,
    default_reply: OrderReply,
    replies: Mutex<VecDeque<OrderReply>>,
    submitted_orders: Mutex<Vec<BrokerOrder>>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            positions: Vec::new(),
            equity: 100_000.0,
            cash: 100_000.0,
            replies: VecDeque::new(),
            default_reply: OrderReply::Accept,
            account_unreachable: false,
            positions_unreachable: false,
        }
    }

    /// Every order that reached `submit_order`, including rejected ones.
    pub fn submitted_orders(&self) -> Vec<BrokerOrder> {
        self.submitted_orders.lock().unwrap().clone()
    }
}

impl Broker for MockBroker {
    fn account(&self) -> Result<Account, BrokerError> {
        if self.account_unreachable {
            return Err(BrokerError::Transport("mock: account unreachable".into()));
        }
        Ok(Account {
            equity: self.equity,
            buying_power: self.cash,
            cash: self.cash,
        })
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        if self.positions_unreachable {
            return Err(BrokerError::Transport("mock: positions unreachable".into()));
        }
        Ok(self.positions.clone())
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderAck, BrokerError> {
        let mut recorded = self.submitted_orders.lock().unwrap();
        recorded.push(order.clone());
        let seq = recorded.len();

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_reply);

        match reply {
            OrderReply::Accept => Ok(OrderAck {
                id: format!("mock-{seq}"),
                status: "accepted".into(),
            }),
            OrderReply::Status(status) => Err(BrokerError::Status {
                endpoint: "orders",
                status,
                body: format!("mock: rejected with {status}"),
            }),
            OrderReply::Transport => Err(BrokerError::Transport("mock: connection refused".into())),
        }
    }
}
