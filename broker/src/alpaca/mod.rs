//! Alpaca trading API broker implementation.

pub mod client;
pub mod types;

use std::time::Duration;

use crate::Broker;
use crate::error::BrokerError;
use crate::types::*;
pub use client::{AlpacaClient, Credentials};
use types::{AccountInfo, OrderRequest, PositionInfo};

/// Alpaca broker implementing the generic Broker trait.
///
/// Uses the REST API for all operations. Blocking (sync) via reqwest::blocking.
/// Paper and live trading differ only in the endpoint and credentials passed in.
pub struct AlpacaBroker {
    client: AlpacaClient,
}

impl AlpacaBroker {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, BrokerError> {
        Ok(Self {
            client: AlpacaClient::new(credentials, timeout)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

/// Parse an Alpaca decimal string (e.g. `"185.50"`).
pub fn parse_decimal(endpoint: &'static str, field: &str, raw: &str) -> Result<f64, BrokerError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| BrokerError::Decode {
            endpoint,
            detail: format!("{field} is not a number: {raw:?}"),
        })
}

/// Like [`parse_decimal`], but an absent (empty) field reads as zero.
fn parse_optional_decimal(endpoint: &'static str, field: &str, raw: &str) -> Result<f64, BrokerError> {
    if raw.trim().is_empty() {
        Ok(0.0)
    } else {
        parse_decimal(endpoint, field, raw)
    }
}

/// Convert a `GET /account` payload to the generic account type.
pub fn to_account(info: &AccountInfo) -> Result<Account, BrokerError> {
    Ok(Account {
        equity: parse_decimal("account", "equity", &info.equity)?,
        buying_power: parse_optional_decimal("account", "buying_power", &info.buying_power)?,
        cash: parse_optional_decimal("account", "cash", &info.cash)?,
    })
}

/// Convert one `GET /positions` entry to the generic position type.
pub fn to_position(info: &PositionInfo) -> Result<Position, BrokerError> {
    if info.symbol.is_empty() {
        return Err(BrokerError::InvalidSymbol(info.symbol.clone()));
    }
    Ok(Position {
        symbol: info.symbol.clone(),
        quantity: parse_decimal("positions", "qty", &info.qty)?,
        market_value: parse_decimal("positions", "market_value", &info.market_value)?,
        current_price: parse_decimal("positions", "current_price", &info.current_price)?,
    })
}

impl Broker for AlpacaBroker {
    fn account(&self) -> Result<Account, BrokerError> {
        to_account(&self.client.account_info()?)
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        self.client
            .positions()?
            .iter()
            .map(to_position)
            .collect()
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderAck, BrokerError> {
        let request = OrderRequest {
            symbol: &order.symbol,
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: order.order_type.as_str(),
            time_in_force: order.time_in_force.as_str(),
        };

        let resp = self.client.submit_order(&request)?;
        Ok(OrderAck {
            id: resp.id,
            status: resp.status,
        })
    }
}
