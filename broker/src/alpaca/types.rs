//! Alpaca-specific API request and response types.
//!
//! Alpaca serializes every decimal as a JSON string; fields are kept as
//! strings here and parsed when converting to the generic broker types.

use serde::{Deserialize, Serialize};

/// `GET /account` response (only the fields the rebalancer reads).
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub equity: String,
    #[serde(default)]
    pub buying_power: String,
    #[serde(default)]
    pub cash: String,
}

/// One entry of the `GET /positions` response.
#[derive(Debug, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    pub qty: String,
    pub market_value: String,
    pub current_price: String,
    #[serde(default)]
    pub side: String,
}

/// `POST /orders` request body.
#[derive(Debug, Serialize)]
pub struct OrderRequest<'a> {
    pub symbol: &'a str,
    pub qty: String,
    pub side: &'a str,
    #[serde(rename = "type")]
    pub order_type: &'a str,
    pub time_in_force: &'a str,
}

/// `POST /orders` response.
#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub status: String,
}

impl OrderResponse {
    /// Stand-in for an accepted order whose response body could not be read.
    pub fn unidentified(symbol: &str) -> Self {
        Self {
            id: String::new(),
            client_order_id: String::new(),
            symbol: symbol.to_string(),
            status: "unknown".to_string(),
        }
    }
}
