//! Alpaca trading REST API client.

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};

use super::types::{AccountInfo, OrderRequest, OrderResponse, PositionInfo};
use crate::error::BrokerError;

const KEY_ID_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_KEY_HEADER: &str = "APCA-API-SECRET-KEY";

/// Endpoint and credentials for one Alpaca environment (paper or live).
#[derive(Clone)]
pub struct Credentials {
    /// Base URL including the API version, e.g. `https://paper-api.alpaca.markets/v2`.
    pub endpoint: String,
    pub key_id: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("key_id", &self.key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Blocking Alpaca REST client.
pub struct AlpacaClient {
    client: Client,
    credentials: Credentials,
}

impl AlpacaClient {
    /// Create a client whose every request times out after `timeout`.
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.credentials.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.credentials.endpoint.trim_end_matches('/'))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(KEY_ID_HEADER, &self.credentials.key_id)
            .header(SECRET_KEY_HEADER, &self.credentials.secret_key)
    }

    /// Send the request and turn any non-2xx answer into `BrokerError::Status`.
    fn send(&self, request: RequestBuilder, endpoint: &'static str) -> Result<Response, BrokerError> {
        let resp = self
            .authed(request)
            .send()
            .map_err(|e| BrokerError::Transport(format!("{endpoint} request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(BrokerError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Get account information (GET /account).
    pub fn account_info(&self) -> Result<AccountInfo, BrokerError> {
        let resp = self.send(self.client.get(self.url("account")), "account")?;
        resp.json::<AccountInfo>().map_err(|e| BrokerError::Decode {
            endpoint: "account",
            detail: e.to_string(),
        })
    }

    /// Get open positions (GET /positions).
    pub fn positions(&self) -> Result<Vec<PositionInfo>, BrokerError> {
        let resp = self.send(self.client.get(self.url("positions")), "positions")?;
        resp.json::<Vec<PositionInfo>>()
            .map_err(|e| BrokerError::Decode {
                endpoint: "positions",
                detail: e.to_string(),
            })
    }

    /// Submit a new order (POST /orders).
    pub fn submit_order(&self, order: &OrderRequest<'_>) -> Result<OrderResponse, BrokerError> {
        debug!(
            "Submitting Alpaca order: {} {} {} ({}, {})",
            order.side, order.qty, order.symbol, order.order_type, order.time_in_force
        );

        let resp = self.send(self.client.post(self.url("orders")).json(order), "orders")?;

        // A 2xx means the order is live at the broker, whatever the body says.
        let body = resp.text().unwrap_or_default();
        match serde_json::from_str::<OrderResponse>(&body) {
            Ok(ack) => Ok(ack),
            Err(e) => {
                warn!(
                    "Order {} {} {} accepted but the response was unreadable: {e}",
                    order.side, order.qty, order.symbol
                );
                Ok(OrderResponse::unidentified(order.symbol))
            }
        }
    }
}
