//! Broker error types.

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The broker could not be reached (DNS, TLS, timeout, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The broker answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode {endpoint} response: {detail}")]
    Decode {
        endpoint: &'static str,
        detail: String,
    },

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("{0}")]
    Other(String),
}

impl BrokerError {
    /// HTTP status code, if the broker answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BrokerError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
