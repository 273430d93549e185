//! Error types for the rebalancer.

use std::path::PathBuf;

use rebalancer_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("allocation file error: {0}")]
    Allocation(String),

    #[error("failed to read allocation file {path}: {source}")]
    AllocationRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse allocation JSON: {0}")]
    AllocationParse(#[from] serde_json::Error),

    /// A held ticker has no target allocation.
    #[error("{ticker} exists in portfolio but not in desired allocation")]
    UnmanagedTicker { ticker: String },

    #[error("invalid price {price} for {ticker}")]
    InvalidPrice { ticker: String, price: f64 },

    /// Direction string other than "buy" or "sell". A caller defect.
    #[error("invalid direction {0:?}: expected \"buy\" or \"sell\"")]
    InvalidDirection(String),

    /// The broker could not be reached.
    #[error("broker unreachable: {0}")]
    Transport(String),

    /// Every attempt was refused for insufficient buying power.
    #[error("{side} {ticker}: insufficient buying power after {attempts} attempts (last quantity {last_quantity})")]
    RetriesExhausted {
        ticker: String,
        side: &'static str,
        attempts: u32,
        last_quantity: i64,
    },

    /// Any other non-2xx answer from the broker.
    #[error("broker rejected {context}: HTTP {status}: {body}")]
    BrokerRejection {
        context: String,
        status: u16,
        body: String,
    },

    #[error("broker error: {0}")]
    Broker(String),

    /// A fatal order error after earlier orders were already accepted.
    /// Those orders are not rolled back.
    #[error("{source} (placed before failure: {placed})")]
    PartiallyExecuted {
        placed: String,
        #[source]
        source: Box<Error>,
    },

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    /// Map a broker failure outside order submission (account, positions).
    pub fn from_broker(context: &str, err: BrokerError) -> Self {
        match err {
            BrokerError::Transport(msg) => Error::Transport(msg),
            BrokerError::Status { status, body, .. } => Error::BrokerRejection {
                context: context.to_string(),
                status,
                body,
            },
            other => Error::Broker(other.to_string()),
        }
    }

    /// The error that stopped the run, looking through `PartiallyExecuted`.
    pub fn root(&self) -> &Error {
        match self {
            Error::PartiallyExecuted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Process exit status: 2 for configuration and allocation problems, 1 for
    /// everything else. A declined confirmation is not an error and exits 0.
    pub fn exit_code(&self) -> i32 {
        if self.root().is_configuration() { 2 } else { 1 }
    }

    /// Whether the error stems from configuration rather than the broker.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::ConfigRead { .. }
                | Error::ConfigParse(_)
                | Error::Allocation(_)
                | Error::AllocationRead { .. }
                | Error::AllocationParse(_)
                | Error::UnmanagedTicker { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
