//! Broker connection used by rebalancer execution.

use log::info;
use rebalancer_broker::alpaca::AlpacaBroker;

use crate::config::{Config, TradingMode};
use crate::error::{Error, Result};

/// Build the Alpaca broker for `mode` from the configured credentials.
pub fn connect(config: &Config, mode: TradingMode) -> Result<AlpacaBroker> {
    let credentials = config.credentials(mode)?;
    info!("Using Alpaca {mode} endpoint {}", credentials.endpoint);

    AlpacaBroker::new(credentials, config.request_timeout())
        .map_err(|e| Error::from_broker("client setup", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_only() -> Config {
        Config::from_toml(
            r#"
[broker.paper]
endpoint = "https://paper-api.alpaca.markets/v2"
key_id = "PKTEST"
secret_key = "secret"
"#,
        )
        .unwrap()
    }

    #[test]
    fn connect_paper_uses_configured_endpoint() {
        let broker = connect(&paper_only(), TradingMode::Paper).unwrap();
        assert_eq!(broker.endpoint(), "https://paper-api.alpaca.markets/v2");
    }

    #[test]
    fn connect_live_without_section_is_config_error() {
        let err = connect(&paper_only(), TradingMode::Live).err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("broker.live"));
    }
}
