//! TOML configuration loading and validation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rebalancer_broker::alpaca::Credentials;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub broker: BrokerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    pub paper: Option<EndpointConfig>,
    pub live: Option<EndpointConfig>,
}

fn default_timeout() -> u64 {
    30
}

/// One brokerage environment: where to send requests and with which keys.
#[derive(Clone, Deserialize)]
pub struct EndpointConfig {
    pub endpoint: String,
    pub key_id: String,
    pub secret_key: String,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("endpoint", &self.endpoint)
            .field("key_id", &self.key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Paper trading or real money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingMode {
    Paper,
    Live,
}

impl TradingMode {
    pub fn from_live_flag(live: bool) -> Self {
        if live {
            TradingMode::Live
        } else {
            TradingMode::Paper
        }
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "paper"),
            TradingMode::Live => write!(f, "live"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionConfig {
    /// Pause between consecutive order submissions.
    #[serde(default)]
    pub order_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// POST target for run summaries; when absent the summary is only logged.
    pub webhook_url: Option<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            subject: default_subject(),
        }
    }
}

fn default_subject() -> String {
    "Stock rebalancer".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.broker.timeout_secs == 0 {
            return Err(Error::Config("broker.timeout_secs must be > 0".into()));
        }
        if self.broker.paper.is_none() && self.broker.live.is_none() {
            return Err(Error::Config(
                "at least one of [broker.paper] or [broker.live] is required".into(),
            ));
        }
        for (name, env) in [("paper", &self.broker.paper), ("live", &self.broker.live)] {
            let Some(env) = env else { continue };
            if !(env.endpoint.starts_with("http://") || env.endpoint.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "broker.{name}.endpoint must be an http(s) URL, got {:?}",
                    env.endpoint
                )));
            }
            if env.key_id.is_empty() || env.secret_key.is_empty() {
                return Err(Error::Config(format!(
                    "broker.{name} key_id and secret_key must not be empty"
                )));
            }
        }
        if let Some(url) = &self.notify.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "notify.webhook_url must be an http(s) URL, got {url:?}"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the endpoint and credentials for the chosen mode.
    pub fn credentials(&self, mode: TradingMode) -> Result<Credentials> {
        let env = match mode {
            TradingMode::Paper => &self.broker.paper,
            TradingMode::Live => &self.broker.live,
        };
        let env = env
            .as_ref()
            .ok_or_else(|| Error::Config(format!("no [broker.{mode}] section configured")))?;

        Ok(Credentials {
            endpoint: env.endpoint.clone(),
            key_id: env.key_id.clone(),
            secret_key: env.secret_key.clone(),
        })
    }

    /// Timeout applied to every broker and notifier request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.broker.timeout_secs)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
