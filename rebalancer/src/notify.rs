//! Run-completion notifications.

use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use serde::Serialize;

use crate::config::NotifyConfig;
use crate::error::{Error, Result};

/// Receives the one-line summary of a finished run.
pub trait Notifier {
    fn notify(&self, message: &str) -> Result<()>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, message: &str) -> Result<()> {
        (**self).notify(message)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, message: &str) -> Result<()> {
        (**self).notify(message)
    }
}

/// Writes the summary to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        info!("{message}");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    text: &'a str,
}

/// POSTs `{"subject": ..., "text": ...}` to a webhook URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    subject: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, subject: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Notify(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            subject: subject.to_string(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        let payload = WebhookPayload {
            subject: &self.subject,
            text: message,
        };
        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| Error::Notify(format!("webhook request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Notify(format!("webhook returned {}", resp.status())));
        }
        debug!("Notification delivered to {}", self.url);
        Ok(())
    }
}

/// Build the notifier described by `[notify]`.
pub fn from_config(config: &NotifyConfig, timeout: Duration) -> Result<Box<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => Ok(Box::new(WebhookNotifier::new(url, &config.subject, timeout)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}
