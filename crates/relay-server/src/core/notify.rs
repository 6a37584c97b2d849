//! Out-of-band notifications
//!
//! Sent when a message is queued for an offline user. Delivery is best
//! effort: callers log failures and carry on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub const PENDING_SUBJECT: &str = "You have new pending message";

/// A single outbound alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub subject: String,
    pub to: String,
    pub body: String,
}

impl Notice {
    /// Alert telling `to` that `sender` left them a message
    pub fn pending_message(to: &str, last_name: &str, sender: &str, app_name: &str) -> Self {
        let body = format!(
            "Dear Mr/Ms {},\n\n\
             Please note that you have a new message from {}, waiting to be opened!\n\
             Please log in to do so!\n\n\
             Regards,\n{}",
            last_name, sender, app_name
        );
        Self {
            subject: PENDING_SUBJECT.to_string(),
            to: to.to_string(),
            body,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<()>;
}

/// Writes notices to the log only
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        info!(
            "[Notify] send email with subject '{}' to {}",
            notice.subject, notice.to
        );
        Ok(())
    }
}

/// POSTs notices as JSON to a mail gateway
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build notification client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        info!("[Notify] POST {} for {}", self.url, notice.to);
        self.client
            .post(&self.url)
            .json(notice)
            .send()
            .await
            .with_context(|| format!("Notification request to {} failed", self.url))?
            .error_for_status()?;
        Ok(())
    }
}
