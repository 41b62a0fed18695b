//! Outbound email delivery.
//!
//! The handlers compose messages (confirmation codes, reset links, login
//! notifications) and hand them to an [`EmailSender`]. The default sender
//! only logs, which is what development and the integration tests use; the
//! webhook sender posts the message to an external delivery service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::config::EmailConfig;

#[derive(Debug, Clone, serde::Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// Writes messages to the log instead of delivering them.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "Email (log mode)");
        debug!(body = %message.body, "Email body");
        Ok(())
    }
}

/// Posts messages as JSON to a delivery webhook.
pub struct WebhookEmailSender {
    client: reqwest::Client,
    url: Url,
    from: String,
}

impl WebhookEmailSender {
    pub fn new(url: Url, from: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build email HTTP client")?;

        Ok(Self { client, url, from })
    }
}

#[derive(serde::Serialize)]
struct WebhookPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

#[async_trait]
impl EmailSender for WebhookEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let payload = WebhookPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            body: &message.body,
        };

        self.client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .context("Email webhook request failed")?
            .error_for_status()
            .context("Email webhook returned an error status")?;

        debug!(to = %message.to, "Email delivered via webhook");
        Ok(())
    }
}

/// Builds the sender named by `[email].mode`.
pub fn build_mailer(config: &EmailConfig) -> Result<Arc<dyn EmailSender>> {
    match config.mode.as_str() {
        "webhook" => {
            let url = Url::parse(&config.webhook_url)
                .context("Invalid [email].webhook_url in configuration")?;
            Ok(Arc::new(WebhookEmailSender::new(url, config.from.clone())?))
        }
        _ => Ok(Arc::new(LogEmailSender)),
    }
}
