use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::WhatsAppConfig;

/// Thin client for a WhatsApp gateway that relays text alerts.
///
/// Used strictly best-effort: callers spawn the send and log failures,
/// nothing in the auth path waits on it.
pub struct WhatsAppClient {
    client: Client,
    gateway_url: Url,
    recipient: String,
}

#[derive(serde::Serialize)]
struct AlertPayload<'a> {
    to: &'a str,
    message: &'a str,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        if config.gateway_url.is_empty() {
            bail!("WhatsApp gateway URL is not configured");
        }

        let gateway_url = Url::parse(&config.gateway_url)
            .context("Invalid [whatsapp].gateway_url in configuration")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build WhatsApp HTTP client")?;

        Ok(Self {
            client,
            gateway_url,
            recipient: config.recipient.clone(),
        })
    }

    pub async fn send_alert(&self, message: &str) -> Result<()> {
        let payload = AlertPayload {
            to: &self.recipient,
            message,
        };

        self.client
            .post(self.gateway_url.clone())
            .json(&payload)
            .send()
            .await
            .context("WhatsApp gateway request failed")?
            .error_for_status()
            .context("WhatsApp gateway returned an error status")?;

        debug!("WhatsApp alert delivered");
        Ok(())
    }
}
