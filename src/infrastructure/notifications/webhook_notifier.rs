use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::notification_port::NotificationPort;
use crate::application::services::notifications::Notification;

/// POSTs each notification as JSON to a configured endpoint, e.g. a mail relay.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build http client: {e}"))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationPort for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("request failed: {e}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("webhook returned status {}", resp.status());
        }
        tracing::debug!(kind = ?notification.kind, to = %notification.to_email, "notification_delivered");
        Ok(())
    }
}
