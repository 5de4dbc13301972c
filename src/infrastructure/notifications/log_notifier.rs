use async_trait::async_trait;

use crate::application::ports::notification_port::NotificationPort;
use crate::application::services::notifications::Notification;

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(
            kind = ?notification.kind,
            to = %notification.to_email,
            subject = %notification.subject,
            "notification"
        );
        Ok(())
    }
}
