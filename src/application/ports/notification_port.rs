use async_trait::async_trait;

use crate::application::services::notifications::Notification;

#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}
