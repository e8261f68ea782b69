use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::{clients::topic::DirectSubscriber, models::message::TopicMessage};

/// Logs every published notification as-is, whatever its shape.
pub struct NotificationLogger;

#[async_trait]
impl DirectSubscriber for NotificationLogger {
    fn name(&self) -> &str {
        "notification-logger"
    }

    async fn on_message(&self, message: &TopicMessage) -> Result<()> {
        info!(
            topic = %message.topic,
            message_id = %message.message_id,
            published_at = %message.published_at,
            "Notification message: {}",
            message.body
        );
        Ok(())
    }
}
