use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    clients::topic::Topic,
    error::NotificationError,
    models::{message::PublishReceipt, request::NotificationRequest},
};

/// Turns validated ingestion requests into envelopes on the topic.
#[derive(Clone)]
pub struct NotificationPublisher {
    topic: Arc<Topic>,
}

impl NotificationPublisher {
    pub fn new(topic: Arc<Topic>) -> Self {
        Self { topic }
    }

    pub async fn publish(&self, request: NotificationRequest) -> Result<PublishReceipt, NotificationError> {
        let envelope = request.into_envelope()?;
        let event_type = envelope.event_type();

        match self.topic.publish(&envelope).await {
            Ok(receipt) => {
                info!(
                    topic = %self.topic.name(),
                    event_type,
                    message_id = %receipt.message_id,
                    "Notification published"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(topic = %self.topic.name(), event_type, error = %e, "Notification publish failed");
                Err(e)
            }
        }
    }
}
