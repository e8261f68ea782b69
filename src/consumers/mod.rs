use async_trait::async_trait;

use crate::models::{message::QueueMessage, status::MessageOutcome};

pub mod email;
pub mod logger;

/// A consumer fed by a durable queue, one batch at a time.
///
/// Must return one outcome per message. Messages reported as delivered get
/// acknowledged; all others are left for redelivery.
#[async_trait]
pub trait BatchConsumer: Send + Sync {
    async fn on_batch(&self, batch: &[QueueMessage]) -> Vec<MessageOutcome>;
}
