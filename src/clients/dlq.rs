use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::message::{DeadLetter, QueueMessage};

/// Terminal store for messages that exhausted their deliveries.
///
/// Nothing here is ever redelivered automatically; entries only leave
/// through retention purges or out-of-band recovery.
pub struct DeadLetterQueue {
    name: String,
    retention: TimeDelta,
    entries: Mutex<Vec<DeadLetter>>,
}

impl DeadLetterQueue {
    pub fn new(name: impl Into<String>, retention: TimeDelta) -> Self {
        let name = name.into();
        info!(queue = %name, retention_secs = retention.num_seconds(), "Dead-letter queue created");

        Self {
            name,
            retention,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn retention(&self) -> TimeDelta {
        self.retention
    }

    pub(crate) fn enqueue(&self, message: QueueMessage, failure_reason: String) {
        warn!(
            queue = %self.name,
            message_id = %message.message_id,
            receive_count = message.receive_count,
            reason = %failure_reason,
            "Message moved to dead-letter queue"
        );

        self.entries.lock().push(DeadLetter {
            message,
            failure_reason,
            dead_lettered_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, message_id: Uuid) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|entry| entry.message.message_id == message_id)
    }

    pub fn entries(&self) -> Vec<DeadLetter> {
        self.entries.lock().clone()
    }

    /// Drops entries older than the retention period. Returns how many went.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();

        entries.retain(|entry| now - entry.dead_lettered_at < self.retention);

        let purged = before - entries.len();
        if purged > 0 {
            info!(queue = %self.name, purged, "Purged expired dead letters");
        }
        purged
    }
}
