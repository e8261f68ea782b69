use uuid::Uuid;

use crate::error::NotificationError;

/// Result of one message's delivery attempt within a batch.
#[derive(Debug)]
pub struct MessageOutcome {
    pub message_id: Uuid,
    pub receive_count: u32,
    pub result: Result<(), NotificationError>,
}

impl MessageOutcome {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub acknowledged: usize,
    pub failed: usize,
}
