use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn sent(message_id: impl std::fmt::Display) -> Self {
        Self {
            message: format!("Notification sent - Message ID: {}", message_id),
        }
    }

    pub fn bad_request() -> Self {
        Self {
            message: "Bad request".to_string(),
        }
    }

    pub fn publish_failed() -> Self {
        Self {
            message: "Failed to publish notification".to_string(),
        }
    }
}
