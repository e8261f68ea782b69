use std::time::Duration;

use thiserror::Error;

/// Errors raised along the notification pipeline.
///
/// `BadRequest` is the only variant surfaced to API callers as a client
/// error. Everything raised while consuming a queue message leaves that
/// message unacknowledged, so redelivery and dead-lettering decide its fate.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Failed to publish notification: {0}")]
    Publish(String),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Email send failed: {0}")]
    Send(String),

    #[error("Email send timed out after {0:?}")]
    SendTimeout(Duration),
}

impl NotificationError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, NotificationError::BadRequest(_))
    }
}
