use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::NotificationError;

pub const EMAIL_EVENT_TYPE: &str = "NOTIFICATIONS_GET";
pub const TEST_EVENT_TYPE: &str = "NOTIFICATIONS_TEST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailParams {
    pub email_destinatary: String,
    pub email_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestParams {
    pub message: String,
    pub request_id: String,
}

/// Canonical notification payload exchanged between pipeline stages.
///
/// Serializes as `{ "eventType": ..., "data": ... }`; the tag alone decides
/// the shape of `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "eventType", content = "data")]
pub enum Envelope {
    #[serde(rename = "NOTIFICATIONS_GET")]
    Email(EmailParams),

    #[serde(rename = "NOTIFICATIONS_TEST")]
    Test(TestParams),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    event_type: String,

    #[serde(default)]
    data: JsonValue,
}

impl Envelope {
    pub fn event_type(&self) -> &'static str {
        match self {
            Envelope::Email(_) => EMAIL_EVENT_TYPE,
            Envelope::Test(_) => TEST_EVENT_TYPE,
        }
    }

    pub fn encode(&self) -> Result<String, NotificationError> {
        serde_json::to_string(self)
            .map_err(|e| NotificationError::Publish(format!("Unserializable envelope: {}", e)))
    }

    /// Decodes a serialized envelope, resolving `data` from `eventType`.
    ///
    /// Unrecognized tags are reported as `UnknownEventType`, never coerced
    /// into one of the known shapes.
    pub fn decode(payload: &str) -> Result<Self, NotificationError> {
        let raw = serde_json::from_str::<RawEnvelope>(payload)
            .map_err(|e| NotificationError::MalformedEnvelope(e.to_string()))?;

        let shape_mismatch = |e: serde_json::Error| {
            NotificationError::MalformedEnvelope(format!(
                "data does not match {}: {}",
                raw.event_type, e
            ))
        };

        match raw.event_type.as_str() {
            EMAIL_EVENT_TYPE => serde_json::from_value(raw.data.clone())
                .map(Envelope::Email)
                .map_err(shape_mismatch),
            TEST_EVENT_TYPE => serde_json::from_value(raw.data.clone())
                .map(Envelope::Test)
                .map_err(shape_mismatch),
            other => Err(NotificationError::UnknownEventType(other.to_string())),
        }
    }
}

/// What a topic hands to each subscription for one publish.
#[derive(Debug, Clone)]
pub struct TopicMessage {
    pub message_id: Uuid,
    pub topic: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub message_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: Uuid,
    pub body: String,
    pub receive_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueMessage {
    pub fn new(body: String) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            body,
            receive_count: 0,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub message: QueueMessage,
    pub failure_reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}
