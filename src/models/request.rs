use serde::Deserialize;

use crate::{
    error::NotificationError,
    models::{
        message::{EmailParams, Envelope, TestParams},
        validation::validate_email_fields,
    },
};

const TEST_NOTIFICATION_MESSAGE: &str = "Testando";

/// Body of an email-send request as it arrives over the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequestBody {
    pub email_destinatary: Option<String>,
    pub email_message: Option<String>,
}

/// The two request shapes the ingestion boundary accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRequest {
    TriggerTest {
        request_id: String,
    },
    SendEmail {
        email_destinatary: String,
        email_message: String,
    },
}

impl NotificationRequest {
    /// Parses a POST body. An empty body is a trigger-test request.
    pub fn from_body(body: &[u8], request_id: &str) -> Result<Self, NotificationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(NotificationRequest::TriggerTest {
                request_id: request_id.to_string(),
            });
        }

        let parsed = serde_json::from_slice::<EmailRequestBody>(body)
            .map_err(|e| NotificationError::BadRequest(format!("Invalid request body: {}", e)))?;

        Self::send_email(parsed)
    }

    pub fn send_email(body: EmailRequestBody) -> Result<Self, NotificationError> {
        let (email_destinatary, email_message) = validate_email_fields(
            body.email_destinatary.as_deref(),
            body.email_message.as_deref(),
        )?;

        Ok(NotificationRequest::SendEmail {
            email_destinatary,
            email_message,
        })
    }

    pub fn into_envelope(self) -> Result<Envelope, NotificationError> {
        match self {
            NotificationRequest::TriggerTest { request_id } => Ok(Envelope::Test(TestParams {
                message: TEST_NOTIFICATION_MESSAGE.to_string(),
                request_id,
            })),
            NotificationRequest::SendEmail {
                email_destinatary,
                email_message,
            } => {
                let (email_destinatary, email_message) =
                    validate_email_fields(Some(email_destinatary.as_str()), Some(email_message.as_str()))?;

                Ok(Envelope::Email(EmailParams {
                    email_destinatary,
                    email_message,
                }))
            }
        }
    }
}
