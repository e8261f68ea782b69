use serde::{Deserialize, Serialize};

/// One outgoing email, as handed to an email transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub reply_to: String,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub subject: String,
    pub sender: String,
    pub reply_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailApiRequest {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Vec<String>,
    pub subject: String,
    pub text: String,
}

impl From<&EmailMessage> for EmailApiRequest {
    fn from(email: &EmailMessage) -> Self {
        Self {
            from: email.sender.clone(),
            to: vec![email.recipient.clone()],
            reply_to: vec![email.reply_to.clone()],
            subject: email.subject.clone(),
            text: email.body.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailApiResponse {
    pub message_id: Option<String>,
}
