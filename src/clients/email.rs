use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::{
    config::Config,
    error::NotificationError,
    models::email::{EmailApiRequest, EmailApiResponse, EmailMessage},
};

/// Capability to send one email. Retries belong to the queue, not here.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}

/// Sends email through an HTTP relay that accepts a JSON message.
pub struct HttpEmailClient {
    http_client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpEmailClient {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        let api_url = api_url.into();
        info!(api_url = %api_url, "Email client initialized");

        Self {
            http_client: Client::new(),
            api_url,
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.email_api_url.clone(), config.email_api_key.clone())
    }
}

#[async_trait]
impl EmailSender for HttpEmailClient {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        debug!(recipient = %email.recipient, "Sending email");

        let mut request = self
            .http_client
            .post(&self.api_url)
            .json(&EmailApiRequest::from(email));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotificationError::Send(format!("Email relay unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let relay_id = response
                .json::<EmailApiResponse>()
                .await
                .ok()
                .and_then(|body| body.message_id);

            info!(
                recipient = %email.recipient,
                relay_message_id = relay_id.as_deref().unwrap_or("unknown"),
                "Email sent successfully"
            );
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(NotificationError::Send(format!(
                "Email relay responded {}: {}",
                status, error_text
            )))
        }
    }
}
