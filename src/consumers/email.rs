use std::{panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures_util::{FutureExt, future::join_all};
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

use crate::{
    clients::email::EmailSender,
    consumers::BatchConsumer,
    error::NotificationError,
    models::{
        email::{EmailMessage, EmailSettings},
        message::{Envelope, QueueMessage},
        status::MessageOutcome,
        validation::validate_email_fields,
    },
};

pub struct EmailDispatcher {
    sender: Arc<dyn EmailSender>,
    settings: EmailSettings,
    send_timeout: Duration,
}

impl EmailDispatcher {
    pub fn new(sender: Arc<dyn EmailSender>, settings: EmailSettings, send_timeout: Duration) -> Self {
        Self {
            sender,
            settings,
            send_timeout,
        }
    }

    pub async fn dispatch(&self, message: &QueueMessage) -> Result<(), NotificationError> {
        let envelope = Envelope::decode(&message.body)?;

        match envelope {
            Envelope::Email(params) => {
                let (recipient, body) = validate_email_fields(
                    Some(params.email_destinatary.as_str()),
                    Some(params.email_message.as_str()),
                )
                .map_err(|e| NotificationError::MalformedEnvelope(e.to_string()))?;

                let email = EmailMessage {
                    recipient,
                    subject: self.settings.subject.clone(),
                    body,
                    sender: self.settings.sender.clone(),
                    reply_to: self.settings.reply_to.clone(),
                };

                timeout(self.send_timeout, self.sender.send_email(&email))
                    .await
                    .map_err(|_| NotificationError::SendTimeout(self.send_timeout))?
            }
            Envelope::Test(params) => {
                debug!(
                    message_id = %message.message_id,
                    request_id = %params.request_id,
                    "Test notification carries no email, nothing to send"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl BatchConsumer for EmailDispatcher {
    async fn on_batch(&self, batch: &[QueueMessage]) -> Vec<MessageOutcome> {
        info!(batch_size = batch.len(), "Dispatching email batch");

        let attempts = batch.iter().map(|message| async move {
            // A panicking sender fails this message only; the queue redelivers it.
            let result = AssertUnwindSafe(self.dispatch(message))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(NotificationError::Send("Email sender panicked".to_string())));

            if let Err(e) = &result {
                warn!(
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    error = %e,
                    "Email dispatch failed, leaving message for redelivery"
                );
            }

            MessageOutcome {
                message_id: message.message_id,
                receive_count: message.receive_count,
                result,
            }
        });

        join_all(attempts).await
    }
}
