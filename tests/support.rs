use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use notification_fanout::{
    clients::{
        dlq::DeadLetterQueue,
        email::EmailSender,
        queue::DurableQueue,
        topic::{DirectSubscriber, Subscription, Topic},
    },
    error::NotificationError,
    models::{
        email::{EmailMessage, EmailSettings},
        message::{EmailParams, Envelope, TopicMessage},
        queue::QueueConfig,
    },
};
use chrono::TimeDelta;
use tokio::{
    sync::mpsc,
    time::{Duration, sleep},
};

pub const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

pub fn queue_config() -> QueueConfig {
    QueueConfig {
        batch_size: 5,
        max_batching_window: Duration::from_secs(60),
        visibility_timeout: VISIBILITY_TIMEOUT,
    }
}

pub fn email_settings() -> EmailSettings {
    EmailSettings {
        subject: "Notification".to_string(),
        sender: "no-reply@notify.test".to_string(),
        reply_to: "support@notify.test".to_string(),
    }
}

pub struct Pipeline {
    pub topic: Arc<Topic>,
    pub queue: Arc<DurableQueue>,
    pub dead_letter_queue: Arc<DeadLetterQueue>,
}

pub fn pipeline(max_receive_count: u32) -> Pipeline {
    let dead_letter_queue = Arc::new(DeadLetterQueue::new("test-dlq", TimeDelta::days(10)));
    let queue = Arc::new(
        DurableQueue::new("test-queue", queue_config())
            .with_dead_letter_queue(dead_letter_queue.clone(), max_receive_count),
    );
    let topic = Arc::new(Topic::new("test-topic"));
    topic.subscribe(Subscription::Queue(queue.clone()));

    Pipeline {
        topic,
        queue,
        dead_letter_queue,
    }
}

pub fn email_body(recipient: &str, message: &str) -> String {
    Envelope::Email(EmailParams {
        email_destinatary: recipient.to_string(),
        email_message: message.to_string(),
    })
    .encode()
    .unwrap()
}

/// Email sender that records every attempt and fails on demand.
#[derive(Default)]
pub struct ScriptedEmailSender {
    attempts: Mutex<Vec<EmailMessage>>,
    sent: Mutex<Vec<EmailMessage>>,
    failures_left: Mutex<HashMap<String, u32>>,
    delays: Mutex<HashMap<String, Duration>>,
    panics: Mutex<HashSet<String>>,
}

impl ScriptedEmailSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fails the next `times` sends to `recipient`.
    pub fn fail_for(&self, recipient: &str, times: u32) {
        self.failures_left
            .lock()
            .unwrap()
            .insert(recipient.to_string(), times);
    }

    pub fn delay_for(&self, recipient: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(recipient.to_string(), delay);
    }

    /// Panics on every send to `recipient`.
    pub fn panic_for(&self, recipient: &str) {
        self.panics.lock().unwrap().insert(recipient.to_string());
    }

    pub fn attempts(&self) -> Vec<EmailMessage> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for ScriptedEmailSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        self.attempts.lock().unwrap().push(email.clone());

        let panics = self.panics.lock().unwrap().contains(&email.recipient);
        if panics {
            panic!("sender bug for {}", email.recipient);
        }

        let delay = self.delays.lock().unwrap().get(&email.recipient).copied();
        if let Some(delay) = delay {
            sleep(delay).await;
        }

        {
            let mut failures = self.failures_left.lock().unwrap();
            if let Some(left) = failures.get_mut(&email.recipient) {
                if *left > 0 {
                    *left -= 1;
                    return Err(NotificationError::Send("relay unavailable".to_string()));
                }
            }
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Direct subscriber forwarding every delivery to a channel.
pub struct ChannelSubscriber {
    name: String,
    tx: mpsc::UnboundedSender<TopicMessage>,
}

impl ChannelSubscriber {
    pub fn new(name: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<TopicMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                name: name.to_string(),
                tx,
            }),
            rx,
        )
    }
}

#[async_trait]
impl DirectSubscriber for ChannelSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_message(&self, message: &TopicMessage) -> Result<()> {
        self.tx.send(message.clone())?;
        Ok(())
    }
}

pub struct FailingSubscriber;

#[async_trait]
impl DirectSubscriber for FailingSubscriber {
    fn name(&self) -> &str {
        "failing"
    }

    async fn on_message(&self, _message: &TopicMessage) -> Result<()> {
        Err(anyhow!("downstream sink unavailable"))
    }
}

pub struct PanickingSubscriber;

#[async_trait]
impl DirectSubscriber for PanickingSubscriber {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn on_message(&self, _message: &TopicMessage) -> Result<()> {
        panic!("subscriber bug");
    }
}
