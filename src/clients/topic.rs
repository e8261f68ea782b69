use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures_util::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::queue::DurableQueue,
    error::NotificationError,
    models::message::{Envelope, PublishReceipt, TopicMessage},
};

/// A fire-and-forget subscriber attached straight to a topic.
///
/// Errors returned here are logged by the topic and otherwise dropped.
#[async_trait]
pub trait DirectSubscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn on_message(&self, message: &TopicMessage) -> Result<()>;
}

#[derive(Clone)]
pub enum Subscription {
    Queue(Arc<DurableQueue>),
    Direct(Arc<dyn DirectSubscriber>),
}

impl Subscription {
    fn target(&self) -> &str {
        match self {
            Subscription::Queue(queue) => queue.name(),
            Subscription::Direct(subscriber) => subscriber.name(),
        }
    }
}

pub struct Topic {
    name: String,
    subscriptions: RwLock<Vec<Subscription>>,
    open: AtomicBool,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        info!(topic = %name, "Topic created");

        Self {
            name,
            subscriptions: RwLock::new(Vec::new()),
            open: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self, subscription: Subscription) {
        info!(topic = %self.name, target = %subscription.target(), "Subscription added");
        self.subscriptions.write().push(subscription);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Stops accepting publishes. Deliveries already handed out are unaffected.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            info!(topic = %self.name, "Topic closed");
        }
    }

    pub async fn publish(&self, envelope: &Envelope) -> Result<PublishReceipt, NotificationError> {
        let body = envelope.encode()?;
        self.publish_raw(body).await
    }

    /// Fans an already serialized body out to every current subscription.
    ///
    /// Queue subscriptions receive the body synchronously; direct subscribers
    /// run on their own tasks, so a slow or failing subscriber never affects
    /// the publish result.
    pub async fn publish_raw(&self, body: String) -> Result<PublishReceipt, NotificationError> {
        if !self.is_open() {
            return Err(NotificationError::Publish(format!(
                "Topic {} is not accepting messages",
                self.name
            )));
        }

        let message = TopicMessage {
            message_id: Uuid::new_v4(),
            topic: self.name.clone(),
            body,
            published_at: Utc::now(),
        };

        let subscriptions = self.subscriptions.read().clone();

        for subscription in subscriptions {
            match subscription {
                Subscription::Queue(queue) => {
                    queue.enqueue(message.body.clone());
                }
                Subscription::Direct(subscriber) => {
                    let message = message.clone();
                    tokio::spawn(async move {
                        deliver_direct(subscriber, message).await;
                    });
                }
            }
        }

        debug!(topic = %self.name, message_id = %message.message_id, "Message published");

        Ok(PublishReceipt {
            message_id: message.message_id,
        })
    }
}

async fn deliver_direct(subscriber: Arc<dyn DirectSubscriber>, message: TopicMessage) {
    let outcome = std::panic::AssertUnwindSafe(subscriber.on_message(&message))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(
            subscriber = %subscriber.name(),
            message_id = %message.message_id,
            error = %e,
            "Direct subscriber failed, message dropped"
        ),
        Err(_) => warn!(
            subscriber = %subscriber.name(),
            message_id = %message.message_id,
            "Direct subscriber panicked, message dropped"
        ),
    }
}
