use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::{dlq::DeadLetterQueue, queue::DurableQueue, topic::Topic},
    models::health::{ComponentHealth, HealthCheckResponse, HealthStatus},
};

pub struct HealthChecker {
    topic: Arc<Topic>,
    queue: Arc<DurableQueue>,
    dead_letter_queue: Option<Arc<DeadLetterQueue>>,
}

impl HealthChecker {
    pub fn new(topic: Arc<Topic>, queue: Arc<DurableQueue>) -> Self {
        let dead_letter_queue = queue.dead_letter_queue().cloned();

        Self {
            topic,
            queue,
            dead_letter_queue,
        }
    }

    pub fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        checks.insert("topic".to_string(), self.check_topic());
        checks.insert("notifications_queue".to_string(), self.check_queue());

        if let Some(dead_letter_queue) = &self.dead_letter_queue {
            checks.insert(
                "dead_letter_queue".to_string(),
                self.check_dead_letter_queue(dead_letter_queue),
            );
        }

        let status = determine_overall_status(&checks);

        HealthCheckResponse {
            status,
            timestamp: Utc::now(),
            checks,
        }
    }

    fn check_topic(&self) -> ComponentHealth {
        let subscriptions = self.topic.subscription_count();

        if !self.topic.is_open() {
            warn!(topic = %self.topic.name(), "Topic is closed");
            return ComponentHealth::unhealthy("Topic is not accepting messages".to_string())
                .with_subscriptions(subscriptions);
        }

        debug!(topic = %self.topic.name(), subscriptions, "Topic health check passed");
        ComponentHealth::healthy().with_subscriptions(subscriptions)
    }

    fn check_queue(&self) -> ComponentHealth {
        let depth = self.queue.depth();
        debug!(queue = %self.queue.name(), visible = depth.visible, in_flight = depth.in_flight, "Queue depth checked");

        ComponentHealth::healthy().with_depth(depth)
    }

    fn check_dead_letter_queue(&self, dead_letter_queue: &DeadLetterQueue) -> ComponentHealth {
        let dead_letters = dead_letter_queue.len();

        if dead_letters > 0 {
            warn!(queue = %dead_letter_queue.name(), dead_letters, "Dead-letter queue holds messages");
            ComponentHealth::degraded(format!("{} undeliverable message(s)", dead_letters))
        } else {
            ComponentHealth::healthy()
        }
    }
}

fn determine_overall_status(checks: &HashMap<String, ComponentHealth>) -> HealthStatus {
    let has_unhealthy = checks
        .values()
        .any(|health| health.status == HealthStatus::Unhealthy);

    let has_degraded = checks
        .values()
        .any(|health| health.status == HealthStatus::Degraded);

    if has_unhealthy {
        HealthStatus::Unhealthy
    } else if has_degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}
