use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use tokio::{
    sync::Notify,
    time::{Duration, Instant, sleep_until},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    clients::dlq::DeadLetterQueue,
    models::{
        message::QueueMessage,
        queue::{QueueConfig, QueueDepth},
    },
};

// Upper bound for waits computed from absurdly large windows.
const MAX_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct RedrivePolicy {
    max_receive_count: u32,
    dead_letter_queue: Arc<DeadLetterQueue>,
}

struct Entry {
    message: QueueMessage,
    visible_at: Instant,
}

impl Entry {
    fn is_visible(&self, now: Instant) -> bool {
        self.visible_at <= now
    }
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<Entry>,
}

impl QueueState {
    fn visible(&self, now: Instant) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |entry| entry.is_visible(now))
    }

    fn next_visibility(&self, now: Instant) -> Option<Instant> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_visible(now))
            .map(|entry| entry.visible_at)
            .min()
    }

    fn claim(&mut self, now: Instant, max_messages: usize, visibility_timeout: Duration) -> Vec<QueueMessage> {
        let hidden_until = deadline(now, visibility_timeout);

        self.entries
            .iter_mut()
            .filter(|entry| entry.is_visible(now))
            .take(max_messages)
            .map(|entry| {
                entry.message.receive_count += 1;
                entry.visible_at = hidden_until;
                entry.message.clone()
            })
            .collect()
    }
}

fn deadline(from: Instant, after: Duration) -> Instant {
    from.checked_add(after.min(MAX_WAIT)).unwrap_or(from)
}

/// At-least-once buffer between a topic and a batch consumer.
///
/// A received message stays hidden for the visibility timeout. If it is not
/// acknowledged in that window it becomes visible again and its next receive
/// bumps `receive_count`. With a dead-letter queue attached, a message that
/// was already received `max_receive_count` times is moved there instead of
/// being handed out again.
pub struct DurableQueue {
    name: String,
    config: QueueConfig,
    redrive: Option<RedrivePolicy>,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl DurableQueue {
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        let name = name.into();
        info!(
            queue = %name,
            batch_size = config.batch_size,
            batching_window_ms = config.max_batching_window.as_millis() as u64,
            visibility_timeout_ms = config.visibility_timeout.as_millis() as u64,
            "Durable queue created"
        );

        Self {
            name,
            config,
            redrive: None,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    pub fn with_dead_letter_queue(
        mut self,
        dead_letter_queue: Arc<DeadLetterQueue>,
        max_receive_count: u32,
    ) -> Self {
        info!(
            queue = %self.name,
            dead_letter_queue = %dead_letter_queue.name(),
            max_receive_count,
            "Redrive policy attached"
        );

        self.redrive = Some(RedrivePolicy {
            max_receive_count,
            dead_letter_queue,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn dead_letter_queue(&self) -> Option<&Arc<DeadLetterQueue>> {
        self.redrive.as_ref().map(|policy| &policy.dead_letter_queue)
    }

    pub fn enqueue(&self, body: String) -> Uuid {
        let message = QueueMessage::new(body);
        let message_id = message.message_id;

        self.state.lock().entries.push_back(Entry {
            message,
            visible_at: Instant::now(),
        });
        self.notify.notify_waiters();

        debug!(queue = %self.name, message_id = %message_id, "Message enqueued");
        message_id
    }

    /// Receives one batch using the configured batch size and window.
    pub async fn receive(&self) -> Vec<QueueMessage> {
        self.receive_batch(self.config.batch_size, self.config.max_batching_window)
            .await
    }

    /// Waits until `max_messages` are visible or the batching window closes,
    /// then claims up to `max_messages`.
    ///
    /// The window closes `max_wait` after the oldest visible message became
    /// available, and never later than `max_wait` after this call started.
    /// An empty result is a normal outcome.
    pub async fn receive_batch(&self, max_messages: usize, max_wait: Duration) -> Vec<QueueMessage> {
        if max_messages == 0 {
            return Vec::new();
        }

        let call_deadline = deadline(Instant::now(), max_wait);

        loop {
            // Registered before the state check so an enqueue in between still wakes us.
            let notified = self.notify.notified();

            let wake_at = {
                let mut state = self.state.lock();
                let now = Instant::now();

                self.redrive_exhausted(&mut state, now);

                let visible = state.visible(now).count();
                let window_deadline = state
                    .visible(now)
                    .map(|entry| deadline(entry.visible_at, max_wait))
                    .min()
                    .map_or(call_deadline, |oldest| oldest.min(call_deadline));

                if visible >= max_messages || now >= window_deadline {
                    let batch = state.claim(now, max_messages, self.config.visibility_timeout);
                    debug!(queue = %self.name, received = batch.len(), "Batch received");
                    return batch;
                }

                state
                    .next_visibility(now)
                    .map_or(window_deadline, |next| next.min(window_deadline))
            };

            tokio::select! {
                _ = notified => {}
                _ = sleep_until(wake_at) => {}
            }
        }
    }

    /// Removes a message for good. Unknown ids are ignored.
    pub fn acknowledge(&self, message_id: Uuid) -> bool {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|entry| entry.message.message_id != message_id);
        let removed = state.entries.len() < before;
        drop(state);

        if removed {
            debug!(queue = %self.name, message_id = %message_id, "Message acknowledged");
        } else {
            debug!(queue = %self.name, message_id = %message_id, "Acknowledge ignored for unknown message");
        }
        removed
    }

    pub fn depth(&self) -> QueueDepth {
        let state = self.state.lock();
        let now = Instant::now();
        let visible = state.visible(now).count();

        QueueDepth {
            visible,
            in_flight: state.entries.len() - visible,
        }
    }

    fn redrive_exhausted(&self, state: &mut QueueState, now: Instant) {
        let Some(policy) = &self.redrive else {
            return;
        };

        let mut exhausted = Vec::new();
        state.entries.retain(|entry| {
            if entry.is_visible(now) && entry.message.receive_count >= policy.max_receive_count {
                exhausted.push(entry.message.clone());
                false
            } else {
                true
            }
        });

        for message in exhausted {
            let reason = format!(
                "Exceeded maximum receive count of {}",
                policy.max_receive_count
            );
            policy.dead_letter_queue.enqueue(message, reason);
        }
    }
}
