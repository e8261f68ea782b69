use std::sync::Arc;

use chrono::Utc;
use tokio::{
    sync::watch,
    time::{Duration, interval},
};
use tracing::{debug, info, warn};

use crate::{
    clients::{dlq::DeadLetterQueue, queue::DurableQueue},
    consumers::BatchConsumer,
    models::{message::QueueMessage, status::BatchReport},
};

/// Hands a received batch to the consumer and acknowledges exactly the
/// messages it delivered. Failed messages are left to the visibility timeout.
pub async fn process_batch<C>(queue: &DurableQueue, consumer: &C, batch: Vec<QueueMessage>) -> BatchReport
where
    C: BatchConsumer + ?Sized,
{
    let mut report = BatchReport {
        received: batch.len(),
        ..Default::default()
    };

    if batch.is_empty() {
        return report;
    }

    let outcomes = consumer.on_batch(&batch).await;

    for outcome in outcomes {
        if outcome.is_delivered() {
            queue.acknowledge(outcome.message_id);
            report.acknowledged += 1;
        } else {
            report.failed += 1;
        }
    }

    info!(
        queue = %queue.name(),
        received = report.received,
        acknowledged = report.acknowledged,
        failed = report.failed,
        "Batch processed"
    );

    report
}

/// Receives one batch with the queue's configured size and window and
/// processes it.
pub async fn poll_once<C>(queue: &DurableQueue, consumer: &C) -> BatchReport
where
    C: BatchConsumer + ?Sized,
{
    let batch = queue.receive().await;
    process_batch(queue, consumer, batch).await
}

pub async fn run_queue_consumer(
    queue: Arc<DurableQueue>,
    consumer: Arc<dyn BatchConsumer>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(queue = %queue.name(), "Queue consumer started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            report = poll_once(&queue, consumer.as_ref()) => {
                if report.received == 0 {
                    debug!(queue = %queue.name(), "Batching window closed with no messages");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    warn!(queue = %queue.name(), "Shutdown channel dropped, stopping consumer");
                }
                break;
            }
        }
    }

    info!(queue = %queue.name(), "Queue consumer stopped");
}

pub async fn run_dead_letter_purge(
    dead_letter_queue: Arc<DeadLetterQueue>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                dead_letter_queue.purge_expired(Utc::now());
            }
            _ = shutdown.changed() => break,
        }
    }

    debug!(queue = %dead_letter_queue.name(), "Dead-letter purge loop stopped");
}
