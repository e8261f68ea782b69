use std::sync::Arc;

use chrono::TimeDelta;
use notification_fanout::{
    clients::{dlq::DeadLetterQueue, queue::DurableQueue, topic::Subscription},
    consumers::{BatchConsumer, email::EmailDispatcher, logger::NotificationLogger},
    models::{
        message::{EmailParams, Envelope, EMAIL_EVENT_TYPE},
        queue::QueueConfig,
        request::NotificationRequest,
        status::BatchReport,
    },
    publisher::NotificationPublisher,
    utils::{poll_once, process_batch, run_queue_consumer},
};
use tokio::{
    sync::watch,
    time::{Duration, advance, sleep, timeout},
};

use crate::support::{
    ChannelSubscriber, Pipeline, ScriptedEmailSender, VISIBILITY_TIMEOUT, email_body, email_settings,
    pipeline,
};

struct Harness {
    pipeline: Pipeline,
    publisher: NotificationPublisher,
    sender: Arc<ScriptedEmailSender>,
    dispatcher: Arc<EmailDispatcher>,
    logged: tokio::sync::mpsc::UnboundedReceiver<notification_fanout::models::message::TopicMessage>,
}

fn harness() -> Harness {
    let pipeline = pipeline(3);
    let (observer, logged) = ChannelSubscriber::new("observer");
    pipeline.topic.subscribe(Subscription::Direct(Arc::new(NotificationLogger)));
    pipeline.topic.subscribe(Subscription::Direct(observer));

    let sender = ScriptedEmailSender::new();
    let dispatcher = Arc::new(EmailDispatcher::new(
        sender.clone(),
        email_settings(),
        Duration::from_secs(5),
    ));

    Harness {
        publisher: NotificationPublisher::new(pipeline.topic.clone()),
        pipeline,
        sender,
        dispatcher,
        logged,
    }
}

fn email_request(recipient: &str, message: &str) -> NotificationRequest {
    NotificationRequest::SendEmail {
        email_destinatary: recipient.to_string(),
        email_message: message.to_string(),
    }
}

async fn deliver_now(harness: &Harness) -> (BatchReport, Vec<u32>) {
    let batch = harness
        .pipeline
        .queue
        .receive_batch(5, Duration::ZERO)
        .await;
    let counts = batch.iter().map(|message| message.receive_count).collect();
    let report = process_batch(&harness.pipeline.queue, harness.dispatcher.as_ref(), batch).await;
    (report, counts)
}

/// Test: Scenario A - a valid request is emailed, acknowledged and logged
#[tokio::test(start_paused = true)]
async fn test_email_request_delivered_end_to_end() {
    let mut harness = harness();

    let receipt = harness
        .publisher
        .publish(email_request("a@x.com", "hi"))
        .await
        .unwrap();

    let logged = timeout(Duration::from_secs(1), harness.logged.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(logged.message_id, receipt.message_id);
    let raw: serde_json::Value = serde_json::from_str(&logged.body).unwrap();
    assert_eq!(raw["eventType"], EMAIL_EVENT_TYPE);
    assert_eq!(
        Envelope::decode(&logged.body).unwrap(),
        Envelope::Email(EmailParams {
            email_destinatary: "a@x.com".to_string(),
            email_message: "hi".to_string(),
        })
    );

    let (report, counts) = deliver_now(&harness).await;

    assert_eq!(counts, vec![1]);
    assert_eq!(
        report,
        BatchReport {
            received: 1,
            acknowledged: 1,
            failed: 0
        }
    );
    let sent = harness.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "a@x.com");
    assert_eq!(sent[0].body, "hi");
    assert_eq!(harness.pipeline.queue.depth().total(), 0);
}

/// Test: Scenario B - a transient failure is retried on the next receive
#[tokio::test(start_paused = true)]
async fn test_transient_failure_succeeds_on_redelivery() {
    let harness = harness();
    harness.sender.fail_for("a@x.com", 1);

    harness
        .publisher
        .publish(email_request("a@x.com", "hi"))
        .await
        .unwrap();

    let (first, counts) = deliver_now(&harness).await;
    assert_eq!(counts, vec![1]);
    assert_eq!(first.failed, 1);
    assert_eq!(harness.pipeline.queue.depth().in_flight, 1);

    advance(VISIBILITY_TIMEOUT + Duration::from_secs(1)).await;

    let (second, counts) = deliver_now(&harness).await;
    assert_eq!(counts, vec![2]);
    assert_eq!(second.acknowledged, 1);

    assert_eq!(harness.sender.attempts().len(), 2);
    assert_eq!(harness.sender.sent().len(), 1);
    assert_eq!(harness.pipeline.queue.depth().total(), 0);
    assert!(harness.pipeline.dead_letter_queue.is_empty());
}

/// Test: Scenario C - a message failing every attempt ends up dead-lettered
#[tokio::test(start_paused = true)]
async fn test_persistent_failure_ends_in_dlq() {
    let harness = harness();
    harness.sender.fail_for("a@x.com", u32::MAX);

    harness
        .publisher
        .publish(email_request("a@x.com", "hi"))
        .await
        .unwrap();

    for attempt in 1..=3 {
        let (report, counts) = deliver_now(&harness).await;
        assert_eq!(counts, vec![attempt]);
        assert_eq!(report.failed, 1);
        advance(VISIBILITY_TIMEOUT + Duration::from_secs(1)).await;
    }

    let (fourth, counts) = deliver_now(&harness).await;
    assert!(counts.is_empty(), "Fourth receive must not reach the consumer");
    assert_eq!(fourth.received, 0);

    let dead_letters = harness.pipeline.dead_letter_queue.entries();
    assert_eq!(dead_letters.len(), 1);
    assert_eq!(
        Envelope::decode(&dead_letters[0].message.body).unwrap(),
        Envelope::Email(EmailParams {
            email_destinatary: "a@x.com".to_string(),
            email_message: "hi".to_string(),
        })
    );
    assert_eq!(harness.sender.attempts().len(), 3);
    assert_eq!(harness.pipeline.queue.depth().total(), 0);
}

/// Test: Scenario D - an incomplete request publishes nothing
#[tokio::test(start_paused = true)]
async fn test_incomplete_request_publishes_nothing() {
    let mut harness = harness();
    let subscriptions = harness.pipeline.topic.subscription_count();

    let parsed = NotificationRequest::from_body(br#"{"emailDestinatary":"a@x.com"}"#, "req-1");
    assert!(parsed.unwrap_err().is_client_error());

    let published = harness.publisher.publish(email_request("a@x.com", "")).await;
    assert!(published.unwrap_err().is_client_error());

    sleep(Duration::from_millis(100)).await;
    assert!(harness.logged.try_recv().is_err());
    assert_eq!(harness.pipeline.queue.depth().total(), 0);
    assert_eq!(harness.pipeline.topic.subscription_count(), subscriptions);
}

/// Test: Each valid request is published exactly once
#[tokio::test(start_paused = true)]
async fn test_each_request_published_once() {
    let mut harness = harness();

    let first = harness.publisher.publish(email_request("a@x.com", "one")).await.unwrap();
    let second = harness.publisher.publish(email_request("b@x.com", "two")).await.unwrap();
    assert_ne!(first.message_id, second.message_id);

    for _ in 0..2 {
        timeout(Duration::from_secs(1), harness.logged.recv())
            .await
            .unwrap()
            .unwrap();
    }
    sleep(Duration::from_millis(100)).await;
    assert!(harness.logged.try_recv().is_err());
    assert_eq!(harness.pipeline.queue.depth().visible, 2);
}

/// Test: poll_once waits for the configured window and delivers a partial batch
#[tokio::test(start_paused = true)]
async fn test_poll_once_uses_configured_batching() {
    let harness = harness();
    harness.publisher.publish(email_request("a@x.com", "one")).await.unwrap();
    harness.publisher.publish(email_request("b@x.com", "two")).await.unwrap();

    let report = poll_once(&harness.pipeline.queue, harness.dispatcher.as_ref()).await;

    assert_eq!(report.received, 2);
    assert_eq!(report.acknowledged, 2);
    assert_eq!(harness.sender.sent().len(), 2);
}

/// Test: The consumer loop drains the queue and stops on shutdown
#[tokio::test(start_paused = true)]
async fn test_queue_consumer_loop() {
    let harness = harness();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer: Arc<dyn BatchConsumer> = harness.dispatcher.clone();

    let worker = tokio::spawn(run_queue_consumer(
        harness.pipeline.queue.clone(),
        consumer,
        shutdown_rx,
    ));

    for i in 0..7 {
        harness
            .publisher
            .publish(email_request(&format!("user{}@x.com", i), "hello"))
            .await
            .unwrap();
    }

    for _ in 0..10 {
        if harness.sender.sent().len() == 7 {
            break;
        }
        sleep(Duration::from_secs(30)).await;
    }

    assert_eq!(harness.sender.sent().len(), 7);
    assert_eq!(harness.pipeline.queue.depth().total(), 0);

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(1), worker)
        .await
        .expect("consumer stops on shutdown")
        .unwrap();
}

/// Test: A mixed batch acknowledges only its successes; failures come back with a higher count
#[tokio::test(start_paused = true)]
async fn test_mixed_batch_leaves_only_failures_queued() {
    let harness = harness();
    harness.sender.fail_for("down@x.com", u32::MAX);

    for recipient in ["a@x.com", "down@x.com", "b@x.com"] {
        harness
            .publisher
            .publish(email_request(recipient, "hello"))
            .await
            .unwrap();
    }
    harness.pipeline.queue.enqueue("{broken".to_string());

    let (report, counts) = deliver_now(&harness).await;
    assert_eq!(counts, vec![1, 1, 1, 1]);
    assert_eq!(
        report,
        BatchReport {
            received: 4,
            acknowledged: 2,
            failed: 2
        }
    );

    let depth = harness.pipeline.queue.depth();
    assert_eq!(depth.visible, 0);
    assert_eq!(depth.in_flight, 2);

    advance(VISIBILITY_TIMEOUT + Duration::from_secs(1)).await;

    let redelivered = harness
        .pipeline
        .queue
        .receive_batch(5, Duration::ZERO)
        .await;
    assert_eq!(redelivered.len(), 2);
    assert!(redelivered.iter().all(|message| message.receive_count == 2));
    assert!(redelivered.iter().any(|message| message.body == "{broken"));
    assert!(redelivered.iter().any(|message| {
        matches!(
            Envelope::decode(&message.body),
            Ok(Envelope::Email(params)) if params.email_destinatary == "down@x.com"
        )
    }));

    let sent: Vec<_> = harness
        .sender
        .sent()
        .into_iter()
        .map(|email| email.recipient)
        .collect();
    assert_eq!(sent, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
}

/// Test: The consumer loop survives a panicking sender and keeps delivering
#[tokio::test(start_paused = true)]
async fn test_queue_consumer_survives_sender_panic() {
    let dead_letter_queue = Arc::new(DeadLetterQueue::new("panic-dlq", TimeDelta::days(10)));
    let queue = Arc::new(
        DurableQueue::new(
            "panic-queue",
            QueueConfig {
                batch_size: 1,
                max_batching_window: Duration::from_secs(1),
                visibility_timeout: VISIBILITY_TIMEOUT,
            },
        )
        .with_dead_letter_queue(dead_letter_queue.clone(), 3),
    );

    let sender = ScriptedEmailSender::new();
    sender.panic_for("bad@x.com");
    let consumer: Arc<dyn BatchConsumer> = Arc::new(EmailDispatcher::new(
        sender.clone(),
        email_settings(),
        Duration::from_secs(5),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(run_queue_consumer(queue.clone(), consumer, shutdown_rx));

    let bad_id = queue.enqueue(email_body("bad@x.com", "boom"));
    queue.enqueue(email_body("good@x.com", "hi"));

    sleep(Duration::from_secs(120)).await;

    assert!(!worker.is_finished(), "Consumer must keep running after a panic");
    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "good@x.com");
    assert!(dead_letter_queue.contains(bad_id));
    assert_eq!(queue.depth().total(), 0);

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(2), worker)
        .await
        .expect("consumer stops on shutdown")
        .unwrap();
}
