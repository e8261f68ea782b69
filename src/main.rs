use std::sync::Arc;

use anyhow::{Error, Result};
use notification_fanout::{
    api::{AppState, run_api_server},
    clients::{
        dlq::DeadLetterQueue,
        email::HttpEmailClient,
        health::HealthChecker,
        queue::DurableQueue,
        topic::{Subscription, Topic},
    },
    config::Config,
    consumers::{email::EmailDispatcher, logger::NotificationLogger},
    publisher::NotificationPublisher,
    utils::{run_dead_letter_purge, run_queue_consumer},
};
use tokio::{net::TcpListener, sync::watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dead_letter_queue = Arc::new(DeadLetterQueue::new(
        config.dlq_name.clone(),
        config.dlq_retention(),
    ));
    let queue = Arc::new(
        DurableQueue::new(config.queue_name.clone(), config.queue_config())
            .with_dead_letter_queue(dead_letter_queue.clone(), config.queue_max_receive_count),
    );

    let topic = Arc::new(Topic::new(config.notifications_topic_arn.clone()));
    topic.subscribe(Subscription::Queue(queue.clone()));
    topic.subscribe(Subscription::Direct(Arc::new(NotificationLogger)));

    let dispatcher = Arc::new(EmailDispatcher::new(
        Arc::new(HttpEmailClient::from_config(&config)),
        config.email_settings(),
        config.email_send_timeout(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = tokio::spawn(run_queue_consumer(
        queue.clone(),
        dispatcher,
        shutdown_rx.clone(),
    ));
    let purge = tokio::spawn(run_dead_letter_purge(
        dead_letter_queue,
        config.dlq_purge_interval(),
        shutdown_rx.clone(),
    ));

    let state = Arc::new(AppState {
        publisher: NotificationPublisher::new(topic.clone()),
        health_checker: HealthChecker::new(topic.clone(), queue),
    });

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.server_port)).await?;
    let server = tokio::spawn(run_api_server(listener, state, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    topic.close();
    let _ = shutdown_tx.send(true);

    server.await??;
    consumer.await?;
    purge.await?;

    Ok(())
}
