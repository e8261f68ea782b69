use anyhow::{Error, Result, anyhow};
use chrono::TimeDelta;
use dotenvy::dotenv;
use serde::Deserialize;
use tokio::time::Duration;

use crate::models::{email::EmailSettings, queue::QueueConfig};

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_topic_arn")]
    pub notifications_topic_arn: String,
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    #[serde(default = "default_dlq_name")]
    pub dlq_name: String,

    #[serde(default = "default_batch_size")]
    pub queue_batch_size: usize,
    #[serde(default = "default_batching_window_secs")]
    pub queue_max_batching_window_secs: u64,
    #[serde(default = "default_visibility_timeout_secs")]
    pub queue_visibility_timeout_secs: u64,
    #[serde(default = "default_max_receive_count")]
    pub queue_max_receive_count: u32,

    #[serde(default = "default_dlq_retention_days")]
    pub dlq_retention_days: i64,
    #[serde(default = "default_dlq_purge_interval_secs")]
    pub dlq_purge_interval_secs: u64,

    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_sender: String,
    pub email_reply_to: String,
    #[serde(default = "default_email_subject")]
    pub email_subject: String,
    #[serde(default = "default_email_send_timeout_ms")]
    pub email_send_timeout_ms: u64,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

fn default_topic_arn() -> String {
    "notifications-topic".to_string()
}

fn default_queue_name() -> String {
    "NotificationsQueue".to_string()
}

fn default_dlq_name() -> String {
    "NotificationsQueueDlq".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_batching_window_secs() -> u64 {
    60
}

fn default_visibility_timeout_secs() -> u64 {
    30
}

fn default_max_receive_count() -> u32 {
    3
}

fn default_dlq_retention_days() -> i64 {
    10
}

fn default_dlq_purge_interval_secs() -> u64 {
    3600
}

fn default_email_subject() -> String {
    "Notification".to_string()
}

fn default_email_send_timeout_ms() -> u64 {
    5000
}

fn default_server_port() -> u16 {
    3000
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.queue_batch_size == 0 {
            return Err(anyhow!("QUEUE_BATCH_SIZE must be at least 1"));
        }
        if self.queue_visibility_timeout_secs == 0 {
            return Err(anyhow!("QUEUE_VISIBILITY_TIMEOUT_SECS must be at least 1"));
        }
        if self.queue_max_receive_count == 0 {
            return Err(anyhow!("QUEUE_MAX_RECEIVE_COUNT must be at least 1"));
        }
        if self.dlq_retention_days <= 0 {
            return Err(anyhow!("DLQ_RETENTION_DAYS must be positive"));
        }
        if self.email_send_timeout_ms == 0 {
            return Err(anyhow!("EMAIL_SEND_TIMEOUT_MS must be at least 1"));
        }
        Ok(())
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            batch_size: self.queue_batch_size,
            max_batching_window: Duration::from_secs(self.queue_max_batching_window_secs),
            visibility_timeout: Duration::from_secs(self.queue_visibility_timeout_secs),
        }
    }

    pub fn dlq_retention(&self) -> TimeDelta {
        TimeDelta::try_days(self.dlq_retention_days).unwrap_or(TimeDelta::MAX)
    }

    pub fn dlq_purge_interval(&self) -> Duration {
        Duration::from_secs(self.dlq_purge_interval_secs.max(1))
    }

    pub fn email_settings(&self) -> EmailSettings {
        EmailSettings {
            subject: self.email_subject.clone(),
            sender: self.email_sender.clone(),
            reply_to: self.email_reply_to.clone(),
        }
    }

    pub fn email_send_timeout(&self) -> Duration {
        Duration::from_millis(self.email_send_timeout_ms)
    }
}
