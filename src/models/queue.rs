use serde::Serialize;
use tokio::time::Duration;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub batch_size: usize,
    pub max_batching_window: Duration,
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_batching_window: Duration::from_secs(60),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub visible: usize,
    pub in_flight: usize,
}

impl QueueDepth {
    pub fn total(&self) -> usize {
        self.visible + self.in_flight
    }
}
