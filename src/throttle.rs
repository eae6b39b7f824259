use std::time::Duration;

use async_trait::async_trait;

/// Paces consecutive feed fetches so upstream hosts are not hammered.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Waits the same amount of time after every feed.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
