/// Minimum spacing between accepted inputs

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last_accepted: Option<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_accepted: None,
        }
    }

    /// Sleep out the rest of the window, then record this acceptance
    ///
    /// The first call never waits.
    pub async fn accept(&mut self) -> Instant {
        if let Some(last) = self.last_accepted {
            sleep_until(last + self.delay).await;
        }

        let now = Instant::now();
        self.last_accepted = Some(now);
        now
    }
}
