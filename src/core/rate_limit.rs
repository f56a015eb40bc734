//! Global minimum spacing between proxied requests

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Please wait {0} seconds before retrying.")]
    Exceeded(u64),
}

pub struct RateLimiter {
    interval: Option<Duration>,
    wait: bool,
    /// Held across the wait so queued requests are spaced one interval apart
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Option<Duration>, wait: bool) -> Self {
        Self {
            interval: interval.filter(|d| !d.is_zero()),
            wait,
            last_request: Mutex::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Admit a request, sleeping or rejecting when it arrives too early
    pub async fn check(&self) -> Result<(), RateLimitError> {
        let Some(interval) = self.interval else {
            return Ok(());
        };

        let mut last = self.last_request.lock().await;
        let now = Instant::now();

        if let Some(previous) = *last {
            let elapsed = now.duration_since(previous);
            if elapsed < interval {
                let remaining = interval - elapsed;
                if !self.wait {
                    let seconds = remaining.as_secs_f64().ceil() as u64;
                    warn!("Rate limit exceeded, {}s remaining", seconds);
                    return Err(RateLimitError::Exceeded(seconds.max(1)));
                }
                info!("Rate limit reached, waiting {:.1}s", remaining.as_secs_f64());
                tokio::time::sleep(remaining).await;
            }
        }

        *last = Some(Instant::now());
        Ok(())
    }
}
