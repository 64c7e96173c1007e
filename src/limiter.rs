//! Global request-rate limiter.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Token bucket that paces request starts so consecutive acquisitions are at
/// least `1 / requests_per_second` apart.
///
/// The bucket holds at most one token, which keeps the number of starts in
/// any sliding one-second window at or below the configured rate. Every
/// attempt, retries included, must acquire before sending.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<Bucket>,
    refill_rate: f64,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    cooldown_until: Option<Instant>,
}

impl RateLimiter {
    /// The bucket starts full, so the first acquisition is immediate.
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            state: Mutex::new(Bucket {
                tokens: 1.0,
                last_refill: Instant::now(),
                cooldown_until: None,
            }),
            refill_rate: requests_per_second,
        }
    }

    /// Waits until a token is available and takes it.
    ///
    /// The sleep happens outside the internal lock, so a long wait never
    /// blocks [`penalize`](Self::penalize).
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire().await {
                None => return,
                Some(wait) => sleep(wait).await,
            }
        }
    }

    /// Takes a token if one is available, otherwise returns how long to wait
    /// before trying again.
    async fn try_acquire(&self) -> Option<Duration> {
        let mut bucket = self.state.lock().await;
        let now = Instant::now();

        if let Some(until) = bucket.cooldown_until {
            if now < until {
                return Some(until - now);
            }
            bucket.cooldown_until = None;
        }

        Self::refill(&mut bucket, self.refill_rate);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            let wait = (1.0 - bucket.tokens) / self.refill_rate;
            Some(Duration::from_secs_f64(wait))
        }
    }

    /// Imposed after an HTTP 429: drops any banked token and refuses to hand
    /// out new ones until the cooldown elapses. An already-running longer
    /// cooldown is kept.
    pub async fn penalize(&self, cooldown: Duration) {
        let mut bucket = self.state.lock().await;
        bucket.tokens = 0.0;
        let until = Instant::now() + cooldown;
        match bucket.cooldown_until {
            Some(existing) if existing >= until => {}
            _ => bucket.cooldown_until = Some(until),
        }
    }

    fn refill(bucket: &mut Bucket, rate: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(1.0);
        bucket.last_refill = now;
    }
}
