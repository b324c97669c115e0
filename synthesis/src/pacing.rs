//! Fixed minimum spacing between consecutive synthesis calls.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Enforces a minimum delay between consecutive calls.
///
/// The lock is held across the sleep: callers are serialized, never
/// overlapping, which is exactly the pipeline's scheduling model.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// call, then record this one.
    pub async fn pause(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let next_allowed = previous + self.min_interval;
            let now = Instant::now();
            if next_allowed > now {
                tokio::time::sleep(next_allowed - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::Pacer;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn first_call_is_immediate() {
        let pacer = Pacer::new(Duration::from_secs(60));
        let started = Instant::now();
        pacer.pause().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn consecutive_calls_are_spaced() {
        let interval = Duration::from_millis(80);
        let pacer = Pacer::new(interval);
        pacer.pause().await;
        let between = Instant::now();
        pacer.pause().await;
        // Timer granularity can round down slightly; leave a small margin.
        assert!(between.elapsed() >= interval - Duration::from_millis(10));
    }

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let pacer = Pacer::new(Duration::ZERO);
        let started = Instant::now();
        for _ in 0..10 {
            pacer.pause().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
