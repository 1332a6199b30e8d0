use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request counter keyed by client address.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    /// Records a hit for `key`, or returns how long until the oldest hit in
    /// the window expires.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut hits = self.hits.lock();
        // Keys that went quiet are dropped so the map tracks active clients only.
        hits.retain(|_, queue| {
            queue
                .back()
                .is_some_and(|last| now.duration_since(*last) <= self.window)
        });

        let queue = hits.entry(key.to_string()).or_default();
        while queue
            .front()
            .is_some_and(|first| now.duration_since(*first) > self.window)
        {
            queue.pop_front();
        }

        if queue.len() >= self.max_requests {
            let retry_after = queue
                .front()
                .map(|first| self.window.saturating_sub(now.duration_since(*first)))
                .unwrap_or(self.window);
            return Err(retry_after);
        }

        queue.push_back(now);
        Ok(())
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.lock().len()
    }
}
