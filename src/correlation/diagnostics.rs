//! Rate limiting for per-source diagnostics.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single-token bucket refilled once per interval.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    suppressed: u64,
}

impl TokenBucket {
    fn new(now: Instant) -> Self {
        Self {
            tokens: 1.0,
            last_update: now,
            suppressed: 0,
        }
    }

    fn try_acquire(&mut self, now: Instant, interval: Duration) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed / interval.as_secs_f64()).min(1.0);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Upper bound on tracked keys. Past it, new keys are not logged until a
/// sweep frees room.
pub const MAX_TRACKED_KEYS: usize = 10_000;

/// Decides when a repeated per-key diagnostic may be logged again.
///
/// Owned by a single task; no locking. Buckets idle for a full interval
/// are swept, so the table only holds keys seen within the last interval.
#[derive(Debug)]
pub struct DiagnosticLimiter {
    interval: Duration,
    buckets: HashMap<String, TokenBucket>,
    last_sweep: Option<Instant>,
}

impl DiagnosticLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            buckets: HashMap::new(),
            last_sweep: None,
        }
    }

    /// Stop tracking `key`, e.g. once its source has been identified.
    pub fn forget(&mut self, key: &str) {
        self.buckets.remove(key);
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns `Some(suppressed)` if the diagnostic for `key` should be
    /// emitted now, with the number of occurrences swallowed since the last
    /// emission. Returns `None` while the key is rate limited.
    pub fn check(&mut self, key: &str) -> Option<u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &str, now: Instant) -> Option<u64> {
        let interval = self.interval;

        if !self.buckets.contains_key(key) {
            let sweep_due = self
                .last_sweep
                .map_or(true, |at| now.saturating_duration_since(at) >= interval);
            if sweep_due || self.buckets.len() >= MAX_TRACKED_KEYS {
                self.sweep(now);
            }
            if self.buckets.len() >= MAX_TRACKED_KEYS {
                return None;
            }
        }

        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(now));

        if bucket.try_acquire(now, interval) {
            Some(std::mem::take(&mut bucket.suppressed))
        } else {
            bucket.suppressed += 1;
            None
        }
    }

    /// Drop buckets untouched for at least one interval.
    fn sweep(&mut self, now: Instant) {
        let interval = self.interval;
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_update) < interval);
        self.last_sweep = Some(now);
    }
}
