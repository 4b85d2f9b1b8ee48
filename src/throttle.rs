//! Keyed request throttle with TTL windows.
//!
//! For deployments that expose the access surface externally. Counters live
//! behind a clock abstraction rather than in a bare process-global map, so
//! the store can be swapped for a shared backend and tests can drive time
//! by hand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime};

/// Time source for window accounting.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }
}

struct Window {
    count: u32,
    started: NaiveDateTime,
}

/// Fixed-window counter keyed by caller identity. A key's window resets
/// once its TTL elapses; expired entries are evicted on touch or via
/// `evict_expired`.
pub struct RequestThrottle {
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    counters: Mutex<HashMap<String, Window>>,
}

impl RequestThrottle {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            clock,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request against the key. Returns `false` once the key has
    /// exhausted its window. A poisoned lock denies rather than waving
    /// traffic through.
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = self.clock.now();
        let Ok(mut counters) = self.counters.lock() else {
            return false;
        };

        let window = counters.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now - window.started >= self.window {
            window.count = 0;
            window.started = now;
        }

        if window.count < self.limit {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// Drop every expired window. Returns the number evicted.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let Ok(mut counters) = self.counters.lock() else {
            return 0;
        };
        let before = counters.len();
        counters.retain(|_, w| now - w.started < self.window);
        before - counters.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.counters.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: Mutex<NaiveDateTime>,
    }

    impl ManualClock {
        fn starting_at(now: NaiveDateTime) -> Arc<Self> {
            Arc::new(Self { now: Mutex::new(now) })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> NaiveDateTime {
            *self.now.lock().unwrap()
        }
    }

    fn epoch() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn limit_is_enforced_per_key() {
        let clock = ManualClock::starting_at(epoch());
        let throttle = RequestThrottle::with_clock(2, Duration::minutes(1), clock);

        assert!(throttle.try_acquire("tenant-a"));
        assert!(throttle.try_acquire("tenant-a"));
        assert!(!throttle.try_acquire("tenant-a"));

        // Other keys are unaffected
        assert!(throttle.try_acquire("tenant-b"));
    }

    #[test]
    fn window_resets_after_ttl() {
        let clock = ManualClock::starting_at(epoch());
        let throttle = RequestThrottle::with_clock(1, Duration::minutes(1), clock.clone());

        assert!(throttle.try_acquire("key"));
        assert!(!throttle.try_acquire("key"));

        clock.advance(Duration::seconds(61));
        assert!(throttle.try_acquire("key"));
    }

    #[test]
    fn eviction_drops_only_expired_windows() {
        let clock = ManualClock::starting_at(epoch());
        let throttle = RequestThrottle::with_clock(5, Duration::minutes(1), clock.clone());

        throttle.try_acquire("stale");
        clock.advance(Duration::seconds(45));
        throttle.try_acquire("fresh");
        assert_eq!(throttle.tracked_keys(), 2);

        clock.advance(Duration::seconds(30));
        assert_eq!(throttle.evict_expired(), 1);
        assert_eq!(throttle.tracked_keys(), 1);
    }
}
