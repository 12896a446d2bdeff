//! Dedupe store — remembers message ids for a fixed window.
//!
//! Expiry is lazy: every check first sweeps out entries older than the
//! TTL. There is no background task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// Default dedupe window.
pub const DEFAULT_DEDUPE_TTL: Duration = Duration::from_secs(60);

/// Time source for the store.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Insert-if-absent set of message ids.
pub trait DedupeStore: Send + Sync {
    /// Returns `true` when the event should be processed: the key is absent
    /// or empty, or it hasn't been seen inside the window (and is now
    /// recorded). Returns `false` for a repeat; the stored time is not
    /// refreshed.
    fn check_and_record(&self, key: Option<&str>) -> bool;

    /// Number of ids currently remembered.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local dedupe store.
///
/// Sweep, lookup and insert happen under one lock, so concurrent requests
/// with the same id record it exactly once.
pub struct InMemoryDedupe {
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryDedupe {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
            seen: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDedupe {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUPE_TTL)
    }
}

impl DedupeStore for InMemoryDedupe {
    fn check_and_record(&self, key: Option<&str>) -> bool {
        let now = self.clock.now();
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        let before = seen.len();
        seen.retain(|_, inserted_at| now.signed_duration_since(*inserted_at) <= self.ttl);
        let evicted = before - seen.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired dedupe entries");
        }

        let Some(key) = key.filter(|k| !k.is_empty()) else {
            return true;
        };

        if seen.contains_key(key) {
            return false;
        }

        seen.insert(key.to_string(), now);
        true
    }

    fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
