//! In-process counter store.
//!
//! Each key holds its counter and window start in one entry, so all
//! operations on a key run under that entry's shard lock. Expiry is evaluated
//! lazily against the injected clock; `purge_expired` reclaims memory eagerly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jobgate_application::{CounterStore, WindowSnapshot, window_expired};
use jobgate_core::{AppResult, Clock};

#[derive(Debug, Default)]
struct CounterEntry {
    count: u64,
    count_expires_at: Option<DateTime<Utc>>,
    window_start: Option<WindowStartEntry>,
}

#[derive(Debug, Clone, Copy)]
struct WindowStartEntry {
    start: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl CounterEntry {
    fn evict_expired(&mut self, now: DateTime<Utc>) {
        if self
            .count_expires_at
            .is_some_and(|expires_at| expires_at <= now)
        {
            self.count = 0;
            self.count_expires_at = None;
        }

        if self
            .window_start
            .is_some_and(|window_start| window_start.expires_at <= now)
        {
            self.window_start = None;
        }
    }

    fn is_empty(&self) -> bool {
        self.count == 0 && self.window_start.is_none()
    }

    fn increment(&mut self, window_seconds: u32, now: DateTime<Utc>) -> u64 {
        if self.count == 0 {
            self.count_expires_at = Some(now + seconds(window_seconds));
        }
        self.count = self.count.saturating_add(1);
        self.count
    }
}

fn seconds(value: u32) -> Duration {
    Duration::seconds(i64::from(value))
}

/// Counter store kept in process memory.
pub struct InMemoryCounterStore {
    entries: DashMap<String, CounterEntry>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    /// Creates an empty store evaluating expiry against `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drops every expired entry and returns how many keys were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry.evict_expired(now);
            !entry.is_empty()
        });
        before.saturating_sub(self.entries.len())
    }

    /// Returns the number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no key is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get_count(&self, key: &str) -> AppResult<u64> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get_mut(key)
            .map(|mut entry| {
                entry.evict_expired(now);
                entry.count
            })
            .unwrap_or_default())
    }

    async fn increment_count(&self, key: &str, window_seconds: u32) -> AppResult<u64> {
        let now = self.clock.now();
        let mut entry = self.entries.entry(key.to_owned()).or_default();
        entry.evict_expired(now);
        Ok(entry.increment(window_seconds, now))
    }

    async fn get_window_start(&self, key: &str) -> AppResult<Option<DateTime<Utc>>> {
        let now = self.clock.now();
        Ok(self.entries.get_mut(key).and_then(|mut entry| {
            entry.evict_expired(now);
            entry.window_start.map(|window_start| window_start.start)
        }))
    }

    async fn set_window_start(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let mut entry = self.entries.entry(key.to_owned()).or_default();
        entry.window_start = Some(WindowStartEntry {
            start: window_start,
            expires_at: now + seconds(ttl_seconds),
        });
        Ok(())
    }

    async fn reset(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn record_in_window(
        &self,
        key: &str,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> AppResult<WindowSnapshot> {
        let mut entry = self.entries.entry(key.to_owned()).or_default();
        entry.evict_expired(now);

        let window_start = match entry.window_start {
            Some(current) if !window_expired(current.start, window_seconds, now) => current.start,
            _ => {
                entry.count = 0;
                entry.count_expires_at = None;
                entry.window_start = Some(WindowStartEntry {
                    start: now,
                    expires_at: now + seconds(window_seconds),
                });
                now
            }
        };

        let count = entry.increment(window_seconds, now);
        Ok(WindowSnapshot {
            count,
            window_start,
        })
    }
}
