use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use jobgate_core::AppResult;

/// Keyed counter store backing every quota, cooldown and activity mirror.
///
/// Counters and window starts live under the same key but are separate
/// values; `reset` clears both.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Returns the counter value, zero when absent or expired.
    async fn get_count(&self, key: &str) -> AppResult<u64>;

    /// Atomically increments the counter and returns the new value.
    ///
    /// The expiry is set to `window_seconds` when the increment creates the key.
    async fn increment_count(&self, key: &str, window_seconds: u32) -> AppResult<u64>;

    /// Returns the stored window start, if present and not expired.
    async fn get_window_start(&self, key: &str) -> AppResult<Option<DateTime<Utc>>>;

    /// Stores a window start that expires after `ttl_seconds`.
    async fn set_window_start(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Clears the counter and the window start for a key.
    async fn reset(&self, key: &str) -> AppResult<()>;

    /// Reports whether the store can currently serve requests.
    async fn is_available(&self) -> bool;

    /// Flags the store as down after a call the caller gave up on.
    ///
    /// Stores without an availability flag ignore this.
    fn mark_unavailable(&self) {}

    /// Counts one request in the fixed window that contains `now`.
    ///
    /// Starts a fresh window when none is stored or the stored one is at least
    /// `window_seconds` old. This default composes the primitive operations, so
    /// two concurrent callers can both observe an expired window and reset it;
    /// adapters override it with a single atomic step where the backend allows.
    async fn record_in_window(
        &self,
        key: &str,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> AppResult<WindowSnapshot> {
        let stored_start = self.get_window_start(key).await?;
        let window_start = match stored_start {
            Some(start) if !window_expired(start, window_seconds, now) => start,
            _ => {
                self.reset(key).await?;
                self.set_window_start(key, now, window_seconds).await?;
                now
            }
        };

        let count = self.increment_count(key, window_seconds).await?;
        Ok(WindowSnapshot {
            count,
            window_start,
        })
    }

    /// Reads the window that contains `now` without counting a request.
    async fn peek_window(
        &self,
        key: &str,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> AppResult<WindowSnapshot> {
        match self.get_window_start(key).await? {
            Some(start) if !window_expired(start, window_seconds, now) => Ok(WindowSnapshot {
                count: self.get_count(key).await?,
                window_start: start,
            }),
            _ => Ok(WindowSnapshot {
                count: 0,
                window_start: now,
            }),
        }
    }
}

/// Counter value and window start observed in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Requests counted in the window, including the current one when recording.
    pub count: u64,
    /// Start of the window.
    pub window_start: DateTime<Utc>,
}

/// Returns true once `now` is at least one full window past `window_start`.
#[must_use]
pub fn window_expired(window_start: DateTime<Utc>, window_seconds: u32, now: DateTime<Utc>) -> bool {
    now - window_start >= Duration::seconds(i64::from(window_seconds))
}
