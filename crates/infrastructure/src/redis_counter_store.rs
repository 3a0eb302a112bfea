//! Redis-backed counter store.
//!
//! Counters live at `{prefix}:{key}` and window starts, stored as epoch
//! milliseconds, at `{prefix}:{key}:window_start`. Every call refreshes the
//! availability flag. While the flag is down, `is_available` retries a
//! PING at most once per ping interval.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jobgate_application::{CounterStore, WindowSnapshot};
use jobgate_core::{AppError, AppResult};
use redis::{AsyncCommands, Script, aio::MultiplexedConnection};
use tracing::{info, warn};

const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if redis.call('TTL', KEYS[1]) < 0 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

const RECORD_IN_WINDOW_SCRIPT: &str = r#"
local count_key = KEYS[1]
local start_key = KEYS[2]
local window = tonumber(ARGV[1])
local now_ms = tonumber(ARGV[2])

local start = tonumber(redis.call('GET', start_key))
if (not start) or (now_ms - start >= window * 1000) then
  redis.call('DEL', count_key)
  redis.call('SET', start_key, now_ms, 'EX', window)
  start = now_ms
end

local count = redis.call('INCR', count_key)
if redis.call('TTL', count_key) < 0 then
  redis.call('EXPIRE', count_key, window)
end

return {count, start}
"#;

/// Redis implementation of the counter store port.
pub struct RedisCounterStore {
    client: redis::Client,
    key_prefix: String,
    ping_interval: Duration,
    ping_timeout: Duration,
    available: AtomicBool,
    last_ping: Mutex<Option<Instant>>,
}

impl RedisCounterStore {
    /// Creates a store with a configured Redis client and key prefix.
    ///
    /// The store starts out marked available; the first failing call flips it.
    #[must_use]
    pub fn new(
        client: redis::Client,
        key_prefix: impl Into<String>,
        ping_interval: Duration,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            ping_interval,
            ping_timeout,
            available: AtomicBool::new(true),
            last_ping: Mutex::new(None),
        }
    }

    fn count_key(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }

    fn window_start_key(&self, key: &str) -> String {
        format!("{}:{key}:window_start", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        let connection = self.client.get_multiplexed_async_connection().await;
        self.observe(connection.map_err(|error| {
            AppError::Unavailable(format!("failed to connect to redis: {error}"))
        }))
    }

    /// Records the outcome of one call in the availability flag.
    fn observe<T>(&self, result: AppResult<T>) -> AppResult<T> {
        let healthy = result.is_ok();
        let was_available = self.available.swap(healthy, Ordering::Relaxed);

        if was_available && !healthy {
            if let Err(error) = &result {
                warn!(error = %error, "redis counter store marked unavailable");
            }
        } else if !was_available && healthy {
            info!("redis counter store available again");
        }

        result
    }

    fn restart_ping_interval(&self) {
        let mut last_ping = self
            .last_ping
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *last_ping = Some(Instant::now());
    }

    fn ping_due(&self) -> bool {
        let mut last_ping = self
            .last_ping
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();

        match *last_ping {
            Some(previous) if now.duration_since(previous) < self.ping_interval => false,
            _ => {
                *last_ping = Some(now);
                true
            }
        }
    }

    async fn ping(&self) -> AppResult<()> {
        let ping = async {
            let mut connection = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|error| {
                    AppError::Unavailable(format!("failed to connect to redis: {error}"))
                })?;
            let value: String = connection
                .ping()
                .await
                .map_err(|error| AppError::Unavailable(format!("redis ping failed: {error}")))?;

            if value.eq_ignore_ascii_case("pong") {
                Ok(())
            } else {
                Err(AppError::Unavailable(format!(
                    "unexpected redis ping response: {value}"
                )))
            }
        };

        let outcome = tokio::time::timeout(self.ping_timeout, ping)
            .await
            .unwrap_or_else(|_| Err(AppError::Unavailable("redis ping timed out".to_owned())));
        self.observe(outcome)
    }
}

fn command_error(action: &str, error: &redis::RedisError) -> AppError {
    AppError::Unavailable(format!("failed to {action} in redis: {error}"))
}

fn timestamp_from_millis(millis: i64) -> AppResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        AppError::Internal(format!("invalid redis window start timestamp: {millis}"))
    })
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get_count(&self, key: &str) -> AppResult<u64> {
        let mut connection = self.connection().await?;
        let count: Option<u64> = self.observe(
            connection
                .get(self.count_key(key))
                .await
                .map_err(|error| command_error("read counter", &error)),
        )?;
        Ok(count.unwrap_or_default())
    }

    async fn increment_count(&self, key: &str, window_seconds: u32) -> AppResult<u64> {
        let mut connection = self.connection().await?;
        self.observe(
            Script::new(INCREMENT_SCRIPT)
                .key(self.count_key(key))
                .arg(window_seconds)
                .invoke_async(&mut connection)
                .await
                .map_err(|error| command_error("increment counter", &error)),
        )
    }

    async fn get_window_start(&self, key: &str) -> AppResult<Option<DateTime<Utc>>> {
        let mut connection = self.connection().await?;
        let millis: Option<i64> = self.observe(
            connection
                .get(self.window_start_key(key))
                .await
                .map_err(|error| command_error("read window start", &error)),
        )?;
        millis.map(timestamp_from_millis).transpose()
    }

    async fn set_window_start(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        let mut connection = self.connection().await?;
        self.observe(
            connection
                .set_ex::<_, _, ()>(
                    self.window_start_key(key),
                    window_start.timestamp_millis(),
                    u64::from(ttl_seconds.max(1)),
                )
                .await
                .map_err(|error| command_error("store window start", &error)),
        )
    }

    async fn reset(&self, key: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        self.observe(
            connection
                .del::<_, ()>(vec![self.count_key(key), self.window_start_key(key)])
                .await
                .map_err(|error| command_error("reset counter", &error)),
        )
    }

    async fn is_available(&self) -> bool {
        if self.available.load(Ordering::Relaxed) {
            return true;
        }

        if !self.ping_due() {
            return false;
        }

        self.ping().await.is_ok()
    }

    fn mark_unavailable(&self) {
        if self.available.swap(false, Ordering::Relaxed) {
            warn!("redis counter store marked unavailable after a timed out call");
        }
        self.restart_ping_interval();
    }

    async fn record_in_window(
        &self,
        key: &str,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> AppResult<WindowSnapshot> {
        let mut connection = self.connection().await?;
        let (count, start_millis): (u64, i64) = self.observe(
            Script::new(RECORD_IN_WINDOW_SCRIPT)
                .key(self.count_key(key))
                .key(self.window_start_key(key))
                .arg(window_seconds)
                .arg(now.timestamp_millis())
                .invoke_async(&mut connection)
                .await
                .map_err(|error| command_error("record window request", &error)),
        )?;

        Ok(WindowSnapshot {
            count,
            window_start: timestamp_from_millis(start_millis)?,
        })
    }
}
