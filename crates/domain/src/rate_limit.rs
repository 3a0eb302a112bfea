//! Fixed-window quota rules and the status derived from one check.
//!
//! The limiter counts requests in fixed windows that reset lazily on the first
//! request after expiry. Bursts straddling a window boundary can admit up to
//! roughly twice the nominal quota; this is a known limitation of the O(1)
//! counter design.

use chrono::{DateTime, Duration, Utc};
use jobgate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// One quota rule: at most `max_requests` per `window_size_seconds` for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    max_requests: u32,
    window_size_seconds: u32,
    identifier: NonEmptyString,
    key_prefix: NonEmptyString,
}

impl RateLimitConfig {
    /// Creates a validated quota rule.
    pub fn new(
        key_prefix: impl Into<String>,
        identifier: impl Into<String>,
        max_requests: u32,
        window_size_seconds: u32,
    ) -> AppResult<Self> {
        if max_requests == 0 {
            return Err(AppError::Validation(
                "rate limit max_requests must be greater than zero".to_owned(),
            ));
        }

        if window_size_seconds == 0 {
            return Err(AppError::Validation(
                "rate limit window_size_seconds must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            max_requests,
            window_size_seconds,
            identifier: NonEmptyString::new(identifier)?,
            key_prefix: NonEmptyString::new(key_prefix)?,
        })
    }

    /// Returns the request ceiling for one window.
    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Returns the window length in seconds.
    #[must_use]
    pub fn window_size_seconds(&self) -> u32 {
        self.window_size_seconds
    }

    /// Returns the identifier the quota is tracked for.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.identifier.as_str()
    }

    /// Returns the namespace prefix of the counter key.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        self.key_prefix.as_str()
    }

    /// Returns the counter key `{prefix}:{identifier}:{window}`.
    ///
    /// The window size is part of the key so two rules with different windows
    /// for the same identifier never share a counter.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.key_prefix.as_str(),
            self.identifier.as_str(),
            self.window_size_seconds
        )
    }

    /// Returns the window length as a duration.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::seconds(i64::from(self.window_size_seconds))
    }
}

/// Result of one quota check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Whether the counted request exceeded the quota.
    pub is_limited: bool,
    /// Requests counted in the current window.
    pub current_requests: u32,
    /// Ceiling for the window.
    pub max_requests: u32,
    /// Seconds until the window resets.
    pub reset_time_seconds: u32,
    /// Start of the current window.
    pub window_start: DateTime<Utc>,
    /// Instant the current window ends.
    pub reset_time: DateTime<Utc>,
}

impl RateLimitStatus {
    /// Builds a status for a counter value observed at `now`.
    #[must_use]
    pub fn from_window(
        config: &RateLimitConfig,
        current_requests: u32,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let reset_time = window_start + config.window();
        let reset_time_seconds = u32::try_from((reset_time - now).num_seconds().max(0))
            .unwrap_or(config.window_size_seconds());

        Self {
            is_limited: current_requests > config.max_requests(),
            current_requests,
            max_requests: config.max_requests(),
            reset_time_seconds,
            window_start,
            reset_time,
        }
    }

    /// Status reported when the counter could not be read.
    #[must_use]
    pub fn fail_open(config: &RateLimitConfig, now: DateTime<Utc>) -> Self {
        Self::from_window(config, 0, now, now)
    }

    /// Returns how many more requests fit into the current window.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.max_requests.saturating_sub(self.current_requests)
    }

    /// Returns true when no further request fits into the current window.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.current_requests >= self.max_requests
    }
}
