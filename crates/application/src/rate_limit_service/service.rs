use std::sync::Arc;

use jobgate_core::{AppResult, Clock};
use jobgate_domain::{RateLimitConfig, RateLimitStatus};
use tracing::warn;

use super::ports::CounterStore;

/// Application service for fixed-window rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Counts one request against the quota and reports whether it is over.
    ///
    /// The n-th request of a window with `max_requests = n` is still admitted;
    /// the (n+1)-th is limited. Storage failures fail open.
    pub async fn check_limit(&self, config: &RateLimitConfig) -> RateLimitStatus {
        let now = self.clock.now();
        match self.try_check_limit(config).await {
            Ok(status) => status,
            Err(error) => {
                warn!(
                    key = %config.storage_key(),
                    error = %error,
                    "rate limit check failed, allowing request"
                );
                RateLimitStatus::fail_open(config, now)
            }
        }
    }

    /// Reads the quota state without counting a request.
    pub async fn check_limit_only(&self, config: &RateLimitConfig) -> RateLimitStatus {
        let now = self.clock.now();
        match self.try_check_limit_only(config).await {
            Ok(status) => status,
            Err(error) => {
                warn!(
                    key = %config.storage_key(),
                    error = %error,
                    "rate limit status read failed, reporting empty window"
                );
                RateLimitStatus::fail_open(config, now)
            }
        }
    }

    /// Clears the counter and window start of a quota.
    pub async fn reset_limit(&self, config: &RateLimitConfig) {
        if let Err(error) = self.store.reset(config.storage_key().as_str()).await {
            warn!(
                key = %config.storage_key(),
                error = %error,
                "failed to reset rate limit"
            );
        }
    }

    async fn try_check_limit(&self, config: &RateLimitConfig) -> AppResult<RateLimitStatus> {
        let now = self.clock.now();
        let snapshot = self
            .store
            .record_in_window(
                config.storage_key().as_str(),
                config.window_size_seconds(),
                now,
            )
            .await?;

        Ok(RateLimitStatus::from_window(
            config,
            saturating_count(snapshot.count),
            snapshot.window_start,
            now,
        ))
    }

    async fn try_check_limit_only(&self, config: &RateLimitConfig) -> AppResult<RateLimitStatus> {
        let now = self.clock.now();
        let snapshot = self
            .store
            .peek_window(
                config.storage_key().as_str(),
                config.window_size_seconds(),
                now,
            )
            .await?;

        Ok(RateLimitStatus::from_window(
            config,
            saturating_count(snapshot.count),
            snapshot.window_start,
            now,
        ))
    }
}

fn saturating_count(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
