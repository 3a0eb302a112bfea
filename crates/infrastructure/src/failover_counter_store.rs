//! Counter store that prefers a shared backend and falls back to process
//! memory.
//!
//! Backend choice is made per call: the shared store's availability is
//! checked first, its call is bounded by a timeout, and any unavailability,
//! timeout or error routes that one call to the in-process store. Nothing is
//! latched, so the shared store takes over again as soon as it answers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobgate_application::{CounterStore, WindowSnapshot};
use jobgate_core::AppResult;
use serde::Serialize;
use tracing::{debug, warn};

use crate::InMemoryCounterStore;

/// Backend serving counter calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterBackend {
    /// Networked store shared by every instance.
    Shared,
    /// Store local to this process.
    InProcess,
}

impl CounterBackend {
    /// Returns a stable label for this backend.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::InProcess => "in_process",
        }
    }
}

/// Counter store with per-call fallback to process memory.
pub struct FailoverCounterStore {
    shared: Option<Arc<dyn CounterStore>>,
    fallback: Arc<InMemoryCounterStore>,
    call_timeout: Duration,
}

impl FailoverCounterStore {
    /// Creates a store routing to `shared` while it answers in time.
    #[must_use]
    pub fn new(
        shared: Arc<dyn CounterStore>,
        fallback: Arc<InMemoryCounterStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            shared: Some(shared),
            fallback,
            call_timeout,
        }
    }

    /// Creates a store without a shared backend.
    #[must_use]
    pub fn in_process_only(fallback: Arc<InMemoryCounterStore>) -> Self {
        Self {
            shared: None,
            fallback,
            call_timeout: Duration::ZERO,
        }
    }

    /// Reports which backend the next call would be routed to.
    pub async fn active_backend(&self) -> CounterBackend {
        match &self.shared {
            Some(shared) if shared.is_available().await => CounterBackend::Shared,
            _ => CounterBackend::InProcess,
        }
    }

    async fn route<T, F, Fut>(&self, operation: &'static str, key: &str, call: F) -> AppResult<T>
    where
        F: Fn(Arc<dyn CounterStore>) -> Fut + Send + Sync,
        Fut: Future<Output = AppResult<T>> + Send,
        T: Send,
    {
        if let Some(shared) = &self.shared {
            if shared.is_available().await {
                match tokio::time::timeout(self.call_timeout, call(Arc::clone(shared))).await {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(error)) => warn!(
                        operation,
                        key,
                        error = %error,
                        "shared counter store failed, using in-process store"
                    ),
                    Err(_) => {
                        shared.mark_unavailable();
                        warn!(
                            operation,
                            key,
                            timeout_ms = self.call_timeout.as_millis(),
                            "shared counter store timed out, using in-process store"
                        );
                    }
                }
            } else {
                debug!(operation, key, "shared counter store unavailable, using in-process store");
            }
        }

        let fallback: Arc<dyn CounterStore> = self.fallback.clone();
        call(fallback).await
    }
}

#[async_trait]
impl CounterStore for FailoverCounterStore {
    async fn get_count(&self, key: &str) -> AppResult<u64> {
        self.route("get_count", key, |store| async move { store.get_count(key).await })
            .await
    }

    async fn increment_count(&self, key: &str, window_seconds: u32) -> AppResult<u64> {
        self.route("increment_count", key, |store| async move {
            store.increment_count(key, window_seconds).await
        })
        .await
    }

    async fn get_window_start(&self, key: &str) -> AppResult<Option<DateTime<Utc>>> {
        self.route("get_window_start", key, |store| async move {
            store.get_window_start(key).await
        })
        .await
    }

    async fn set_window_start(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        self.route("set_window_start", key, |store| async move {
            store.set_window_start(key, window_start, ttl_seconds).await
        })
        .await
    }

    async fn reset(&self, key: &str) -> AppResult<()> {
        self.route("reset", key, |store| async move { store.reset(key).await })
            .await
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
        self.route("record_in_window", key, |store| async move {
            store.record_in_window(key, window_seconds, now).await
        })
        .await
    }

    async fn peek_window(
        &self,
        key: &str,
        window_seconds: u32,
        now: DateTime<Utc>,
    ) -> AppResult<WindowSnapshot> {
        self.route("peek_window", key, |store| async move {
            store.peek_window(key, window_seconds, now).await
        })
        .await
    }
}
