use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jobgate_core::{AppResult, Clock, NonEmptyString};
use jobgate_domain::{RequestPattern, SuspiciousActivityResult, UserActivityMetrics};
use serde::Serialize;
use tracing::{debug, warn};

use crate::CounterStore;

use super::{ActivityMonitorConfig, analyze_history};

const ACTIVITY_PREFIX: &str = "activity";

/// Aggregate counters over all tracked users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityStatistics {
    /// Users with metrics.
    pub tracked_users: usize,
    /// Users whose latest score reached the suspicious threshold.
    pub suspicious_users: usize,
    /// Requests recorded since tracking started.
    pub total_requests: u64,
    /// Events currently held in histories.
    pub buffered_events: usize,
}

/// Application service recording and scoring user activity.
#[derive(Clone)]
pub struct ActivityMonitorService {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    config: ActivityMonitorConfig,
    histories: Arc<DashMap<String, VecDeque<RequestPattern>>>,
    metrics: Arc<DashMap<String, UserActivityMetrics>>,
}

impl ActivityMonitorService {
    /// Creates a monitor with a validated configuration.
    pub fn new(
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
        config: ActivityMonitorConfig,
    ) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            store,
            clock,
            config,
            histories: Arc::new(DashMap::new()),
            metrics: Arc::new(DashMap::new()),
        })
    }

    /// Returns the configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ActivityMonitorConfig {
        &self.config
    }

    /// Appends one event to the user's history and re-analyses the user.
    ///
    /// The event is mirrored to the counter store; a failing store only costs
    /// the mirror and is logged.
    pub async fn record_request(
        &self,
        pattern: RequestPattern,
    ) -> AppResult<SuspiciousActivityResult> {
        let user_id = NonEmptyString::new(pattern.user_id.as_str())?;
        let now = self.clock.now();
        let timestamp = pattern.timestamp;

        let snapshot: Vec<RequestPattern> = {
            let mut history = self
                .histories
                .entry(user_id.as_str().to_owned())
                .or_default();
            history.push_back(pattern);
            self.prune_history(&mut history, now);
            history.iter().cloned().collect()
        };

        self.mirror(user_id.as_str()).await;

        let analysis = analyze_history(user_id.as_str(), &snapshot, &self.config, now);
        self.metrics
            .entry(user_id.as_str().to_owned())
            .or_insert_with(|| UserActivityMetrics::start(user_id.as_str(), timestamp))
            .observe(timestamp, &analysis);

        if analysis.is_suspicious {
            let flags: Vec<&str> = analysis.flags.iter().map(|flag| flag.label()).collect();
            warn!(
                user_id = %user_id.as_str(),
                suspicion_score = analysis.suspicion_score,
                flags = ?flags,
                "suspicious activity detected"
            );
        }

        Ok(analysis)
    }

    /// Scores the user's current history without recording anything.
    #[must_use]
    pub fn analyze_activity(&self, user_id: &str) -> SuspiciousActivityResult {
        let now = self.clock.now();
        let snapshot = self.current_history(user_id, now);
        analyze_history(user_id, &snapshot, &self.config, now)
    }

    /// Returns the user's retained events, oldest first.
    #[must_use]
    pub fn get_user_history(&self, user_id: &str) -> Vec<RequestPattern> {
        self.current_history(user_id, self.clock.now())
    }

    /// Returns the accumulated summary of a user.
    #[must_use]
    pub fn get_user_metrics(&self, user_id: &str) -> Option<UserActivityMetrics> {
        self.metrics.get(user_id).map(|metrics| metrics.value().clone())
    }

    /// Lists users whose latest score is at least `min_score`, highest first.
    ///
    /// Without `min_score` the suspicious threshold applies.
    #[must_use]
    pub fn get_suspicious_users(&self, min_score: Option<u32>) -> Vec<UserActivityMetrics> {
        let min_score = min_score.unwrap_or(self.config.suspicious_score_threshold);
        let mut users: Vec<UserActivityMetrics> = self
            .metrics
            .iter()
            .filter(|entry| entry.suspicion_score >= min_score)
            .map(|entry| entry.value().clone())
            .collect();

        users.sort_by(|left, right| {
            right
                .suspicion_score
                .cmp(&left.suspicion_score)
                .then_with(|| left.user_id.cmp(&right.user_id))
        });
        users
    }

    /// Returns aggregate counters over all tracked users.
    #[must_use]
    pub fn get_activity_statistics(&self) -> ActivityStatistics {
        let mut statistics = ActivityStatistics {
            tracked_users: 0,
            suspicious_users: 0,
            total_requests: 0,
            buffered_events: 0,
        };

        for entry in self.metrics.iter() {
            statistics.tracked_users += 1;
            statistics.total_requests = statistics
                .total_requests
                .saturating_add(entry.total_requests);
            if entry.suspicion_score >= self.config.suspicious_score_threshold {
                statistics.suspicious_users += 1;
            }
        }
        statistics.buffered_events = self.histories.iter().map(|entry| entry.len()).sum();

        statistics
    }

    /// Forgets everything recorded for a user. Returns false if nothing was
    /// tracked.
    pub async fn clear_user_activity(&self, user_id: &str) -> bool {
        let had_history = self.histories.remove(user_id).is_some();
        let had_metrics = self.metrics.remove(user_id).is_some();

        let key = activity_key(user_id);
        if let Err(error) = self.store.reset(key.as_str()).await {
            warn!(user_id, error = %error, "activity counter reset failed");
        }

        had_history || had_metrics
    }

    /// Drops histories and metrics without activity inside the history
    /// window. Returns the number of users forgotten.
    pub fn prune_inactive(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.history_window();

        self.histories.retain(|_, history| {
            history
                .back()
                .is_some_and(|pattern| pattern.timestamp >= cutoff)
        });

        let before = self.metrics.len();
        self.metrics
            .retain(|_, metrics| metrics.last_activity >= cutoff);
        let pruned = before.saturating_sub(self.metrics.len());

        if pruned > 0 {
            debug!(pruned, "inactive activity records pruned");
        }
        pruned
    }

    fn current_history(&self, user_id: &str, now: DateTime<Utc>) -> Vec<RequestPattern> {
        match self.histories.get_mut(user_id) {
            Some(mut history) => {
                self.prune_history(&mut history, now);
                history.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    fn prune_history(&self, history: &mut VecDeque<RequestPattern>, now: DateTime<Utc>) {
        let cutoff = now - self.history_window();
        history.retain(|pattern| pattern.timestamp >= cutoff);
        while history.len() > self.config.max_history {
            history.pop_front();
        }
    }

    fn history_window(&self) -> Duration {
        Duration::seconds(i64::from(self.config.history_window_seconds))
    }

    async fn mirror(&self, user_id: &str) {
        let key = activity_key(user_id);
        if let Err(error) = self
            .store
            .increment_count(key.as_str(), self.config.history_window_seconds)
            .await
        {
            warn!(user_id, error = %error, "activity mirror to counter store failed");
        }
    }
}

fn activity_key(user_id: &str) -> String {
    format!("{ACTIVITY_PREFIX}:{user_id}")
}
