use chrono::{DateTime, Utc};
use jobgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::RateLimitStatus;

/// Job type used when a trigger names no type or an unknown one.
pub const DEFAULT_JOB_TYPE: &str = "default";

/// Trigger policy for one job category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTypeConfig {
    /// Job category name.
    pub job_type: String,
    /// Triggers one user may issue per window.
    pub max_requests_per_user: u32,
    /// Per-user window length in seconds.
    pub window_size_seconds: u32,
    /// Minimum seconds between two triggers of the same job by the same user.
    pub cooldown_seconds: u32,
    /// Triggers all users together may issue per global window.
    pub global_max_requests: Option<u32>,
    /// Global window length in seconds.
    pub global_window_seconds: Option<u32>,
}

impl JobTypeConfig {
    /// Creates a job type policy without a global ceiling.
    #[must_use]
    pub fn new(
        job_type: impl Into<String>,
        max_requests_per_user: u32,
        window_size_seconds: u32,
        cooldown_seconds: u32,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            max_requests_per_user,
            window_size_seconds,
            cooldown_seconds,
            global_max_requests: None,
            global_window_seconds: None,
        }
    }

    /// Adds a ceiling shared by all users.
    #[must_use]
    pub fn with_global_limit(mut self, max_requests: u32, window_seconds: u32) -> Self {
        self.global_max_requests = Some(max_requests);
        self.global_window_seconds = Some(window_seconds);
        self
    }

    /// Returns the global ceiling when both its halves are configured.
    #[must_use]
    pub fn global_limit(&self) -> Option<(u32, u32)> {
        self.global_max_requests.zip(self.global_window_seconds)
    }

    /// Validates the policy values.
    pub fn validate(&self) -> AppResult<()> {
        if self.job_type.trim().is_empty() {
            return Err(AppError::Validation(
                "job type name must not be empty".to_owned(),
            ));
        }

        if self.max_requests_per_user == 0 || self.window_size_seconds == 0 {
            return Err(AppError::Validation(format!(
                "job type '{}' needs a positive per-user quota and window",
                self.job_type
            )));
        }

        match (self.global_max_requests, self.global_window_seconds) {
            (None, None) => Ok(()),
            (Some(max), Some(window)) if max > 0 && window > 0 => Ok(()),
            (Some(_), Some(_)) => Err(AppError::Validation(format!(
                "job type '{}' needs a positive global quota and window",
                self.job_type
            ))),
            _ => Err(AppError::Validation(format!(
                "job type '{}' must set global_max_requests and global_window_seconds together",
                self.job_type
            ))),
        }
    }

    /// Returns the shipped policy table.
    ///
    /// `deploy` carries the longest cooldown and the tightest quotas.
    #[must_use]
    pub fn default_table() -> Vec<Self> {
        vec![
            Self::new("build", 5, 3600, 60).with_global_limit(50, 3600),
            Self::new("deploy", 3, 3600, 300).with_global_limit(20, 3600),
            Self::new("test", 10, 3600, 30).with_global_limit(100, 3600),
            Self::new(DEFAULT_JOB_TYPE, 10, 3600, 30),
        ]
    }
}

/// Per-(user, job) cooldown state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownStatus {
    /// Whether the job is still cooling down for this user.
    pub in_cooldown: bool,
    /// Last recorded trigger, if any is still remembered.
    pub last_triggered_at: Option<DateTime<Utc>>,
    /// Seconds left until the job may be triggered again.
    pub remaining_seconds: u32,
    /// Instant the cooldown ends.
    pub cooldown_ends_at: Option<DateTime<Utc>>,
}

impl CooldownStatus {
    /// Derives the cooldown state from the last trigger timestamp.
    #[must_use]
    pub fn evaluate(
        last_triggered_at: Option<DateTime<Utc>>,
        cooldown_seconds: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let Some(last) = last_triggered_at else {
            return Self::clear();
        };

        let ends_at = last + chrono::Duration::seconds(i64::from(cooldown_seconds));
        if ends_at <= now {
            return Self {
                in_cooldown: false,
                last_triggered_at: Some(last),
                remaining_seconds: 0,
                cooldown_ends_at: Some(ends_at),
            };
        }

        let remaining_ms = (ends_at - now).num_milliseconds();
        let remaining = (remaining_ms.saturating_add(999) / 1000).max(1);
        Self {
            in_cooldown: true,
            last_triggered_at: Some(last),
            remaining_seconds: u32::try_from(remaining).unwrap_or(cooldown_seconds),
            cooldown_ends_at: Some(ends_at),
        }
    }

    /// State with no remembered trigger.
    #[must_use]
    pub fn clear() -> Self {
        Self {
            in_cooldown: false,
            last_triggered_at: None,
            remaining_seconds: 0,
            cooldown_ends_at: None,
        }
    }
}

/// Composite decision for one job trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTriggerStatus {
    /// Whether the trigger may proceed.
    pub can_proceed: bool,
    /// Job type whose policy was applied.
    pub job_type: String,
    /// Per-user quota state.
    pub user_limit: RateLimitStatus,
    /// Global quota state, when the job type has one.
    pub global_limit: Option<RateLimitStatus>,
    /// Cooldown state for the (user, job) pair.
    pub cooldown: CooldownStatus,
    /// Reason of the first failing check.
    pub block_reason: Option<String>,
}
