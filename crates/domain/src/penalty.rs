//! Penalty records, user standing and the escalation ladder.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jobgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of penalty issued for a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyType {
    /// Recorded warning without any restriction.
    Warning,
    /// Block that lifts at `expires_at`.
    TemporaryBlock,
    /// Block without expiry.
    PermanentBan,
}

impl PenaltyType {
    /// Returns a stable storage value for this penalty type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::TemporaryBlock => "temporary_block",
            Self::PermanentBan => "permanent_ban",
        }
    }

    /// Warnings carry no restriction and cannot be appealed.
    #[must_use]
    pub fn is_appealable(&self) -> bool {
        !matches!(self, Self::Warning)
    }
}

impl FromStr for PenaltyType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "warning" => Ok(Self::Warning),
            "temporary_block" => Ok(Self::TemporaryBlock),
            "permanent_ban" => Ok(Self::PermanentBan),
            _ => Err(AppError::Validation(format!(
                "unknown penalty type '{value}'"
            ))),
        }
    }
}

/// Severity reported by the caller that detected the violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltySeverity {
    /// Minor violation.
    Low,
    /// Noticeable violation.
    Medium,
    /// Serious violation.
    High,
    /// Abuse that endangers the shared resource.
    Critical,
}

impl PenaltySeverity {
    /// Returns a stable storage value for this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for PenaltySeverity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(AppError::Validation(format!(
                "unknown penalty severity '{value}'"
            ))),
        }
    }
}

/// One issued penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    /// Stable penalty identifier.
    pub id: String,
    /// Penalized user.
    pub user_id: String,
    /// Penalty kind.
    pub penalty_type: PenaltyType,
    /// Reported severity.
    pub severity: PenaltySeverity,
    /// Human-readable reason.
    pub reason: String,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry, present only for temporary blocks.
    pub expires_at: Option<DateTime<Utc>>,
    /// False once revoked or overturned by an appeal.
    pub is_active: bool,
    /// Administrator that revoked the penalty.
    pub revoked_by: Option<String>,
    /// Reason given for the revocation.
    pub revoked_reason: Option<String>,
}

impl PenaltyRecord {
    /// Issues a new active penalty.
    ///
    /// `block_seconds` is required for temporary blocks and ignored otherwise.
    pub fn issue(
        user_id: impl Into<String>,
        penalty_type: PenaltyType,
        severity: PenaltySeverity,
        reason: impl Into<String>,
        issued_at: DateTime<Utc>,
        block_seconds: Option<u64>,
    ) -> AppResult<Self> {
        let expires_at = match penalty_type {
            PenaltyType::TemporaryBlock => {
                let seconds = block_seconds.ok_or_else(|| {
                    AppError::Validation("temporary block requires a duration".to_owned())
                })?;
                let seconds = i64::try_from(seconds).map_err(|error| {
                    AppError::Validation(format!("invalid block duration: {error}"))
                })?;
                let expires_at = Duration::try_seconds(seconds)
                    .and_then(|duration| issued_at.checked_add_signed(duration))
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "block duration of {seconds}s is out of range"
                        ))
                    })?;
                Some(expires_at)
            }
            PenaltyType::Warning | PenaltyType::PermanentBan => None,
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            penalty_type,
            severity,
            reason: reason.into(),
            issued_at,
            expires_at,
            is_active: true,
            revoked_by: None,
            revoked_reason: None,
        })
    }

    /// Returns true while the penalty still restricts the user at `now`.
    #[must_use]
    pub fn is_currently_active(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self
                .expires_at
                .is_none_or(|expires_at| expires_at > now)
    }

    /// Returns true if the penalty was revoked by an administrator or an appeal.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_by.is_some()
    }

    /// Marks the penalty inactive and stamps who revoked it.
    pub fn revoke(&mut self, revoked_by: impl Into<String>, reason: impl Into<String>) {
        self.is_active = false;
        self.revoked_by = Some(revoked_by.into());
        self.revoked_reason = Some(reason.into());
    }
}

/// Upper bound for policy durations: ten years.
pub const MAX_POLICY_SECONDS: u64 = 315_360_000;

/// Escalation and appeal policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyPolicy {
    /// Block length for the first escalation level.
    pub base_timeout_seconds: u64,
    /// Upper bound on any temporary block.
    pub max_timeout_seconds: u64,
    /// Growth factor between escalation levels.
    pub escalation_multiplier: f64,
    /// Violation count at which a permanent ban replaces temporary blocks.
    pub permanent_ban_threshold: u32,
    /// Violations older than this stop counting towards escalation.
    pub violation_window_seconds: u64,
    /// Appeals a single user may submit in total.
    pub max_appeals_per_user: u32,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            base_timeout_seconds: 300,
            max_timeout_seconds: 86_400,
            escalation_multiplier: 2.0,
            permanent_ban_threshold: 5,
            violation_window_seconds: 604_800,
            max_appeals_per_user: 3,
        }
    }
}

/// Outcome of the escalation ladder for one new violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationStep {
    /// Penalty kind to issue.
    pub penalty_type: PenaltyType,
    /// Block length for temporary blocks.
    pub block_seconds: Option<u64>,
}

impl PenaltyPolicy {
    /// Validates the policy values.
    pub fn validate(&self) -> AppResult<()> {
        if self.base_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "base_timeout_seconds must be greater than zero".to_owned(),
            ));
        }

        if self.max_timeout_seconds > MAX_POLICY_SECONDS
            || self.violation_window_seconds > MAX_POLICY_SECONDS
        {
            return Err(AppError::Validation(format!(
                "max_timeout_seconds and violation_window_seconds must not exceed {MAX_POLICY_SECONDS}"
            )));
        }

        if self.max_timeout_seconds < self.base_timeout_seconds {
            return Err(AppError::Validation(
                "max_timeout_seconds must not be lower than base_timeout_seconds".to_owned(),
            ));
        }

        if !self.escalation_multiplier.is_finite() || self.escalation_multiplier < 1.0 {
            return Err(AppError::Validation(
                "escalation_multiplier must be a finite value of at least 1.0".to_owned(),
            ));
        }

        if self.permanent_ban_threshold < 2 {
            return Err(AppError::Validation(
                "permanent_ban_threshold must be at least 2".to_owned(),
            ));
        }

        if self.violation_window_seconds == 0 {
            return Err(AppError::Validation(
                "violation_window_seconds must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }

    /// Block length for an escalation level:
    /// `min(max, base * multiplier ^ level)`.
    #[must_use]
    pub fn timeout_seconds(&self, level: u32) -> u64 {
        let exponent = i32::try_from(level).unwrap_or(i32::MAX);
        let scaled = self.base_timeout_seconds as f64 * self.escalation_multiplier.powi(exponent);
        let capped = scaled.min(self.max_timeout_seconds as f64);

        if capped.is_finite() && capped >= 0.0 {
            capped as u64
        } else {
            self.max_timeout_seconds
        }
    }

    /// Picks the penalty for a new violation.
    ///
    /// `prior_violations` counts the user's unrevoked penalties inside the
    /// violation window and `prior_blocks` the non-warning ones among them.
    #[must_use]
    pub fn next_step(&self, prior_violations: usize, prior_blocks: usize) -> EscalationStep {
        if prior_violations == 0 {
            return EscalationStep {
                penalty_type: PenaltyType::Warning,
                block_seconds: None,
            };
        }

        let violation_number = prior_violations.saturating_add(1);
        if violation_number >= self.permanent_ban_threshold as usize {
            return EscalationStep {
                penalty_type: PenaltyType::PermanentBan,
                block_seconds: None,
            };
        }

        let level = u32::try_from(prior_blocks).unwrap_or(u32::MAX);
        EscalationStep {
            penalty_type: PenaltyType::TemporaryBlock,
            block_seconds: Some(self.timeout_seconds(level)),
        }
    }

    /// Returns the start of the rolling violation window.
    #[must_use]
    pub fn violation_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.violation_window_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Standing of a user towards the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStanding {
    /// No active restriction.
    Normal,
    /// Administrator override that bypasses every penalty.
    Whitelisted,
    /// Blacklisted or holding an active permanent ban.
    PermanentlyBanned,
    /// Holding an unexpired temporary block.
    Blocked,
}

impl UserStanding {
    /// Returns a stable transport value for this standing.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Whitelisted => "whitelisted",
            Self::PermanentlyBanned => "permanently_banned",
            Self::Blocked => "blocked",
        }
    }
}

/// Derived penalty view of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPenaltyStatus {
    /// User the view was derived for.
    pub user_id: String,
    /// Effective standing.
    pub status: UserStanding,
    /// Whether the user is currently denied.
    pub is_blocked: bool,
    /// End of the active temporary block, if any.
    pub blocked_until: Option<DateTime<Utc>>,
    /// Every stored penalty, oldest first.
    pub penalty_history: Vec<PenaltyRecord>,
    /// Number of warnings on record.
    pub warning_count: u32,
    /// Number of temporary blocks on record.
    pub block_count: u32,
    /// Number of penalties on record.
    pub total_violations: u32,
}

impl UserPenaltyStatus {
    /// Recomputes the view from stored penalties and list membership.
    #[must_use]
    pub fn derive(
        user_id: impl Into<String>,
        mut penalty_history: Vec<PenaltyRecord>,
        is_whitelisted: bool,
        is_blacklisted: bool,
        now: DateTime<Utc>,
    ) -> Self {
        penalty_history.sort_by_key(|record| record.issued_at);

        let count_of = |penalty_type: PenaltyType| {
            let count = penalty_history
                .iter()
                .filter(|record| record.penalty_type == penalty_type)
                .count();
            u32::try_from(count).unwrap_or(u32::MAX)
        };
        let warning_count = count_of(PenaltyType::Warning);
        let block_count = count_of(PenaltyType::TemporaryBlock);
        let total_violations = u32::try_from(penalty_history.len()).unwrap_or(u32::MAX);

        let has_active_ban = penalty_history.iter().any(|record| {
            record.penalty_type == PenaltyType::PermanentBan && record.is_currently_active(now)
        });
        let blocked_until = penalty_history
            .iter()
            .filter(|record| {
                record.penalty_type == PenaltyType::TemporaryBlock
                    && record.is_currently_active(now)
            })
            .filter_map(|record| record.expires_at)
            .max();

        let status = if is_whitelisted {
            UserStanding::Whitelisted
        } else if is_blacklisted || has_active_ban {
            UserStanding::PermanentlyBanned
        } else if blocked_until.is_some() {
            UserStanding::Blocked
        } else {
            UserStanding::Normal
        };

        Self {
            user_id: user_id.into(),
            status,
            is_blocked: matches!(
                status,
                UserStanding::PermanentlyBanned | UserStanding::Blocked
            ),
            blocked_until: if status == UserStanding::Blocked {
                blocked_until
            } else {
                None
            },
            penalty_history,
            warning_count,
            block_count,
            total_violations,
        }
    }
}

/// Answer to "may this user act at all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the user may proceed.
    pub allowed: bool,
    /// Standing the decision was based on.
    pub status: UserStanding,
    /// Explanation for denials and degraded decisions.
    pub reason: Option<String>,
    /// End of the active temporary block, if any.
    pub blocked_until: Option<DateTime<Utc>>,
}

impl AccessDecision {
    /// Builds the decision for a derived penalty view.
    #[must_use]
    pub fn from_status(status: &UserPenaltyStatus) -> Self {
        let reason = match status.status {
            UserStanding::Normal | UserStanding::Whitelisted => None,
            UserStanding::PermanentlyBanned => Some("user is permanently banned".to_owned()),
            UserStanding::Blocked => Some(match status.blocked_until {
                Some(until) => format!("user is temporarily blocked until {}", until.to_rfc3339()),
                None => "user is temporarily blocked".to_owned(),
            }),
        };

        Self {
            allowed: !status.is_blocked,
            status: status.status,
            reason,
            blocked_until: status.blocked_until,
        }
    }

    /// Decision returned when penalty storage could not be consulted.
    #[must_use]
    pub fn fail_open(detail: impl Into<String>) -> Self {
        Self {
            allowed: true,
            status: UserStanding::Normal,
            reason: Some(format!(
                "penalty state unavailable, allowing by default: {}",
                detail.into()
            )),
            blocked_until: None,
        }
    }
}

/// Review state of an appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    /// Awaiting review.
    Pending,
    /// Penalty overturned.
    Approved,
    /// Penalty upheld.
    Denied,
}

impl AppealStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl FromStr for AppealStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            _ => Err(AppError::Validation(format!(
                "unknown appeal status '{value}'"
            ))),
        }
    }
}

/// Appeal against one penalty. At most one exists per penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealRequest {
    /// Appealed penalty.
    pub penalty_id: String,
    /// Appealing user.
    pub user_id: String,
    /// User-supplied justification.
    pub reason: String,
    /// Review state.
    pub status: AppealStatus,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Reviewer, once reviewed.
    pub reviewed_by: Option<String>,
    /// Reviewer notes, once reviewed.
    pub review_notes: Option<String>,
    /// Review time, once reviewed.
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl AppealRequest {
    /// Creates a pending appeal.
    #[must_use]
    pub fn submit(
        penalty_id: impl Into<String>,
        user_id: impl Into<String>,
        reason: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            penalty_id: penalty_id.into(),
            user_id: user_id.into(),
            reason: reason.into(),
            status: AppealStatus::Pending,
            submitted_at,
            reviewed_by: None,
            review_notes: None,
            reviewed_at: None,
        }
    }
}
