//! Penalty escalation, override lists and the appeal workflow.
//!
//! `is_user_allowed` fails open: when penalty storage cannot be read, the user
//! is allowed and the degraded decision is logged and carried in the
//! decision's `reason`. A missed block is preferred over denying everyone
//! during a storage outage.

use std::sync::Arc;

use jobgate_core::{AppError, AppResult, Clock, NonEmptyString};
use jobgate_domain::{
    AccessDecision, PenaltyPolicy, PenaltyRecord, PenaltySeverity, PenaltyType,
    UserPenaltyStatus,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::penalty_ports::{PenaltyRepository, UserList};

mod appeals;
mod lists;

#[cfg(test)]
mod tests;

/// Aggregate counters for administrative dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PenaltyStatistics {
    /// Users on the whitelist.
    pub whitelisted_users: usize,
    /// Users on the blacklist.
    pub blacklisted_users: usize,
    /// Appeals awaiting review.
    pub pending_appeals: usize,
}

/// Application service for user standing and penalties.
#[derive(Clone)]
pub struct PenaltyService {
    repository: Arc<dyn PenaltyRepository>,
    clock: Arc<dyn Clock>,
    policy: PenaltyPolicy,
}

impl PenaltyService {
    /// Creates a new penalty service with a validated policy.
    pub fn new(
        repository: Arc<dyn PenaltyRepository>,
        clock: Arc<dyn Clock>,
        policy: PenaltyPolicy,
    ) -> AppResult<Self> {
        policy.validate()?;

        Ok(Self {
            repository,
            clock,
            policy,
        })
    }

    /// Returns the escalation policy in effect.
    #[must_use]
    pub fn policy(&self) -> &PenaltyPolicy {
        &self.policy
    }

    /// Decides whether a user may act at all.
    ///
    /// Whitelisted users always pass, blacklisted users never do; otherwise an
    /// unexpired temporary block or an active permanent ban denies.
    pub async fn is_user_allowed(&self, user_id: &str) -> AccessDecision {
        match self.load_status(user_id).await {
            Ok(status) => AccessDecision::from_status(&status),
            Err(error) => {
                warn!(
                    user_id,
                    error = %error,
                    "penalty state unavailable, failing open"
                );
                AccessDecision::fail_open(error.to_string())
            }
        }
    }

    /// Issues the next penalty on the escalation ladder.
    ///
    /// The first violation inside the violation window is always a warning.
    /// Later ones become temporary blocks of growing length until the
    /// permanent ban threshold is reached.
    pub async fn apply_penalty(
        &self,
        user_id: &str,
        reason: &str,
        severity: PenaltySeverity,
    ) -> AppResult<PenaltyRecord> {
        let user_id = NonEmptyString::new(user_id)?;
        let reason = NonEmptyString::new(reason)?;

        if self
            .repository
            .is_listed(UserList::Whitelist, user_id.as_str())
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "user '{}' is whitelisted and cannot be penalized",
                user_id.as_str()
            )));
        }

        let now = self.clock.now();
        let window_start = self.policy.violation_window_start(now);
        let history = self.repository.list_penalties(user_id.as_str()).await?;
        let prior: Vec<&PenaltyRecord> = history
            .iter()
            .filter(|record| !record.is_revoked() && record.issued_at >= window_start)
            .collect();
        let prior_blocks = prior
            .iter()
            .filter(|record| record.penalty_type != PenaltyType::Warning)
            .count();

        let step = self.policy.next_step(prior.len(), prior_blocks);
        let record = PenaltyRecord::issue(
            user_id.as_str(),
            step.penalty_type,
            severity,
            reason.as_str(),
            now,
            step.block_seconds,
        )?;
        self.repository.save_penalty(&record).await?;

        info!(
            user_id = %user_id.as_str(),
            penalty_id = %record.id,
            penalty_type = record.penalty_type.as_str(),
            severity = severity.as_str(),
            prior_violations = prior.len(),
            block_seconds = step.block_seconds,
            "penalty applied"
        );

        Ok(record)
    }

    /// Returns the derived penalty view of a user.
    ///
    /// Storage failures yield a clean view and a warning log.
    pub async fn get_user_penalty_status(&self, user_id: &str) -> UserPenaltyStatus {
        match self.load_status(user_id).await {
            Ok(status) => status,
            Err(error) => {
                warn!(
                    user_id,
                    error = %error,
                    "penalty state unavailable, reporting empty history"
                );
                UserPenaltyStatus::derive(user_id, Vec::new(), false, false, self.clock.now())
            }
        }
    }

    /// Returns one penalty.
    pub async fn get_penalty(&self, penalty_id: &str) -> AppResult<PenaltyRecord> {
        self.repository
            .find_penalty(penalty_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("penalty '{penalty_id}' does not exist")))
    }

    /// Revokes a penalty directly, bypassing the appeal workflow.
    ///
    /// Unknown or already revoked penalties are a no-op and return false.
    pub async fn revoke_penalty(
        &self,
        penalty_id: &str,
        revoked_by: &str,
        reason: &str,
    ) -> AppResult<bool> {
        let revoked_by = NonEmptyString::new(revoked_by)?;

        let Some(mut record) = self.repository.find_penalty(penalty_id).await? else {
            return Ok(false);
        };
        if record.is_revoked() {
            return Ok(false);
        }

        record.revoke(revoked_by.as_str(), reason);
        self.repository.save_penalty(&record).await?;

        info!(
            penalty_id,
            user_id = %record.user_id,
            revoked_by = %revoked_by.as_str(),
            "penalty revoked"
        );

        Ok(true)
    }

    /// Returns aggregate counters over lists and appeals.
    pub async fn get_penalty_statistics(&self) -> AppResult<PenaltyStatistics> {
        let whitelisted_users = self
            .repository
            .list_members(UserList::Whitelist)
            .await?
            .len();
        let blacklisted_users = self
            .repository
            .list_members(UserList::Blacklist)
            .await?
            .len();
        let pending_appeals = self
            .repository
            .list_appeals(Some(jobgate_domain::AppealStatus::Pending))
            .await?
            .len();

        Ok(PenaltyStatistics {
            whitelisted_users,
            blacklisted_users,
            pending_appeals,
        })
    }

    async fn load_status(&self, user_id: &str) -> AppResult<UserPenaltyStatus> {
        let now = self.clock.now();

        if self
            .repository
            .is_listed(UserList::Whitelist, user_id)
            .await?
        {
            let history = self.repository.list_penalties(user_id).await?;
            return Ok(UserPenaltyStatus::derive(user_id, history, true, false, now));
        }

        let is_blacklisted = self
            .repository
            .is_listed(UserList::Blacklist, user_id)
            .await?;
        let history = self.repository.list_penalties(user_id).await?;

        Ok(UserPenaltyStatus::derive(
            user_id,
            history,
            false,
            is_blacklisted,
            now,
        ))
    }
}
