use jobgate_domain::{AppealRequest, AppealStatus};

use super::*;

impl PenaltyService {
    /// Files an appeal against one of the user's penalties.
    ///
    /// Warnings are not appealable, each penalty takes at most one appeal and
    /// a user may file at most `max_appeals_per_user` appeals in total.
    pub async fn submit_appeal(
        &self,
        penalty_id: &str,
        user_id: &str,
        reason: &str,
    ) -> AppResult<AppealRequest> {
        let reason = NonEmptyString::new(reason)?;
        let penalty = self.get_penalty(penalty_id).await?;

        if penalty.user_id != user_id {
            return Err(AppError::Forbidden(format!(
                "penalty '{penalty_id}' does not belong to user '{user_id}'"
            )));
        }

        if !penalty.penalty_type.is_appealable() {
            return Err(AppError::Validation(format!(
                "penalty '{penalty_id}' is a warning and is not appealable"
            )));
        }

        if self.repository.find_appeal(penalty_id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "penalty '{penalty_id}' has already been appealed"
            )));
        }

        let submitted = self.repository.count_appeals(user_id).await?;
        if submitted >= self.policy.max_appeals_per_user {
            return Err(AppError::Validation(format!(
                "user '{user_id}' has reached the limit of {} appeals",
                self.policy.max_appeals_per_user
            )));
        }

        let now = self.clock.now();
        if !penalty.is_currently_active(now) {
            return Err(AppError::Validation(format!(
                "penalty '{penalty_id}' is no longer active"
            )));
        }

        let appeal = AppealRequest::submit(penalty_id, user_id, reason.as_str(), now);
        self.repository.create_appeal(&appeal).await?;

        info!(penalty_id, user_id, "appeal submitted");
        Ok(appeal)
    }

    /// Approves or denies a pending appeal.
    ///
    /// Approval deactivates the penalty and stamps the reviewer as revoker.
    pub async fn review_appeal(
        &self,
        penalty_id: &str,
        approve: bool,
        reviewer: &str,
        notes: Option<&str>,
    ) -> AppResult<AppealRequest> {
        let reviewer = NonEmptyString::new(reviewer)?;
        let mut appeal = self
            .repository
            .find_appeal(penalty_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no appeal exists for penalty '{penalty_id}'"))
            })?;

        if appeal.status != AppealStatus::Pending {
            return Err(AppError::Conflict(format!(
                "appeal for penalty '{penalty_id}' has already been {}",
                appeal.status.as_str()
            )));
        }

        let mut penalty = self
            .repository
            .find_penalty(penalty_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("penalty '{penalty_id}' no longer exists"))
            })?;

        if approve {
            penalty.revoke(reviewer.as_str(), notes.unwrap_or("appeal approved"));
            self.repository.save_penalty(&penalty).await?;
        }

        appeal.status = if approve {
            AppealStatus::Approved
        } else {
            AppealStatus::Denied
        };
        appeal.reviewed_by = Some(reviewer.as_str().to_owned());
        appeal.review_notes = notes.map(str::to_owned);
        appeal.reviewed_at = Some(self.clock.now());
        self.repository.update_appeal(&appeal).await?;

        info!(
            penalty_id,
            user_id = %appeal.user_id,
            reviewer = %reviewer.as_str(),
            status = appeal.status.as_str(),
            "appeal reviewed"
        );

        Ok(appeal)
    }

    /// Lists appeals, oldest first, optionally filtered by status.
    pub async fn list_appeals(&self, status: Option<AppealStatus>) -> AppResult<Vec<AppealRequest>> {
        let mut appeals = self.repository.list_appeals(status).await?;
        appeals.sort_by_key(|appeal| appeal.submitted_at);
        Ok(appeals)
    }
}
