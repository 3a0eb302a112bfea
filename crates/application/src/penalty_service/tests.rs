use std::sync::Arc;

use chrono::Duration;

use jobgate_core::{AppError, AppResult, ManualClock};
use jobgate_domain::{
    AppealStatus, PenaltyPolicy, PenaltyRecord, PenaltySeverity, PenaltyType, UserStanding,
};

use crate::test_support::{
    FakePenaltyRepository, SwitchablePenaltyRepository, UnavailablePenaltyRepository, manual_clock,
};

use super::PenaltyService;

fn service() -> (PenaltyService, Arc<ManualClock>) {
    let clock = manual_clock();
    let service = PenaltyService::new(
        Arc::new(FakePenaltyRepository::default()),
        clock.clone(),
        PenaltyPolicy::default(),
    )
    .unwrap_or_else(|_| unreachable!());
    (service, clock)
}

async fn penalize(service: &PenaltyService, user_id: &str) -> PenaltyRecord {
    service
        .apply_penalty(user_id, "flooding job triggers", PenaltySeverity::Medium)
        .await
        .unwrap_or_else(|_| unreachable!())
}

/// Issues a warning followed by a temporary block.
async fn blocked_user(service: &PenaltyService, user_id: &str) -> PenaltyRecord {
    penalize(service, user_id).await;
    penalize(service, user_id).await
}

#[tokio::test]
async fn first_violation_is_a_warning_even_when_critical() {
    let (service, _) = service();

    let record = service
        .apply_penalty("U1", "spam", PenaltySeverity::Critical)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(record.penalty_type, PenaltyType::Warning);
    assert_eq!(record.expires_at, None);
    assert!(service.is_user_allowed("U1").await.allowed);
}

#[tokio::test]
async fn repeated_violations_escalate_to_permanent_ban() {
    let (service, _) = service();

    let types: Vec<PenaltyType> = {
        let mut types = Vec::new();
        for _ in 0..5 {
            types.push(penalize(&service, "U1").await.penalty_type);
        }
        types
    };

    assert_eq!(
        types,
        vec![
            PenaltyType::Warning,
            PenaltyType::TemporaryBlock,
            PenaltyType::TemporaryBlock,
            PenaltyType::TemporaryBlock,
            PenaltyType::PermanentBan,
        ]
    );

    let decision = service.is_user_allowed("U1").await;
    assert!(!decision.allowed);
    assert_eq!(decision.status, UserStanding::PermanentlyBanned);
}

#[tokio::test]
async fn block_durations_grow_with_each_level() {
    let (service, _) = service();

    penalize(&service, "U1").await;
    let durations: Vec<i64> = {
        let mut durations = Vec::new();
        for _ in 0..3 {
            let record = penalize(&service, "U1").await;
            let expires_at = record.expires_at.unwrap_or_else(|| unreachable!());
            durations.push((expires_at - record.issued_at).num_seconds());
        }
        durations
    };

    assert_eq!(durations, vec![300, 600, 1200]);
}

#[tokio::test]
async fn temporary_block_lifts_after_expiry() {
    let (service, clock) = service();
    blocked_user(&service, "U1").await;

    let blocked = service.is_user_allowed("U1").await;
    assert!(!blocked.allowed);
    assert_eq!(blocked.status, UserStanding::Blocked);

    clock.advance(Duration::seconds(301));
    let released = service.is_user_allowed("U1").await;
    assert!(released.allowed);
    assert_eq!(released.status, UserStanding::Normal);
}

#[tokio::test]
async fn violations_outside_window_age_out() {
    let (service, clock) = service();
    blocked_user(&service, "U1").await;

    clock.advance(Duration::seconds(604_801));

    let record = penalize(&service, "U1").await;
    assert_eq!(record.penalty_type, PenaltyType::Warning);
}

#[tokio::test]
async fn whitelisted_user_cannot_be_penalized_and_always_passes() {
    let (service, _) = service();
    blocked_user(&service, "U1").await;

    service
        .add_to_whitelist("U1")
        .await
        .unwrap_or_else(|_| unreachable!());

    let result = service
        .apply_penalty("U1", "spam", PenaltySeverity::High)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let decision = service.is_user_allowed("U1").await;
    assert!(decision.allowed);
    assert_eq!(decision.status, UserStanding::Whitelisted);
    assert!(
        service
            .get_user_penalty_status("U1")
            .await
            .penalty_history
            .is_empty()
    );
}

#[tokio::test]
async fn lists_are_mutually_exclusive() {
    let (service, _) = service();

    service
        .add_to_blacklist("U1")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(!service.is_user_allowed("U1").await.allowed);

    service
        .add_to_whitelist("U1")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        service.is_user_allowed("U1").await.status,
        UserStanding::Whitelisted
    );

    service
        .add_to_blacklist("U1")
        .await
        .unwrap_or_else(|_| unreachable!());
    let decision = service.is_user_allowed("U1").await;
    assert!(!decision.allowed);
    assert_eq!(decision.status, UserStanding::PermanentlyBanned);

    let removed = service
        .remove_from_blacklist("U1")
        .await
        .unwrap_or_default();
    assert!(removed);
    assert!(service.is_user_allowed("U1").await.allowed);
}

#[tokio::test]
async fn warning_is_not_appealable() {
    let (service, _) = service();
    let warning = penalize(&service, "U1").await;

    let result = service
        .submit_appeal(warning.id.as_str(), "U1", "it was a test")
        .await;

    assert!(matches!(
        result,
        Err(AppError::Validation(message)) if message.contains("not appealable")
    ));
}

#[tokio::test]
async fn penalty_can_only_be_appealed_once() {
    let (service, _) = service();
    let block = blocked_user(&service, "U1").await;

    service
        .submit_appeal(block.id.as_str(), "U1", "false positive")
        .await
        .unwrap_or_else(|_| unreachable!());
    let second = service
        .submit_appeal(block.id.as_str(), "U1", "please")
        .await;

    assert!(matches!(
        second,
        Err(AppError::Conflict(message)) if message.contains("already been appealed")
    ));
}

#[tokio::test]
async fn unknown_penalty_cannot_be_appealed() {
    let (service, _) = service();

    let result = service.submit_appeal("missing", "U1", "why").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn appeal_count_is_capped() {
    let clock = manual_clock();
    let service = PenaltyService::new(
        Arc::new(FakePenaltyRepository::default()),
        clock.clone(),
        PenaltyPolicy {
            max_appeals_per_user: 1,
            permanent_ban_threshold: 10,
            ..PenaltyPolicy::default()
        },
    )
    .unwrap_or_else(|_| unreachable!());

    let first = blocked_user(&service, "U1").await;
    let second = penalize(&service, "U1").await;

    service
        .submit_appeal(first.id.as_str(), "U1", "mistake")
        .await
        .unwrap_or_else(|_| unreachable!());
    let result = service
        .submit_appeal(second.id.as_str(), "U1", "another mistake")
        .await;

    assert!(matches!(result, Err(AppError::Validation(message)) if message.contains("limit")));
}

#[tokio::test]
async fn approved_appeal_lifts_the_block() {
    let (service, _) = service();
    let block = blocked_user(&service, "U1").await;

    service
        .submit_appeal(block.id.as_str(), "U1", "false positive")
        .await
        .unwrap_or_else(|_| unreachable!());
    let appeal = service
        .review_appeal(block.id.as_str(), true, "moderator", Some("confirmed misfire"))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(appeal.status, AppealStatus::Approved);
    assert_eq!(appeal.reviewed_by.as_deref(), Some("moderator"));
    assert!(service.is_user_allowed("U1").await.allowed);

    let penalty = service
        .get_penalty(block.id.as_str())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(!penalty.is_active);
    assert_eq!(penalty.revoked_by.as_deref(), Some("moderator"));
    assert_eq!(penalty.revoked_reason.as_deref(), Some("confirmed misfire"));

    let again = service
        .review_appeal(block.id.as_str(), false, "moderator", None)
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn denied_appeal_keeps_the_block() {
    let (service, _) = service();
    let block = blocked_user(&service, "U1").await;

    service
        .submit_appeal(block.id.as_str(), "U1", "false positive")
        .await
        .unwrap_or_else(|_| unreachable!());
    let appeal = service
        .review_appeal(block.id.as_str(), false, "moderator", None)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(appeal.status, AppealStatus::Denied);
    assert!(!service.is_user_allowed("U1").await.allowed);
    assert!(
        service
            .list_appeals(Some(AppealStatus::Pending))
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test]
async fn revoking_unknown_penalty_is_a_no_op() {
    let (service, _) = service();

    let result: AppResult<bool> = service.revoke_penalty("missing", "admin", "cleanup").await;
    assert!(matches!(result, Ok(false)));
}

#[tokio::test]
async fn revocation_lifts_the_block() {
    let (service, _) = service();
    let block = blocked_user(&service, "U1").await;

    let revoked = service
        .revoke_penalty(block.id.as_str(), "admin", "manual review")
        .await
        .unwrap_or_default();

    assert!(revoked);
    assert!(service.is_user_allowed("U1").await.allowed);
}

#[tokio::test]
async fn unreachable_storage_fails_open_for_access_checks() {
    let service = PenaltyService::new(
        Arc::new(UnavailablePenaltyRepository),
        manual_clock(),
        PenaltyPolicy::default(),
    )
    .unwrap_or_else(|_| unreachable!());

    let decision = service.is_user_allowed("U1").await;

    assert!(decision.allowed);
    assert!(
        decision
            .reason
            .as_deref()
            .is_some_and(|reason| reason.contains("unavailable"))
    );

    let result = service
        .apply_penalty("U1", "spam", PenaltySeverity::Low)
        .await;
    assert!(matches!(result, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn storage_outage_lets_a_blocked_user_through() {
    let repository = Arc::new(SwitchablePenaltyRepository::default());
    let service = PenaltyService::new(repository.clone(), manual_clock(), PenaltyPolicy::default())
        .unwrap_or_else(|_| unreachable!());
    blocked_user(&service, "U1").await;

    let blocked = service.is_user_allowed("U1").await;
    assert!(!blocked.allowed);
    assert_eq!(blocked.status, UserStanding::Blocked);

    repository.set_online(false);
    let degraded = service.is_user_allowed("U1").await;
    assert!(degraded.allowed);
    assert!(
        degraded
            .reason
            .as_deref()
            .is_some_and(|reason| reason.starts_with("penalty state unavailable"))
    );

    repository.set_online(true);
    assert!(!service.is_user_allowed("U1").await.allowed);
}

#[tokio::test]
async fn approving_appeal_for_cleared_penalty_is_not_found() {
    let (service, _) = service();
    let block = blocked_user(&service, "U1").await;
    service
        .submit_appeal(block.id.as_str(), "U1", "false positive")
        .await
        .unwrap_or_else(|_| unreachable!());
    service
        .add_to_whitelist("U1")
        .await
        .unwrap_or_else(|_| unreachable!());

    let result = service
        .review_appeal(block.id.as_str(), true, "moderator", None)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn statistics_count_lists_and_pending_appeals() {
    let (service, _) = service();
    let block = blocked_user(&service, "U1").await;
    service
        .submit_appeal(block.id.as_str(), "U1", "false positive")
        .await
        .unwrap_or_else(|_| unreachable!());
    service
        .add_to_whitelist("U2")
        .await
        .unwrap_or_else(|_| unreachable!());
    service
        .add_to_blacklist("U3")
        .await
        .unwrap_or_else(|_| unreachable!());

    let statistics = service
        .get_penalty_statistics()
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(statistics.whitelisted_users, 1);
    assert_eq!(statistics.blacklisted_users, 1);
    assert_eq!(statistics.pending_appeals, 1);
}

#[test]
fn invalid_policy_is_rejected() {
    let result = PenaltyService::new(
        Arc::new(FakePenaltyRepository::default()),
        manual_clock(),
        PenaltyPolicy {
            permanent_ban_threshold: 1,
            ..PenaltyPolicy::default()
        },
    );

    assert!(result.is_err());

    let oversized_window = PenaltyService::new(
        Arc::new(FakePenaltyRepository::default()),
        manual_clock(),
        PenaltyPolicy {
            violation_window_seconds: 100_000_000_000_000_000,
            ..PenaltyPolicy::default()
        },
    );
    assert!(matches!(oversized_window, Err(AppError::Validation(_))));
}
