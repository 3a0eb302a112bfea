use axum::Json;
use axum::extract::{Path, Query, State};
use jobgate_application::ActivityStatistics;
use jobgate_domain::{SuspiciousActivityResult, UserActivityMetrics};
use serde::Deserialize;

use crate::dto::{RecordRequestRequest, RemovedResponse, UserActivityResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SuspiciousUsersQuery {
    pub min_score: Option<u32>,
}

pub async fn record_request_handler(
    State(state): State<AppState>,
    Json(payload): Json<RecordRequestRequest>,
) -> ApiResult<Json<SuspiciousActivityResult>> {
    let pattern = payload.into_pattern(state.clock.now());
    let analysis = state
        .activity_monitor_service
        .record_request(pattern)
        .await?;

    Ok(Json(analysis))
}

pub async fn user_activity_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserActivityResponse> {
    let service = &state.activity_monitor_service;

    Json(UserActivityResponse {
        metrics: service.get_user_metrics(&user_id),
        analysis: service.analyze_activity(&user_id),
        history_length: service.get_user_history(&user_id).len(),
    })
}

pub async fn suspicious_users_handler(
    State(state): State<AppState>,
    Query(query): Query<SuspiciousUsersQuery>,
) -> Json<Vec<UserActivityMetrics>> {
    Json(
        state
            .activity_monitor_service
            .get_suspicious_users(query.min_score),
    )
}

pub async fn activity_statistics_handler(
    State(state): State<AppState>,
) -> Json<ActivityStatistics> {
    Json(state.activity_monitor_service.get_activity_statistics())
}

pub async fn clear_user_activity_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<RemovedResponse> {
    let removed = state
        .activity_monitor_service
        .clear_user_activity(&user_id)
        .await;

    Json(RemovedResponse { removed })
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::extract::{Path, Query, State};
    use chrono::Duration;
    use jobgate_domain::ActivityFlag;

    use super::{
        SuspiciousUsersQuery, clear_user_activity_handler, record_request_handler,
        suspicious_users_handler, user_activity_handler,
    };
    use crate::dto::RecordRequestRequest;
    use crate::handlers::test_support::{epoch, test_state};

    fn trigger_request(user_id: &str, offset_ms: i64) -> RecordRequestRequest {
        RecordRequestRequest {
            user_id: user_id.to_owned(),
            action: "trigger".to_owned(),
            timestamp: Some(epoch() + Duration::milliseconds(offset_ms)),
            channel: None,
            job_type: Some("build".to_owned()),
            job_name: Some("nightly".to_owned()),
        }
    }

    #[tokio::test]
    async fn scripted_requests_show_up_as_suspicious() {
        let (state, clock) = test_state();

        for index in 0..20 {
            clock.set(epoch() + Duration::milliseconds(index * 100));
            let _ = record_request_handler(
                State(state.clone()),
                Json(trigger_request("bot", index * 100)),
            )
            .await
            .unwrap_or_else(|_| unreachable!());
        }

        let activity = user_activity_handler(State(state.clone()), Path("bot".to_owned())).await;
        assert!(activity.0.analysis.is_suspicious);
        assert!(activity.0.analysis.has_flag(ActivityFlag::BotLikeTiming));
        assert_eq!(activity.0.history_length, 20);
        assert_eq!(
            activity.0.metrics.map(|metrics| metrics.total_requests),
            Some(20)
        );

        let suspicious = suspicious_users_handler(
            State(state),
            Query(SuspiciousUsersQuery { min_score: None }),
        )
        .await;
        assert_eq!(suspicious.0.len(), 1);
        assert_eq!(suspicious.0[0].user_id, "bot");
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected() {
        let (state, _clock) = test_state();

        let result = record_request_handler(State(state), Json(trigger_request(" ", 0))).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn clearing_activity_reports_whether_anything_was_removed() {
        let (state, _clock) = test_state();
        let _ = record_request_handler(State(state.clone()), Json(trigger_request("alice", 0)))
            .await
            .unwrap_or_else(|_| unreachable!());

        let first = clear_user_activity_handler(State(state.clone()), Path("alice".to_owned())).await;
        let second = clear_user_activity_handler(State(state), Path("alice".to_owned())).await;

        assert!(first.0.removed);
        assert!(!second.0.removed);
    }
}
