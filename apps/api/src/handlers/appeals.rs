use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use jobgate_domain::{AppealRequest, AppealStatus};
use serde::Deserialize;

use crate::dto::{ReviewAppealRequest, SubmitAppealRequest};
use crate::error::ApiResult;
use crate::middleware::ADMIN_ACTOR;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AppealsQuery {
    pub status: Option<AppealStatus>,
}

pub async fn submit_appeal_handler(
    State(state): State<AppState>,
    Json(payload): Json<SubmitAppealRequest>,
) -> ApiResult<(StatusCode, Json<AppealRequest>)> {
    let appeal = state
        .penalty_service
        .submit_appeal(&payload.penalty_id, &payload.user_id, &payload.reason)
        .await?;

    Ok((StatusCode::CREATED, Json(appeal)))
}

pub async fn list_appeals_handler(
    State(state): State<AppState>,
    Query(query): Query<AppealsQuery>,
) -> ApiResult<Json<Vec<AppealRequest>>> {
    Ok(Json(state.penalty_service.list_appeals(query.status).await?))
}

pub async fn review_appeal_handler(
    State(state): State<AppState>,
    Path(penalty_id): Path<String>,
    Json(payload): Json<ReviewAppealRequest>,
) -> ApiResult<Json<AppealRequest>> {
    let appeal = state
        .penalty_service
        .review_appeal(
            &penalty_id,
            payload.approve,
            ADMIN_ACTOR,
            payload.notes.as_deref(),
        )
        .await?;

    Ok(Json(appeal))
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use jobgate_domain::{AppealStatus, PenaltySeverity};

    use super::{AppealsQuery, list_appeals_handler, review_appeal_handler, submit_appeal_handler};
    use crate::dto::{ReviewAppealRequest, SubmitAppealRequest};
    use crate::handlers::test_support::test_state;
    use crate::state::AppState;

    async fn blocked_penalty_id(state: &AppState, user_id: &str) -> String {
        let mut last_id = String::new();
        for _ in 0..2 {
            last_id = state
                .penalty_service
                .apply_penalty(user_id, "flooding", PenaltySeverity::Medium)
                .await
                .unwrap_or_else(|_| unreachable!())
                .id;
        }
        last_id
    }

    fn appeal(penalty_id: &str, user_id: &str) -> SubmitAppealRequest {
        SubmitAppealRequest {
            penalty_id: penalty_id.to_owned(),
            user_id: user_id.to_owned(),
            reason: "shared network".to_owned(),
        }
    }

    #[tokio::test]
    async fn approved_appeal_lifts_the_block() {
        let (state, _clock) = test_state();
        let penalty_id = blocked_penalty_id(&state, "carol").await;

        let (status, submitted) =
            submit_appeal_handler(State(state.clone()), Json(appeal(&penalty_id, "carol")))
                .await
                .unwrap_or_else(|_| unreachable!());
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(submitted.0.status, AppealStatus::Pending);

        let pending = list_appeals_handler(
            State(state.clone()),
            Query(AppealsQuery {
                status: Some(AppealStatus::Pending),
            }),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(pending.0.len(), 1);

        let reviewed = review_appeal_handler(
            State(state.clone()),
            Path(penalty_id),
            Json(ReviewAppealRequest {
                approve: true,
                notes: Some("verified".to_owned()),
            }),
        )
        .await
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(reviewed.0.status, AppealStatus::Approved);
        assert_eq!(reviewed.0.reviewed_by.as_deref(), Some("admin"));

        assert!(state.penalty_service.is_user_allowed("carol").await.allowed);
    }

    #[tokio::test]
    async fn duplicate_appeal_conflicts() {
        let (state, _clock) = test_state();
        let penalty_id = blocked_penalty_id(&state, "dave").await;

        let _ = submit_appeal_handler(State(state.clone()), Json(appeal(&penalty_id, "dave")))
            .await
            .unwrap_or_else(|_| unreachable!());
        let second =
            submit_appeal_handler(State(state), Json(appeal(&penalty_id, "dave"))).await;

        assert!(second.is_err_and(|error| error.status_code() == StatusCode::CONFLICT));
    }

    #[tokio::test]
    async fn reviewing_unknown_appeal_is_not_found() {
        let (state, _clock) = test_state();

        let result = review_appeal_handler(
            State(state),
            Path("missing".to_owned()),
            Json(ReviewAppealRequest {
                approve: false,
                notes: None,
            }),
        )
        .await;

        assert!(result.is_err_and(|error| error.status_code() == StatusCode::NOT_FOUND));
    }
}
