use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use jobgate_domain::{CooldownStatus, JobTriggerStatus, JobTypeConfig};
use serde::Deserialize;

use crate::dto::{JobTriggerRequest, RemovedResponse, UpdateJobTypeRequest};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CooldownQuery {
    pub user_id: String,
    pub job_name: String,
    pub job_type: Option<String>,
}

pub async fn check_job_trigger_handler(
    State(state): State<AppState>,
    Json(payload): Json<JobTriggerRequest>,
) -> ApiResult<Json<JobTriggerStatus>> {
    let status = state
        .job_trigger_service
        .check_job_trigger(
            &payload.user_id,
            &payload.job_name,
            payload.job_type.as_deref(),
        )
        .await?;

    Ok(Json(status))
}

pub async fn record_job_trigger_handler(
    State(state): State<AppState>,
    Json(payload): Json<JobTriggerRequest>,
) -> ApiResult<StatusCode> {
    state
        .job_trigger_service
        .record_job_trigger(
            &payload.user_id,
            &payload.job_name,
            payload.job_type.as_deref(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn cooldown_status_handler(
    State(state): State<AppState>,
    Query(query): Query<CooldownQuery>,
) -> ApiResult<Json<CooldownStatus>> {
    let cooldown = state
        .job_trigger_service
        .get_cooldown_status(&query.user_id, &query.job_name, query.job_type.as_deref())
        .await?;

    Ok(Json(cooldown))
}

pub async fn list_job_types_handler(State(state): State<AppState>) -> Json<Vec<JobTypeConfig>> {
    Json(state.job_trigger_service.list_job_type_configs().await)
}

pub async fn update_job_type_handler(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
    Json(payload): Json<UpdateJobTypeRequest>,
) -> ApiResult<Json<JobTypeConfig>> {
    let config = JobTypeConfig {
        job_type,
        max_requests_per_user: payload.max_requests_per_user,
        window_size_seconds: payload.window_size_seconds,
        cooldown_seconds: payload.cooldown_seconds,
        global_max_requests: payload.global_max_requests,
        global_window_seconds: payload.global_window_seconds,
    };

    state
        .job_trigger_service
        .update_job_type_config(config.clone())
        .await?;

    Ok(Json(config))
}

pub async fn remove_job_type_handler(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
) -> ApiResult<Json<RemovedResponse>> {
    let removed = state
        .job_trigger_service
        .remove_job_type_config(&job_type)
        .await?;

    Ok(Json(RemovedResponse { removed }))
}

pub async fn reset_job_limits_handler(
    State(state): State<AppState>,
    Json(payload): Json<JobTriggerRequest>,
) -> ApiResult<StatusCode> {
    state
        .job_trigger_service
        .reset_user_job_limits(
            &payload.user_id,
            &payload.job_name,
            payload.job_type.as_deref(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
