use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use jobgate_application::{PenaltyStatistics, UserList};
use jobgate_domain::{AccessDecision, PenaltyRecord, UserPenaltyStatus};

use crate::dto::{
    ApplyPenaltyRequest, ListMembersResponse, RemovedResponse, RevokePenaltyRequest,
    RevokePenaltyResponse,
};
use crate::error::ApiResult;
use crate::middleware::ADMIN_ACTOR;
use crate::state::AppState;

pub async fn user_access_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<AccessDecision> {
    Json(state.penalty_service.is_user_allowed(&user_id).await)
}

pub async fn user_penalty_status_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserPenaltyStatus> {
    Json(state.penalty_service.get_user_penalty_status(&user_id).await)
}

pub async fn apply_penalty_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<ApplyPenaltyRequest>,
) -> ApiResult<(StatusCode, Json<PenaltyRecord>)> {
    let record = state
        .penalty_service
        .apply_penalty(&user_id, &payload.reason, payload.severity)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_penalty_handler(
    State(state): State<AppState>,
    Path(penalty_id): Path<String>,
) -> ApiResult<Json<PenaltyRecord>> {
    Ok(Json(state.penalty_service.get_penalty(&penalty_id).await?))
}

pub async fn revoke_penalty_handler(
    State(state): State<AppState>,
    Path(penalty_id): Path<String>,
    Json(payload): Json<RevokePenaltyRequest>,
) -> ApiResult<Json<RevokePenaltyResponse>> {
    let revoked = state
        .penalty_service
        .revoke_penalty(&penalty_id, ADMIN_ACTOR, &payload.reason)
        .await?;

    Ok(Json(RevokePenaltyResponse { revoked }))
}

pub async fn penalty_statistics_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<PenaltyStatistics>> {
    Ok(Json(state.penalty_service.get_penalty_statistics().await?))
}

pub async fn add_to_whitelist_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.penalty_service.add_to_whitelist(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_from_whitelist_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RemovedResponse>> {
    let removed = state.penalty_service.remove_from_whitelist(&user_id).await?;
    Ok(Json(RemovedResponse { removed }))
}

pub async fn list_whitelist_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<ListMembersResponse>> {
    let users = state
        .penalty_service
        .list_members(UserList::Whitelist)
        .await?;
    Ok(Json(ListMembersResponse { users }))
}

pub async fn add_to_blacklist_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.penalty_service.add_to_blacklist(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_from_blacklist_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RemovedResponse>> {
    let removed = state.penalty_service.remove_from_blacklist(&user_id).await?;
    Ok(Json(RemovedResponse { removed }))
}

pub async fn list_blacklist_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<ListMembersResponse>> {
    let users = state
        .penalty_service
        .list_members(UserList::Blacklist)
        .await?;
    Ok(Json(ListMembersResponse { users }))
}
