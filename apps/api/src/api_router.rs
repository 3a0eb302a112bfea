use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/api/activity/requests",
            post(handlers::activity::record_request_handler),
        )
        .route(
            "/api/activity/users/{user_id}",
            get(handlers::activity::user_activity_handler),
        )
        .route(
            "/api/activity/suspicious",
            get(handlers::activity::suspicious_users_handler),
        )
        .route(
            "/api/activity/stats",
            get(handlers::activity::activity_statistics_handler),
        )
        .route(
            "/api/jobs/check",
            post(handlers::jobs::check_job_trigger_handler),
        )
        .route(
            "/api/jobs/record",
            post(handlers::jobs::record_job_trigger_handler),
        )
        .route(
            "/api/jobs/cooldown",
            get(handlers::jobs::cooldown_status_handler),
        )
        .route("/api/jobs/types", get(handlers::jobs::list_job_types_handler))
        .route(
            "/api/users/{user_id}/access",
            get(handlers::penalties::user_access_handler),
        )
        .route(
            "/api/users/{user_id}/penalties",
            get(handlers::penalties::user_penalty_status_handler),
        )
        .route(
            "/api/appeals",
            post(handlers::appeals::submit_appeal_handler),
        );

    let admin_routes = Router::new()
        .route(
            "/api/activity/users/{user_id}",
            delete(handlers::activity::clear_user_activity_handler),
        )
        .route(
            "/api/jobs/types/{job_type}",
            put(handlers::jobs::update_job_type_handler)
                .delete(handlers::jobs::remove_job_type_handler),
        )
        .route(
            "/api/jobs/reset",
            post(handlers::jobs::reset_job_limits_handler),
        )
        .route(
            "/api/users/{user_id}/penalties",
            post(handlers::penalties::apply_penalty_handler),
        )
        .route(
            "/api/penalties/stats",
            get(handlers::penalties::penalty_statistics_handler),
        )
        .route(
            "/api/penalties/{penalty_id}",
            get(handlers::penalties::get_penalty_handler),
        )
        .route(
            "/api/penalties/{penalty_id}/revoke",
            post(handlers::penalties::revoke_penalty_handler),
        )
        .route(
            "/api/whitelist",
            get(handlers::penalties::list_whitelist_handler),
        )
        .route(
            "/api/whitelist/{user_id}",
            put(handlers::penalties::add_to_whitelist_handler)
                .delete(handlers::penalties::remove_from_whitelist_handler),
        )
        .route(
            "/api/blacklist",
            get(handlers::penalties::list_blacklist_handler),
        )
        .route(
            "/api/blacklist/{user_id}",
            put(handlers::penalties::add_to_blacklist_handler)
                .delete(handlers::penalties::remove_from_blacklist_handler),
        )
        .route(
            "/api/appeals",
            get(handlers::appeals::list_appeals_handler),
        )
        .route(
            "/api/appeals/{penalty_id}/review",
            post(handlers::appeals::review_appeal_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_admin_token,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
