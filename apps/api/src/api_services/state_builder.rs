use std::sync::Arc;

use jobgate_application::{
    ActivityMonitorService, CounterStore, JobTriggerService, PenaltyRepository, PenaltyService,
    RateLimitService,
};
use jobgate_core::{AppError, Clock};
use jobgate_infrastructure::{
    FailoverCounterStore, InMemoryCounterStore, InMemoryPenaltyRepository, RedisCounterStore,
    RedisPenaltyRepository,
};
use tracing::{info, warn};

use super::build_redis_client;
use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Wires adapters and services for the configured backends.
///
/// Without `REDIS_URL` counters and penalties live in this process only.
pub fn build_app_state(config: &ApiConfig, clock: Arc<dyn Clock>) -> Result<AppState, AppError> {
    let fallback_store = Arc::new(InMemoryCounterStore::new(clock.clone()));

    let (counter_store, penalty_repository): (
        Arc<FailoverCounterStore>,
        Arc<dyn PenaltyRepository>,
    ) = match config.redis.as_ref() {
        Some(redis) => {
            let client = build_redis_client(&redis.url)?;
            let shared: Arc<dyn CounterStore> = Arc::new(RedisCounterStore::new(
                client.clone(),
                redis.key_prefix.clone(),
                redis.ping_interval,
                redis.timeout,
            ));
            info!(
                key_prefix = %redis.key_prefix,
                timeout_ms = redis.timeout.as_millis(),
                "using redis counter store with in-process fallback"
            );
            (
                Arc::new(FailoverCounterStore::new(
                    shared,
                    fallback_store.clone(),
                    redis.timeout,
                )),
                Arc::new(RedisPenaltyRepository::new(client, redis.key_prefix.clone())),
            )
        }
        None => {
            warn!("REDIS_URL is not set, counters and penalties are kept in process memory");
            (
                Arc::new(FailoverCounterStore::in_process_only(fallback_store.clone())),
                Arc::new(InMemoryPenaltyRepository::new()),
            )
        }
    };

    let store: Arc<dyn CounterStore> = counter_store.clone();
    let rate_limit_service = RateLimitService::new(store.clone(), clock.clone());
    let job_trigger_service =
        JobTriggerService::new(rate_limit_service, store.clone(), clock.clone());
    let penalty_service = PenaltyService::new(
        penalty_repository,
        clock.clone(),
        config.penalty_policy.clone(),
    )?;
    let activity_monitor_service =
        ActivityMonitorService::new(store, clock.clone(), config.activity.clone())?;

    Ok(AppState {
        activity_monitor_service,
        job_trigger_service,
        penalty_service,
        counter_store,
        fallback_store,
        clock,
        admin_token: Arc::from(config.admin_token.as_str()),
    })
}
