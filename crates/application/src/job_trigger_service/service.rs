use std::collections::HashMap;
use std::sync::Arc;

use jobgate_core::{AppError, AppResult, Clock, NonEmptyString};
use jobgate_domain::{
    CooldownStatus, DEFAULT_JOB_TYPE, JobTriggerStatus, JobTypeConfig, RateLimitConfig,
    RateLimitStatus,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{CounterStore, RateLimitService};

const USER_QUOTA_PREFIX: &str = "job_rate_limit";
const GLOBAL_QUOTA_PREFIX: &str = "job_global_limit";
const COOLDOWN_PREFIX: &str = "job_cooldown";

/// Application service gating remote job triggers.
#[derive(Clone)]
pub struct JobTriggerService {
    rate_limit_service: RateLimitService,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    job_types: Arc<RwLock<HashMap<String, JobTypeConfig>>>,
}

impl JobTriggerService {
    /// Creates a service with the shipped policy table.
    #[must_use]
    pub fn new(
        rate_limit_service: RateLimitService,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let table = JobTypeConfig::default_table()
            .into_iter()
            .map(|config| (config.job_type.clone(), config))
            .collect();

        Self {
            rate_limit_service,
            store,
            clock,
            job_types: Arc::new(RwLock::new(table)),
        }
    }

    /// Creates a service with a custom policy table.
    ///
    /// The table must contain a valid `default` entry.
    pub fn with_job_types(
        rate_limit_service: RateLimitService,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
        job_types: Vec<JobTypeConfig>,
    ) -> AppResult<Self> {
        let mut table = HashMap::with_capacity(job_types.len());
        for config in job_types {
            config.validate()?;
            table.insert(config.job_type.clone(), config);
        }

        if !table.contains_key(DEFAULT_JOB_TYPE) {
            return Err(AppError::Validation(format!(
                "job type table must contain a '{DEFAULT_JOB_TYPE}' entry"
            )));
        }

        Ok(Self {
            rate_limit_service,
            store,
            clock,
            job_types: Arc::new(RwLock::new(table)),
        })
    }

    /// Decides whether `user_id` may trigger `job_name` right now.
    ///
    /// Evaluates the per-user quota, the global quota and the cooldown, always
    /// all three; the first failing one supplies `block_reason`.
    pub async fn check_job_trigger(
        &self,
        user_id: &str,
        job_name: &str,
        job_type: Option<&str>,
    ) -> AppResult<JobTriggerStatus> {
        let user_id = NonEmptyString::new(user_id)?;
        let job_name = NonEmptyString::new(job_name)?;
        let config = self.resolve_job_type(job_type).await;

        let user_limit = self
            .rate_limit_service
            .check_limit_only(&user_quota(&config, user_id.as_str())?)
            .await;
        let global_limit = match global_quota(&config)? {
            Some(quota) => Some(self.rate_limit_service.check_limit_only(&quota).await),
            None => None,
        };
        let cooldown = self
            .read_cooldown(user_id.as_str(), job_name.as_str(), config.cooldown_seconds)
            .await;

        let block_reason = block_reason(
            &config,
            job_name.as_str(),
            &user_limit,
            global_limit.as_ref(),
            &cooldown,
        );

        if let Some(reason) = block_reason.as_deref() {
            debug!(
                user_id = %user_id.as_str(),
                job_name = %job_name.as_str(),
                job_type = %config.job_type,
                reason,
                "job trigger denied"
            );
        }

        Ok(JobTriggerStatus {
            can_proceed: block_reason.is_none(),
            job_type: config.job_type,
            user_limit,
            global_limit,
            cooldown,
            block_reason,
        })
    }

    /// Charges quota and starts the cooldown for a trigger that passed the gate.
    pub async fn record_job_trigger(
        &self,
        user_id: &str,
        job_name: &str,
        job_type: Option<&str>,
    ) -> AppResult<()> {
        let user_id = NonEmptyString::new(user_id)?;
        let job_name = NonEmptyString::new(job_name)?;
        let config = self.resolve_job_type(job_type).await;

        self.rate_limit_service
            .check_limit(&user_quota(&config, user_id.as_str())?)
            .await;
        if let Some(quota) = global_quota(&config)? {
            self.rate_limit_service.check_limit(&quota).await;
        }

        if config.cooldown_seconds > 0 {
            let key = cooldown_key(user_id.as_str(), job_name.as_str());
            if let Err(error) = self
                .store
                .set_window_start(key.as_str(), self.clock.now(), config.cooldown_seconds)
                .await
            {
                warn!(
                    user_id = %user_id.as_str(),
                    job_name = %job_name.as_str(),
                    error = %error,
                    "failed to start job cooldown"
                );
            }
        }

        debug!(
            user_id = %user_id.as_str(),
            job_name = %job_name.as_str(),
            job_type = %config.job_type,
            "job trigger recorded"
        );

        Ok(())
    }

    /// Reads the cooldown of one (user, job) pair.
    pub async fn get_cooldown_status(
        &self,
        user_id: &str,
        job_name: &str,
        job_type: Option<&str>,
    ) -> AppResult<CooldownStatus> {
        let user_id = NonEmptyString::new(user_id)?;
        let job_name = NonEmptyString::new(job_name)?;
        let config = self.resolve_job_type(job_type).await;

        Ok(self
            .read_cooldown(user_id.as_str(), job_name.as_str(), config.cooldown_seconds)
            .await)
    }

    /// Clears a user's quota counter and cooldown for one job.
    pub async fn reset_user_job_limits(
        &self,
        user_id: &str,
        job_name: &str,
        job_type: Option<&str>,
    ) -> AppResult<()> {
        let user_id = NonEmptyString::new(user_id)?;
        let job_name = NonEmptyString::new(job_name)?;
        let config = self.resolve_job_type(job_type).await;

        self.rate_limit_service
            .reset_limit(&user_quota(&config, user_id.as_str())?)
            .await;

        let key = cooldown_key(user_id.as_str(), job_name.as_str());
        if let Err(error) = self.store.reset(key.as_str()).await {
            warn!(
                user_id = %user_id.as_str(),
                job_name = %job_name.as_str(),
                error = %error,
                "failed to clear job cooldown"
            );
        }

        info!(
            user_id = %user_id.as_str(),
            job_name = %job_name.as_str(),
            job_type = %config.job_type,
            "job limits reset"
        );

        Ok(())
    }

    /// Returns the policy applied to a job type, falling back to `default`.
    pub async fn get_job_type_config(&self, job_type: Option<&str>) -> JobTypeConfig {
        self.resolve_job_type(job_type).await
    }

    /// Lists every configured job type, sorted by name.
    pub async fn list_job_type_configs(&self) -> Vec<JobTypeConfig> {
        let mut configs: Vec<JobTypeConfig> =
            self.job_types.read().await.values().cloned().collect();
        configs.sort_by(|left, right| left.job_type.cmp(&right.job_type));
        configs
    }

    /// Inserts or replaces the policy of one job type.
    pub async fn update_job_type_config(&self, config: JobTypeConfig) -> AppResult<()> {
        config.validate()?;

        info!(
            job_type = %config.job_type,
            max_requests_per_user = config.max_requests_per_user,
            window_size_seconds = config.window_size_seconds,
            cooldown_seconds = config.cooldown_seconds,
            "job type policy updated"
        );

        self.job_types
            .write()
            .await
            .insert(config.job_type.clone(), config);

        Ok(())
    }

    /// Removes a job type. Its triggers fall back to `default` afterwards.
    pub async fn remove_job_type_config(&self, job_type: &str) -> AppResult<bool> {
        if job_type == DEFAULT_JOB_TYPE {
            return Err(AppError::Validation(format!(
                "the '{DEFAULT_JOB_TYPE}' job type cannot be removed"
            )));
        }

        Ok(self.job_types.write().await.remove(job_type).is_some())
    }

    async fn resolve_job_type(&self, job_type: Option<&str>) -> JobTypeConfig {
        let job_types = self.job_types.read().await;
        job_type
            .and_then(|name| job_types.get(name))
            .or_else(|| job_types.get(DEFAULT_JOB_TYPE))
            .cloned()
            .unwrap_or_else(|| JobTypeConfig::new(DEFAULT_JOB_TYPE, 10, 3600, 30))
    }

    async fn read_cooldown(
        &self,
        user_id: &str,
        job_name: &str,
        cooldown_seconds: u32,
    ) -> CooldownStatus {
        let now = self.clock.now();
        let key = cooldown_key(user_id, job_name);

        match self.store.get_window_start(key.as_str()).await {
            Ok(last_triggered_at) => {
                CooldownStatus::evaluate(last_triggered_at, cooldown_seconds, now)
            }
            Err(error) => {
                warn!(
                    user_id,
                    job_name,
                    error = %error,
                    "failed to read job cooldown, treating as clear"
                );
                CooldownStatus::clear()
            }
        }
    }
}

fn user_quota(config: &JobTypeConfig, user_id: &str) -> AppResult<RateLimitConfig> {
    RateLimitConfig::new(
        USER_QUOTA_PREFIX,
        format!("{user_id}:{}", config.job_type),
        config.max_requests_per_user,
        config.window_size_seconds,
    )
}

fn global_quota(config: &JobTypeConfig) -> AppResult<Option<RateLimitConfig>> {
    config
        .global_limit()
        .map(|(max_requests, window_seconds)| {
            RateLimitConfig::new(
                GLOBAL_QUOTA_PREFIX,
                config.job_type.as_str(),
                max_requests,
                window_seconds,
            )
        })
        .transpose()
}

fn cooldown_key(user_id: &str, job_name: &str) -> String {
    format!("{COOLDOWN_PREFIX}:{user_id}:{job_name}")
}

fn block_reason(
    config: &JobTypeConfig,
    job_name: &str,
    user_limit: &RateLimitStatus,
    global_limit: Option<&RateLimitStatus>,
    cooldown: &CooldownStatus,
) -> Option<String> {
    if user_limit.is_exhausted() {
        return Some(format!(
            "rate limit reached for '{}' jobs: {}/{} used, resets in {}s",
            config.job_type,
            user_limit.current_requests,
            user_limit.max_requests,
            user_limit.reset_time_seconds
        ));
    }

    if let Some(global_limit) = global_limit.filter(|status| status.is_exhausted()) {
        return Some(format!(
            "global limit reached for '{}' jobs: {}/{} used, resets in {}s",
            config.job_type,
            global_limit.current_requests,
            global_limit.max_requests,
            global_limit.reset_time_seconds
        ));
    }

    if cooldown.in_cooldown {
        return Some(format!(
            "job '{job_name}' is in cooldown, try again in {}s",
            cooldown.remaining_seconds
        ));
    }

    None
}
