use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use jobgate_application::ActivityMonitorConfig;
use jobgate_core::AppError;
use jobgate_domain::PenaltyPolicy;
use tracing_subscriber::EnvFilter;

const MIN_ADMIN_TOKEN_LENGTH: usize = 16;

/// Shared counter store connection settings.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
    pub timeout: Duration,
    pub ping_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub redis: Option<RedisConfig>,
    pub admin_token: String,
    pub penalty_policy: PenaltyPolicy,
    pub activity: ActivityMonitorConfig,
    pub sweep_interval: Duration,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let admin_token = lookup("ADMIN_TOKEN")
            .ok_or_else(|| AppError::Validation("ADMIN_TOKEN is required".to_owned()))?;
        if admin_token.len() < MIN_ADMIN_TOKEN_LENGTH {
            return Err(AppError::Validation(format!(
                "ADMIN_TOKEN must be at least {MIN_ADMIN_TOKEN_LENGTH} characters"
            )));
        }

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parsed(&lookup, "API_PORT", 3002_u16)?;

        let redis_key_prefix = lookup("REDIS_KEY_PREFIX").unwrap_or_else(|| "jobgate".to_owned());
        let redis = match lookup("REDIS_URL") {
            Some(url) => Some(RedisConfig {
                url,
                key_prefix: redis_key_prefix,
                timeout: Duration::from_millis(parsed(&lookup, "REDIS_TIMEOUT_MS", 250_u64)?),
                ping_interval: Duration::from_secs(parsed(
                    &lookup,
                    "REDIS_PING_INTERVAL_SECONDS",
                    5_u64,
                )?),
            }),
            None => None,
        };

        let default_policy = PenaltyPolicy::default();
        let penalty_policy = PenaltyPolicy {
            base_timeout_seconds: parsed(
                &lookup,
                "PENALTY_BASE_TIMEOUT_SECONDS",
                default_policy.base_timeout_seconds,
            )?,
            max_timeout_seconds: parsed(
                &lookup,
                "PENALTY_MAX_TIMEOUT_SECONDS",
                default_policy.max_timeout_seconds,
            )?,
            escalation_multiplier: parsed(
                &lookup,
                "PENALTY_ESCALATION_MULTIPLIER",
                default_policy.escalation_multiplier,
            )?,
            permanent_ban_threshold: parsed(
                &lookup,
                "PENALTY_PERMANENT_BAN_THRESHOLD",
                default_policy.permanent_ban_threshold,
            )?,
            violation_window_seconds: parsed(
                &lookup,
                "PENALTY_VIOLATION_WINDOW_SECONDS",
                default_policy.violation_window_seconds,
            )?,
            max_appeals_per_user: parsed(
                &lookup,
                "PENALTY_MAX_APPEALS_PER_USER",
                default_policy.max_appeals_per_user,
            )?,
        };
        penalty_policy.validate()?;

        let default_activity = ActivityMonitorConfig::default();
        let activity = ActivityMonitorConfig {
            history_window_seconds: parsed(
                &lookup,
                "ACTIVITY_HISTORY_WINDOW_SECONDS",
                default_activity.history_window_seconds,
            )?,
            max_history: parsed(&lookup, "ACTIVITY_MAX_HISTORY", default_activity.max_history)?,
            suspicious_score_threshold: parsed(
                &lookup,
                "ACTIVITY_SUSPICIOUS_SCORE_THRESHOLD",
                default_activity.suspicious_score_threshold,
            )?,
            ..default_activity
        };
        activity.validate()?;

        let sweep_interval =
            Duration::from_secs(parsed(&lookup, "SWEEP_INTERVAL_SECONDS", 300_u64)?.max(1));

        Ok(Self {
            api_host,
            api_port,
            redis,
            admin_token,
            penalty_policy,
            activity,
            sweep_interval,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}
