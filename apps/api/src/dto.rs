use chrono::{DateTime, Utc};
use jobgate_domain::{
    PenaltySeverity, RequestPattern, SuspiciousActivityResult, UserActivityMetrics,
};
use jobgate_infrastructure::CounterBackend;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub counter_backend: CounterBackend,
}

/// One user action reported by a front end.
#[derive(Debug, Deserialize)]
pub struct RecordRequestRequest {
    pub user_id: String,
    pub action: String,
    /// Defaults to the server time.
    pub timestamp: Option<DateTime<Utc>>,
    pub channel: Option<String>,
    pub job_type: Option<String>,
    pub job_name: Option<String>,
}

impl RecordRequestRequest {
    pub fn into_pattern(self, now: DateTime<Utc>) -> RequestPattern {
        RequestPattern {
            user_id: self.user_id,
            timestamp: self.timestamp.unwrap_or(now),
            action: self.action,
            channel: self.channel,
            job_type: self.job_type,
            job_name: self.job_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserActivityResponse {
    pub metrics: Option<UserActivityMetrics>,
    pub analysis: SuspiciousActivityResult,
    pub history_length: usize,
}

#[derive(Debug, Deserialize)]
pub struct JobTriggerRequest {
    pub user_id: String,
    pub job_name: String,
    pub job_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobTypeRequest {
    pub max_requests_per_user: u32,
    pub window_size_seconds: u32,
    pub cooldown_seconds: u32,
    pub global_max_requests: Option<u32>,
    pub global_window_seconds: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyPenaltyRequest {
    pub reason: String,
    pub severity: PenaltySeverity,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAppealRequest {
    pub penalty_id: String,
    pub user_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewAppealRequest {
    pub approve: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevokePenaltyRequest {
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct RevokePenaltyResponse {
    pub revoked: bool,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ListMembersResponse {
    pub users: Vec<String>,
}
