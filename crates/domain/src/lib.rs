//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod activity;
mod job;
mod penalty;
mod rate_limit;

pub use activity::{
    ActivityFlag, RequestPattern, SuspiciousActivityResult, UserActivityMetrics,
};
pub use job::{CooldownStatus, DEFAULT_JOB_TYPE, JobTriggerStatus, JobTypeConfig};
pub use penalty::{
    AccessDecision, AppealRequest, AppealStatus, EscalationStep, MAX_POLICY_SECONDS,
    PenaltyPolicy, PenaltyRecord, PenaltySeverity, PenaltyType, UserPenaltyStatus, UserStanding,
};
pub use rate_limit::{RateLimitConfig, RateLimitStatus};
