//! Application services and ports.

#![forbid(unsafe_code)]

mod activity_monitor_service;
mod job_trigger_service;
mod penalty_ports;
mod penalty_service;
mod rate_limit_service;

#[cfg(test)]
mod test_support;

pub use activity_monitor_service::{
    ActivityMonitorConfig, ActivityMonitorService, ActivityStatistics, SuspicionWeights,
    analyze_history,
};
pub use job_trigger_service::JobTriggerService;
pub use penalty_ports::{PenaltyRepository, UserList};
pub use penalty_service::{PenaltyService, PenaltyStatistics};
pub use rate_limit_service::{CounterStore, RateLimitService, WindowSnapshot, window_expired};
