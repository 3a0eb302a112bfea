//! Behavioural activity monitoring.
//!
//! Keeps a bounded in-process history per user and scores it with additive
//! heuristics. The score is independent of the hard quotas enforced by the job
//! trigger policy; it only informs callers and administrators.

mod analysis;
mod config;
mod service;


pub use analysis::analyze_history;
pub use config::{ActivityMonitorConfig, SuspicionWeights};
pub use service::{ActivityMonitorService, ActivityStatistics};
