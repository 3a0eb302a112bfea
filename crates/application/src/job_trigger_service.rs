//! Job trigger policy: per-user quotas, per-type global quotas and
//! per-(user, job) cooldowns.
//!
//! Checking is free of side effects. Quota and cooldown are only charged by
//! `record_job_trigger`, so a caller may abort between the check and the
//! actual trigger.

mod service;


pub use service::JobTriggerService;
