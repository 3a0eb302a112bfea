use std::sync::Arc;

use jobgate_application::{ActivityMonitorService, JobTriggerService, PenaltyService};
use jobgate_core::Clock;
use jobgate_infrastructure::{FailoverCounterStore, InMemoryCounterStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub activity_monitor_service: ActivityMonitorService,
    pub job_trigger_service: JobTriggerService,
    pub penalty_service: PenaltyService,
    pub counter_store: Arc<FailoverCounterStore>,
    pub fallback_store: Arc<InMemoryCounterStore>,
    pub clock: Arc<dyn Clock>,
    pub admin_token: Arc<str>,
}
