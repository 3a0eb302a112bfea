use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use jobgate_core::ManualClock;

use crate::api_config::ApiConfig;
use crate::api_services::build_app_state;
use crate::state::AppState;

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
}

/// In-process state driven by a manual clock.
pub(crate) fn test_state() -> (AppState, Arc<ManualClock>) {
    let values: HashMap<&str, &str> = HashMap::from([("ADMIN_TOKEN", "0123456789abcdef")]);
    let config = ApiConfig::from_lookup(|name| values.get(name).map(|value| (*value).to_owned()))
        .unwrap_or_else(|_| unreachable!());

    let clock = Arc::new(ManualClock::new(epoch()));
    let state = build_app_state(&config, clock.clone()).unwrap_or_else(|_| unreachable!());
    (state, clock)
}
