use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::AppState;

/// Periodically reclaims expired in-process counters and idle activity
/// histories. Reads already ignore expired state, so this only bounds memory.
pub fn spawn_sweeper(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep(&state);
        }
    })
}

fn sweep(state: &AppState) -> (usize, usize) {
    let counters = state.fallback_store.purge_expired();
    let users = state
        .activity_monitor_service
        .prune_inactive(state.clock.now());

    if counters > 0 || users > 0 {
        debug!(counters, users, "sweeper reclaimed expired state");
    }

    (counters, users)
}
