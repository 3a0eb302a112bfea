use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;

use jobgate_core::{AppError, AppResult, ManualClock};
use jobgate_domain::{AppealRequest, AppealStatus, PenaltyRecord};

use crate::CounterStore;
use crate::penalty_ports::{PenaltyRepository, UserList};

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
}

pub(crate) fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}

/// Counter store relying on the trait's composed window logic.
#[derive(Default)]
pub(crate) struct FakeCounterStore {
    counts: Mutex<HashMap<String, u64>>,
    window_starts: Mutex<HashMap<String, DateTime<Utc>>>,
}

#[async_trait]
impl CounterStore for FakeCounterStore {
    async fn get_count(&self, key: &str) -> AppResult<u64> {
        Ok(self.counts.lock().await.get(key).copied().unwrap_or_default())
    }

    async fn increment_count(&self, key: &str, _window_seconds: u32) -> AppResult<u64> {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(key.to_owned()).or_default();
        *count += 1;
        Ok(*count)
    }

    async fn get_window_start(&self, key: &str) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self.window_starts.lock().await.get(key).copied())
    }

    async fn set_window_start(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.window_starts
            .lock()
            .await
            .insert(key.to_owned(), window_start);
        Ok(())
    }

    async fn reset(&self, key: &str) -> AppResult<()> {
        self.counts.lock().await.remove(key);
        self.window_starts.lock().await.remove(key);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Counter store whose backend is permanently unreachable.
pub(crate) struct UnavailableCounterStore;

#[async_trait]
impl CounterStore for UnavailableCounterStore {
    async fn get_count(&self, _key: &str) -> AppResult<u64> {
        Err(unreachable_backend())
    }

    async fn increment_count(&self, _key: &str, _window_seconds: u32) -> AppResult<u64> {
        Err(unreachable_backend())
    }

    async fn get_window_start(&self, _key: &str) -> AppResult<Option<DateTime<Utc>>> {
        Err(unreachable_backend())
    }

    async fn set_window_start(
        &self,
        _key: &str,
        _window_start: DateTime<Utc>,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        Err(unreachable_backend())
    }

    async fn reset(&self, _key: &str) -> AppResult<()> {
        Err(unreachable_backend())
    }

    async fn is_available(&self) -> bool {
        false
    }
}

/// Penalty repository kept in plain maps.
#[derive(Default)]
pub(crate) struct FakePenaltyRepository {
    penalties: Mutex<Vec<PenaltyRecord>>,
    lists: Mutex<HashMap<UserList, HashSet<String>>>,
    appeals: Mutex<Vec<AppealRequest>>,
}

#[async_trait]
impl PenaltyRepository for FakePenaltyRepository {
    async fn list_penalties(&self, user_id: &str) -> AppResult<Vec<PenaltyRecord>> {
        Ok(self
            .penalties
            .lock()
            .await
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_penalty(&self, penalty_id: &str) -> AppResult<Option<PenaltyRecord>> {
        Ok(self
            .penalties
            .lock()
            .await
            .iter()
            .find(|record| record.id == penalty_id)
            .cloned())
    }

    async fn save_penalty(&self, record: &PenaltyRecord) -> AppResult<()> {
        let mut penalties = self.penalties.lock().await;
        penalties.retain(|stored| stored.id != record.id);
        penalties.push(record.clone());
        Ok(())
    }

    async fn clear_penalties(&self, user_id: &str) -> AppResult<()> {
        self.penalties
            .lock()
            .await
            .retain(|record| record.user_id != user_id);
        Ok(())
    }

    async fn add_to_list(&self, list: UserList, user_id: &str) -> AppResult<()> {
        self.lists
            .lock()
            .await
            .entry(list)
            .or_default()
            .insert(user_id.to_owned());
        Ok(())
    }

    async fn remove_from_list(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        Ok(self
            .lists
            .lock()
            .await
            .get_mut(&list)
            .is_some_and(|members| members.remove(user_id)))
    }

    async fn is_listed(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        Ok(self
            .lists
            .lock()
            .await
            .get(&list)
            .is_some_and(|members| members.contains(user_id)))
    }

    async fn list_members(&self, list: UserList) -> AppResult<Vec<String>> {
        Ok(self
            .lists
            .lock()
            .await
            .get(&list)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        let mut appeals = self.appeals.lock().await;
        if appeals
            .iter()
            .any(|stored| stored.penalty_id == appeal.penalty_id)
        {
            return Err(AppError::Conflict("appeal exists".to_owned()));
        }
        appeals.push(appeal.clone());
        Ok(())
    }

    async fn update_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        let mut appeals = self.appeals.lock().await;
        appeals.retain(|stored| stored.penalty_id != appeal.penalty_id);
        appeals.push(appeal.clone());
        Ok(())
    }

    async fn find_appeal(&self, penalty_id: &str) -> AppResult<Option<AppealRequest>> {
        Ok(self
            .appeals
            .lock()
            .await
            .iter()
            .find(|appeal| appeal.penalty_id == penalty_id)
            .cloned())
    }

    async fn count_appeals(&self, user_id: &str) -> AppResult<u32> {
        let count = self
            .appeals
            .lock()
            .await
            .iter()
            .filter(|appeal| appeal.user_id == user_id)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn list_appeals(&self, status: Option<AppealStatus>) -> AppResult<Vec<AppealRequest>> {
        Ok(self
            .appeals
            .lock()
            .await
            .iter()
            .filter(|appeal| status.is_none_or(|status| appeal.status == status))
            .cloned()
            .collect())
    }
}

/// Penalty repository whose backend can be taken offline mid-test.
#[derive(Default)]
pub(crate) struct SwitchablePenaltyRepository {
    inner: FakePenaltyRepository,
    offline: AtomicBool,
}

impl SwitchablePenaltyRepository {
    pub(crate) fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(unreachable_backend());
        }
        Ok(())
    }
}

#[async_trait]
impl PenaltyRepository for SwitchablePenaltyRepository {
    async fn list_penalties(&self, user_id: &str) -> AppResult<Vec<PenaltyRecord>> {
        self.ensure_online()?;
        self.inner.list_penalties(user_id).await
    }

    async fn find_penalty(&self, penalty_id: &str) -> AppResult<Option<PenaltyRecord>> {
        self.ensure_online()?;
        self.inner.find_penalty(penalty_id).await
    }

    async fn save_penalty(&self, record: &PenaltyRecord) -> AppResult<()> {
        self.ensure_online()?;
        self.inner.save_penalty(record).await
    }

    async fn clear_penalties(&self, user_id: &str) -> AppResult<()> {
        self.ensure_online()?;
        self.inner.clear_penalties(user_id).await
    }

    async fn add_to_list(&self, list: UserList, user_id: &str) -> AppResult<()> {
        self.ensure_online()?;
        self.inner.add_to_list(list, user_id).await
    }

    async fn remove_from_list(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        self.ensure_online()?;
        self.inner.remove_from_list(list, user_id).await
    }

    async fn is_listed(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        self.ensure_online()?;
        self.inner.is_listed(list, user_id).await
    }

    async fn list_members(&self, list: UserList) -> AppResult<Vec<String>> {
        self.ensure_online()?;
        self.inner.list_members(list).await
    }

    async fn create_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        self.ensure_online()?;
        self.inner.create_appeal(appeal).await
    }

    async fn update_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        self.ensure_online()?;
        self.inner.update_appeal(appeal).await
    }

    async fn find_appeal(&self, penalty_id: &str) -> AppResult<Option<AppealRequest>> {
        self.ensure_online()?;
        self.inner.find_appeal(penalty_id).await
    }

    async fn count_appeals(&self, user_id: &str) -> AppResult<u32> {
        self.ensure_online()?;
        self.inner.count_appeals(user_id).await
    }

    async fn list_appeals(&self, status: Option<AppealStatus>) -> AppResult<Vec<AppealRequest>> {
        self.ensure_online()?;
        self.inner.list_appeals(status).await
    }
}

/// Penalty repository whose backend is permanently unreachable.
pub(crate) struct UnavailablePenaltyRepository;

#[async_trait]
impl PenaltyRepository for UnavailablePenaltyRepository {
    async fn list_penalties(&self, _user_id: &str) -> AppResult<Vec<PenaltyRecord>> {
        Err(unreachable_backend())
    }

    async fn find_penalty(&self, _penalty_id: &str) -> AppResult<Option<PenaltyRecord>> {
        Err(unreachable_backend())
    }

    async fn save_penalty(&self, _record: &PenaltyRecord) -> AppResult<()> {
        Err(unreachable_backend())
    }

    async fn clear_penalties(&self, _user_id: &str) -> AppResult<()> {
        Err(unreachable_backend())
    }

    async fn add_to_list(&self, _list: UserList, _user_id: &str) -> AppResult<()> {
        Err(unreachable_backend())
    }

    async fn remove_from_list(&self, _list: UserList, _user_id: &str) -> AppResult<bool> {
        Err(unreachable_backend())
    }

    async fn is_listed(&self, _list: UserList, _user_id: &str) -> AppResult<bool> {
        Err(unreachable_backend())
    }

    async fn list_members(&self, _list: UserList) -> AppResult<Vec<String>> {
        Err(unreachable_backend())
    }

    async fn create_appeal(&self, _appeal: &AppealRequest) -> AppResult<()> {
        Err(unreachable_backend())
    }

    async fn update_appeal(&self, _appeal: &AppealRequest) -> AppResult<()> {
        Err(unreachable_backend())
    }

    async fn find_appeal(&self, _penalty_id: &str) -> AppResult<Option<AppealRequest>> {
        Err(unreachable_backend())
    }

    async fn count_appeals(&self, _user_id: &str) -> AppResult<u32> {
        Err(unreachable_backend())
    }

    async fn list_appeals(&self, _status: Option<AppealStatus>) -> AppResult<Vec<AppealRequest>> {
        Err(unreachable_backend())
    }
}

fn unreachable_backend() -> AppError {
    AppError::Unavailable("backend is unreachable".to_owned())
}
