use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use jobgate_application::{PenaltyRepository, UserList};
use jobgate_core::{AppError, AppResult};
use jobgate_domain::{AppealRequest, AppealStatus, PenaltyRecord};
use tokio::sync::RwLock;

/// In-memory penalty repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryPenaltyRepository {
    penalties: RwLock<HashMap<String, PenaltyRecord>>,
    lists: RwLock<HashMap<UserList, BTreeSet<String>>>,
    appeals: RwLock<HashMap<String, AppealRequest>>,
}

impl InMemoryPenaltyRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PenaltyRepository for InMemoryPenaltyRepository {
    async fn list_penalties(&self, user_id: &str) -> AppResult<Vec<PenaltyRecord>> {
        let penalties = self.penalties.read().await;

        let mut records: Vec<PenaltyRecord> = penalties
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.issued_at);

        Ok(records)
    }

    async fn find_penalty(&self, penalty_id: &str) -> AppResult<Option<PenaltyRecord>> {
        Ok(self.penalties.read().await.get(penalty_id).cloned())
    }

    async fn save_penalty(&self, record: &PenaltyRecord) -> AppResult<()> {
        self.penalties
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn clear_penalties(&self, user_id: &str) -> AppResult<()> {
        self.penalties
            .write()
            .await
            .retain(|_, record| record.user_id != user_id);
        Ok(())
    }

    async fn add_to_list(&self, list: UserList, user_id: &str) -> AppResult<()> {
        self.lists
            .write()
            .await
            .entry(list)
            .or_default()
            .insert(user_id.to_owned());
        Ok(())
    }

    async fn remove_from_list(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        Ok(self
            .lists
            .write()
            .await
            .get_mut(&list)
            .is_some_and(|members| members.remove(user_id)))
    }

    async fn is_listed(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        Ok(self
            .lists
            .read()
            .await
            .get(&list)
            .is_some_and(|members| members.contains(user_id)))
    }

    async fn list_members(&self, list: UserList) -> AppResult<Vec<String>> {
        Ok(self
            .lists
            .read()
            .await
            .get(&list)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        let mut appeals = self.appeals.write().await;

        if appeals.contains_key(&appeal.penalty_id) {
            return Err(AppError::Conflict(format!(
                "penalty '{}' has already been appealed",
                appeal.penalty_id
            )));
        }

        appeals.insert(appeal.penalty_id.clone(), appeal.clone());
        Ok(())
    }

    async fn update_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        let mut appeals = self.appeals.write().await;

        let Some(stored) = appeals.get_mut(&appeal.penalty_id) else {
            return Err(AppError::NotFound(format!(
                "no appeal exists for penalty '{}'",
                appeal.penalty_id
            )));
        };
        *stored = appeal.clone();

        Ok(())
    }

    async fn find_appeal(&self, penalty_id: &str) -> AppResult<Option<AppealRequest>> {
        Ok(self.appeals.read().await.get(penalty_id).cloned())
    }

    async fn count_appeals(&self, user_id: &str) -> AppResult<u32> {
        let count = self
            .appeals
            .read()
            .await
            .values()
            .filter(|appeal| appeal.user_id == user_id)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn list_appeals(&self, status: Option<AppealStatus>) -> AppResult<Vec<AppealRequest>> {
        Ok(self
            .appeals
            .read()
            .await
            .values()
            .filter(|appeal| status.is_none_or(|status| appeal.status == status))
            .cloned()
            .collect())
    }
}
