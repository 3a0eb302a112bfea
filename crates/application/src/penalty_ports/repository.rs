use async_trait::async_trait;
use jobgate_core::AppResult;
use jobgate_domain::{AppealRequest, AppealStatus, PenaltyRecord};

use super::UserList;

/// Repository port for penalties, override lists and appeals.
#[async_trait]
pub trait PenaltyRepository: Send + Sync {
    /// Lists every stored penalty of a user, in any order.
    async fn list_penalties(&self, user_id: &str) -> AppResult<Vec<PenaltyRecord>>;

    /// Finds one penalty by identifier.
    async fn find_penalty(&self, penalty_id: &str) -> AppResult<Option<PenaltyRecord>>;

    /// Inserts or replaces one penalty.
    async fn save_penalty(&self, record: &PenaltyRecord) -> AppResult<()>;

    /// Deletes every penalty of a user.
    async fn clear_penalties(&self, user_id: &str) -> AppResult<()>;

    /// Adds a user to an override list.
    async fn add_to_list(&self, list: UserList, user_id: &str) -> AppResult<()>;

    /// Removes a user from an override list. Returns false if absent.
    async fn remove_from_list(&self, list: UserList, user_id: &str) -> AppResult<bool>;

    /// Returns true if the user is on the list.
    async fn is_listed(&self, list: UserList, user_id: &str) -> AppResult<bool>;

    /// Lists the members of an override list.
    async fn list_members(&self, list: UserList) -> AppResult<Vec<String>>;

    /// Stores a new appeal and counts it against the user's appeal total.
    ///
    /// Fails with `AppError::Conflict` if the penalty already has an appeal.
    async fn create_appeal(&self, appeal: &AppealRequest) -> AppResult<()>;

    /// Replaces an existing appeal.
    async fn update_appeal(&self, appeal: &AppealRequest) -> AppResult<()>;

    /// Finds the appeal of a penalty.
    async fn find_appeal(&self, penalty_id: &str) -> AppResult<Option<AppealRequest>>;

    /// Returns how many appeals a user has ever submitted.
    async fn count_appeals(&self, user_id: &str) -> AppResult<u32>;

    /// Lists appeals, optionally filtered by status.
    async fn list_appeals(&self, status: Option<AppealStatus>) -> AppResult<Vec<AppealRequest>>;
}
