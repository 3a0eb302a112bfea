//! Redis-backed penalty repository.
//!
//! Records are stored as JSON. Layout under the key prefix:
//! `penalty:{id}` (string), `user_penalties:{user}` (set of ids),
//! `list:{whitelist|blacklist}` (set of users), `appeals` (hash keyed by
//! penalty id) and `appeal_count:{user}` (counter).

use async_trait::async_trait;
use jobgate_application::{PenaltyRepository, UserList};
use jobgate_core::{AppError, AppResult};
use jobgate_domain::{AppealRequest, AppealStatus, PenaltyRecord};
use redis::{AsyncCommands, aio::MultiplexedConnection};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Redis implementation of the penalty repository port.
#[derive(Clone)]
pub struct RedisPenaltyRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPenaltyRepository {
    /// Creates a repository with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn penalty_key(&self, penalty_id: &str) -> String {
        format!("{}:penalty:{penalty_id}", self.key_prefix)
    }

    fn user_penalties_key(&self, user_id: &str) -> String {
        format!("{}:user_penalties:{user_id}", self.key_prefix)
    }

    fn list_key(&self, list: UserList) -> String {
        format!("{}:list:{}", self.key_prefix, list.as_str())
    }

    fn appeals_key(&self) -> String {
        format!("{}:appeals", self.key_prefix)
    }

    fn appeal_count_key(&self, user_id: &str) -> String {
        format!("{}:appeal_count:{user_id}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Unavailable(format!("failed to connect to redis: {error}")))
    }
}

fn command_error(action: &str) -> impl FnOnce(redis::RedisError) -> AppError + '_ {
    move |error| AppError::Unavailable(format!("failed to {action} in redis: {error}"))
}

fn encode<T: Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|error| AppError::Internal(format!("failed to encode penalty state: {error}")))
}

fn decode<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    serde_json::from_str(raw)
        .map_err(|error| AppError::Internal(format!("invalid stored penalty state: {error}")))
}

#[async_trait]
impl PenaltyRepository for RedisPenaltyRepository {
    async fn list_penalties(&self, user_id: &str) -> AppResult<Vec<PenaltyRecord>> {
        let mut connection = self.connection().await?;
        let ids: Vec<String> = connection
            .smembers(self.user_penalties_key(user_id))
            .await
            .map_err(command_error("list user penalties"))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.penalty_key(id)).collect();
        let raw: Vec<Option<String>> = connection
            .mget(keys)
            .await
            .map_err(command_error("read penalties"))?;

        let mut records = raw
            .iter()
            .flatten()
            .map(|value| decode::<PenaltyRecord>(value))
            .collect::<AppResult<Vec<_>>>()?;
        records.sort_by_key(|record| record.issued_at);

        Ok(records)
    }

    async fn find_penalty(&self, penalty_id: &str) -> AppResult<Option<PenaltyRecord>> {
        let mut connection = self.connection().await?;
        let raw: Option<String> = connection
            .get(self.penalty_key(penalty_id))
            .await
            .map_err(command_error("read penalty"))?;

        raw.as_deref().map(decode::<PenaltyRecord>).transpose()
    }

    async fn save_penalty(&self, record: &PenaltyRecord) -> AppResult<()> {
        let payload = encode(record)?;
        let mut connection = self.connection().await?;

        redis::pipe()
            .atomic()
            .set(self.penalty_key(record.id.as_str()), payload)
            .ignore()
            .sadd(self.user_penalties_key(record.user_id.as_str()), record.id.as_str())
            .ignore()
            .query_async::<()>(&mut connection)
            .await
            .map_err(command_error("store penalty"))
    }

    async fn clear_penalties(&self, user_id: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let index_key = self.user_penalties_key(user_id);
        let ids: Vec<String> = connection
            .smembers(index_key.as_str())
            .await
            .map_err(command_error("list user penalties"))?;

        let mut keys: Vec<String> = ids.iter().map(|id| self.penalty_key(id)).collect();
        keys.push(index_key);

        connection
            .del::<_, ()>(keys)
            .await
            .map_err(command_error("clear penalties"))
    }

    async fn add_to_list(&self, list: UserList, user_id: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        connection
            .sadd::<_, _, ()>(self.list_key(list), user_id)
            .await
            .map_err(command_error("add list member"))
    }

    async fn remove_from_list(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        let removed: u32 = connection
            .srem(self.list_key(list), user_id)
            .await
            .map_err(command_error("remove list member"))?;
        Ok(removed > 0)
    }

    async fn is_listed(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        connection
            .sismember(self.list_key(list), user_id)
            .await
            .map_err(command_error("check list membership"))
    }

    async fn list_members(&self, list: UserList) -> AppResult<Vec<String>> {
        let mut connection = self.connection().await?;
        connection
            .smembers(self.list_key(list))
            .await
            .map_err(command_error("list members"))
    }

    async fn create_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        let payload = encode(appeal)?;
        let mut connection = self.connection().await?;

        let created: bool = connection
            .hset_nx(self.appeals_key(), appeal.penalty_id.as_str(), payload)
            .await
            .map_err(command_error("store appeal"))?;
        if !created {
            return Err(AppError::Conflict(format!(
                "penalty '{}' has already been appealed",
                appeal.penalty_id
            )));
        }

        connection
            .incr::<_, _, ()>(self.appeal_count_key(appeal.user_id.as_str()), 1)
            .await
            .map_err(command_error("count appeal"))
    }

    async fn update_appeal(&self, appeal: &AppealRequest) -> AppResult<()> {
        let payload = encode(appeal)?;
        let mut connection = self.connection().await?;

        connection
            .hset::<_, _, _, ()>(self.appeals_key(), appeal.penalty_id.as_str(), payload)
            .await
            .map_err(command_error("update appeal"))
    }

    async fn find_appeal(&self, penalty_id: &str) -> AppResult<Option<AppealRequest>> {
        let mut connection = self.connection().await?;
        let raw: Option<String> = connection
            .hget(self.appeals_key(), penalty_id)
            .await
            .map_err(command_error("read appeal"))?;

        raw.as_deref().map(decode::<AppealRequest>).transpose()
    }

    async fn count_appeals(&self, user_id: &str) -> AppResult<u32> {
        let mut connection = self.connection().await?;
        let count: Option<u32> = connection
            .get(self.appeal_count_key(user_id))
            .await
            .map_err(command_error("read appeal count"))?;
        Ok(count.unwrap_or_default())
    }

    async fn list_appeals(&self, status: Option<AppealStatus>) -> AppResult<Vec<AppealRequest>> {
        let mut connection = self.connection().await?;
        let raw: Vec<String> = connection
            .hvals(self.appeals_key())
            .await
            .map_err(command_error("list appeals"))?;

        let appeals = raw
            .iter()
            .map(|value| decode::<AppealRequest>(value))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(appeals
            .into_iter()
            .filter(|appeal| status.is_none_or(|status| appeal.status == status))
            .collect())
    }
}
