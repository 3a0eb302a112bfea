//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod failover_counter_store;
mod in_memory_counter_store;
mod in_memory_penalty_repository;
mod redis_counter_store;
mod redis_penalty_repository;

pub use failover_counter_store::{CounterBackend, FailoverCounterStore};
pub use in_memory_counter_store::InMemoryCounterStore;
pub use in_memory_penalty_repository::InMemoryPenaltyRepository;
pub use redis_counter_store::RedisCounterStore;
pub use redis_penalty_repository::RedisPenaltyRepository;
