//! Fixed-window rate limiting ports and application service.
//!
//! The window resets lazily: the first request after a window has fully
//! elapsed starts a new one. Despite sometimes being called a sliding window,
//! this is a fixed window and can admit close to twice the quota across a
//! boundary.

mod ports;
mod service;


pub use ports::{CounterStore, WindowSnapshot, window_expired};
pub use service::RateLimitService;
