//! TTS synthesis cache.
//!
//! A fingerprint-keyed map from (model, text) to a cache entry with
//! single-flight generation: `submit` is a fire-and-forget prefetch that
//! collapses concurrent callers for the same key onto one synthesis task;
//! `get` blocks, up to a timeout, on that task's completion. A background
//! sweeper evicts entries past their TTL; `submit` evicts on size pressure
//! before inserting.

mod cache;
mod config;
mod entry;
mod sweeper;

pub use cache::Cache;
pub use config::CacheConfig;
pub use entry::{Entry, Status};
pub use sweeper::{spawn_sweeper, SweeperHandle};
