//! Mini Memcached - A byte-bounded in-memory cache server
//!
//! Serves a memcached-style text protocol over TCP. Requests run against a
//! byte-bounded LRU cache, either inline on the connection task or on an
//! elastic worker pool. A small HTTP admin API exposes the same cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod protocol;
pub mod server;

pub use api::AppState;
pub use cache::{CacheStore, SharedCache};
pub use config::{Config, WorkerMode};
pub use executor::{ExecutorConfig, TaskExecutor};
pub use server::{run_server, Dispatcher};
