//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Every handler takes the
//! cache mutex for a single operation and releases it before responding.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{self, CacheStore, SharedCache};
use crate::error::{CacheError, Result};
use crate::executor::TaskExecutor;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetMode, SetRequest, SetResponse, StatsResponse,
};
use crate::server::Dispatcher;

/// Application state shared across all handlers.
///
/// Holds the same cache the protocol server uses, plus the executor (if any)
/// for reporting.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    pub executor: Option<Arc<TaskExecutor>>,
}

impl AppState {
    /// Creates a new AppState owning the given cache store.
    pub fn new(cache: CacheStore) -> Self {
        Self {
            cache: cache::shared(cache),
            executor: None,
        }
    }

    /// Shares the cache and executor of a protocol dispatcher.
    pub fn from_dispatcher(dispatcher: &Dispatcher) -> Self {
        Self {
            cache: Arc::clone(dispatcher.cache()),
            executor: dispatcher.executor().cloned(),
        }
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair according to the requested mode.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let key = req.key;
    let value = req.value.as_bytes();

    let mut cache = state.cache.lock();
    let stored = match req.mode {
        SetMode::Put => cache.put(&key, value),
        SetMode::Add => cache.put_if_absent(&key, value),
        SetMode::Replace => cache.set(&key, value),
    };
    if stored {
        return Ok(Json(SetResponse::new(key)));
    }

    // Tell the caller which precondition failed
    let present = cache.contains(&key);
    drop(cache);
    match req.mode {
        SetMode::Add if present => Err(CacheError::AlreadyExists(key)),
        SetMode::Replace if !present => Err(CacheError::NotFound(key)),
        _ => Err(CacheError::TooLarge(key)),
    }
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key and promotes it.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let mut cache = state.cache.lock();
    match cache.get(&key) {
        Some(value) => {
            let response = GetResponse::new(key.as_str(), value);
            Ok(Json(response))
        }
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.cache.lock().delete(&key);
    if !deleted {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
///
/// Returns cache statistics and, in pooled mode, the executor snapshot.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.lock().stats();
    let executor = state.executor.as_ref().map(|executor| executor.stats());

    Json(StatsResponse::new(cache, executor))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
