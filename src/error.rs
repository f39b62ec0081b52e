//! Error types for the cache server
//!
//! Provides unified error handling using thiserror. Expected outcomes of
//! cache and executor operations (absent key, record too large, queue full)
//! are plain `bool`/`Option` results; the enums below cover the surfaces
//! that need a reason: the admin API, the text protocol, pool startup and
//! configuration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors reported by the admin HTTP API.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key already present (add on an existing key)
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// Record larger than the whole cache
    #[error("Record too large: {0}")]
    TooLarge(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::AlreadyExists(_) => StatusCode::CONFLICT,
            CacheError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Protocol Error Enum ==
/// Malformed input on the text protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Unknown command name
    #[error("unknown command")]
    UnknownCommand,

    /// Header line is missing or has invalid fields
    #[error("bad command line format")]
    BadFormat,

    /// Key is empty, too long, or contains control characters
    #[error("invalid key")]
    InvalidKey,

    /// Data block was not terminated by CRLF
    #[error("bad data chunk")]
    BadDataChunk,

    /// Header line exceeds the line limit
    #[error("line too long")]
    LineTooLong,

    /// Announced data block exceeds the value limit
    #[error("value too large")]
    ValueTooLarge,
}

impl ProtocolError {
    /// Whether the connection can keep going after replying.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ProtocolError::LineTooLong | ProtocolError::ValueTooLarge
        )
    }
}

// == Executor Errors ==
/// Why a task was not admitted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Executor is not in the running state
    #[error("executor is not running")]
    NotRunning,

    /// Backlog already holds `max_queue_size` tasks
    #[error("task queue is full")]
    QueueFull,
}

/// Failures of executor lifecycle calls.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The OS refused to create a worker thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// `start` called after `stop`
    #[error("executor has already been stopped")]
    Terminated,

    /// Watermarks the pool cannot run with
    #[error("invalid executor configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

// == Config Error ==
/// Invalid configuration values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MAX_BYTES must be greater than zero")]
    ZeroCapacity,

    #[error("executor high watermark must be greater than zero")]
    ZeroHighWatermark,

    #[error("executor low watermark ({low}) exceeds high watermark ({high})")]
    WatermarkOrder { low: usize, high: usize },

    #[error("unknown WORKER_MODE: {0}")]
    UnknownWorkerMode(String),
}

// == Result Type Alias ==
/// Convenience Result type for the admin API.
pub type Result<T> = std::result::Result<T, CacheError>;
