//! Request DTOs for the admin HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::protocol::MAX_KEY_LENGTH;

/// Which cache operation a PUT /set performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetMode {
    /// Insert or overwrite
    #[default]
    Put,
    /// Insert only if the key is absent
    Add,
    /// Overwrite only if the key is present
    Replace,
}

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `mode`: `put` (default), `add` or `replace`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    #[serde(default)]
    pub mode: SetMode,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        if self.key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Some("Key cannot contain whitespace or control characters".to_string());
        }
        None
    }
}
