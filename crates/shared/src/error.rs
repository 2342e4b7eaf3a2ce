use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure body returned by every backend route: `{ "detail": ... }`.
///
/// `detail` is usually a plain string, but validation failures may carry a
/// structured value, so it is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub detail: Value,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Value::String(detail.into()),
        }
    }

    pub fn structured(detail: Value) -> Self {
        Self { detail }
    }

    /// Human-readable form of `detail`: strings verbatim, anything else as compact JSON.
    pub fn detail_text(&self) -> String {
        match &self.detail {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
