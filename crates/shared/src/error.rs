use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body the review API returns alongside non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{error}")]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// Parses a response body, falling back to `None` for anything that is
    /// not the JSON error envelope (HTML error pages, empty bodies).
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|parsed| !parsed.error.trim().is_empty())
    }
}
