use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body returned by the backend, e.g. `{"error": "Name is required"}`.
/// A non-2xx status is authoritative; this body only enriches diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{error}")]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
