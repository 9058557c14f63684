//! Uniform JSON envelope returned by the HTTP surface.

use serde::{Deserialize, Serialize};

/// `{"status":"OK","result":...}` on success, `{"status":"Error","error":"..."}`
/// on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ApiResponse<T> {
    #[serde(rename = "OK")]
    Ok { result: T },
    #[serde(rename = "Error")]
    Error { error: String },
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        ApiResponse::Ok { result }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            error: message.into(),
        }
    }
}
