pub mod http;

use async_trait::async_trait;
use thiserror::Error;
use crate::models::api::{ ChatResponse, HealthStatus, ResetStatus };

pub use self::http::HttpChatApi;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// No response came back from the backend.
    #[error("Network error: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Backend {
        status: u16,
        message: String,
    },
    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),
}

/// The three calls the chat backend exposes. One attempt per call, no retries.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn submit_message(&self, message: &str) -> Result<ChatResponse, ApiError>;

    async fn reset_conversation(&self) -> Result<ResetStatus, ApiError>;

    /// Never fails: an unreachable or unhealthy backend is reported as offline.
    async fn check_health(&self) -> HealthStatus;
}
