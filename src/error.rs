/// Unified error types for Simple Skins
use thiserror::Error;
use uuid::Uuid;

/// Main error type for skin resolution
#[derive(Error, Debug)]
pub enum SkinError {
    /// The name or identity does not map to a player or texture
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The texture endpoint refused the request with 429
    #[error("Rate limited while fetching skin for {0}")]
    RateLimited(Uuid),

    /// Transport errors (connect/read timeouts, refused connections)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A 200 response whose body could not be understood
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Database errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The worker pool no longer accepts tasks
    #[error("Worker pool is shutting down")]
    ShuttingDown,

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SkinError {
    /// Soft failures are expected outcomes and are not logged as errors
    pub fn is_soft(&self) -> bool {
        matches!(self, SkinError::UserNotFound(_) | SkinError::RateLimited(_))
    }
}

impl From<serde_json::Error> for SkinError {
    fn from(e: serde_json::Error) -> Self {
        SkinError::MalformedResponse(e.to_string())
    }
}

/// Result type alias for skin operations
pub type SkinResult<T> = Result<T, SkinError>;
