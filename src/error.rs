//! Cache error types

use redis::RedisError;

/// Cache-related errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend was disabled through [`crate::CacheBackend::disable`].
    #[error("Caching is not enabled")]
    Disabled,

    /// Missing or invalid setup: no backend attached, empty prefix, bad URL.
    #[error("Cache configuration error: {0}")]
    Configuration(String),

    /// The store client could not be created or its first connection failed.
    #[error("Cache connection unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
}

impl CacheError {
    /// Whether the caller should fall back to computing the value directly.
    ///
    /// Only a disabled backend qualifies; configuration and connection
    /// failures are meant to stop the service rather than be papered over.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::Disabled)
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
