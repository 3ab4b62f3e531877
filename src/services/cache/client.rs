//! Cache client interface used by the token gate.
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-layer errors (transport/command).
///
/// Note:
/// - We keep this independent from `AppError` so callers can decide how to fail.
///   The gate treats every variant as "cache unavailable" and re-validates.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    BackendConnection(String),
    #[error("cache command error: {0}")]
    BackendCommand(String),
}

/// A minimal, string-based cache interface.
///
/// - `get_string` returning `Ok(None)` means "absent or expired". It is a normal
///   outcome and must never be reported as an error.
/// - Backend failures are `Err(_)` so callers can tell an outage from a miss.
///
/// Implementations are shared behind `Arc<dyn CacheClient>` and must be safe to
/// call from many requests at once.
#[async_trait]
pub trait CacheClient: Send + Sync + 'static {
    // Returns the cache backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // Get UTF-8 string value.
    async fn get_string(&self, key: &str) -> CacheResult<Option<String>>;

    // Set value with TTL, silently overwriting an existing key.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
}
