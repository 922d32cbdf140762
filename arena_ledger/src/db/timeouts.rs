//! Deadlines for database work.
//!
//! Every ledger query and SQL transaction runs under one of these limits so
//! that a stalled connection surfaces as an error instead of hanging a caller.

use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a whole ledger commit (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Execute a query with timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// Bound an arbitrary fallible future, mapping the deadline through `on_timeout`
pub async fn bounded<F, T, E>(
    duration: Duration,
    future: F,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(duration)),
    }
}
