//! Ledger tuning loaded from the environment.

use std::time::Duration;

/// Bounded retry for optimistic-concurrency conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub retry: RetryPolicy,
    /// How often the settlement worker scans for approved entries
    pub settlement_poll_interval: Duration,
    /// Maximum entries settled per scan
    pub settlement_batch_size: usize,
    /// Rows returned by the leaderboard
    pub leaderboard_size: usize,
    /// Rows returned by history queries when the caller gives no limit
    pub history_limit: usize,
}

impl LedgerConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `LEDGER_MAX_ATTEMPTS`: Conflict retry attempts (default: 5)
    /// - `LEDGER_RETRY_BACKOFF_MS`: Pause between attempts (default: 10)
    /// - `SETTLEMENT_POLL_INTERVAL_MS`: Settlement scan interval (default: 1000)
    /// - `SETTLEMENT_BATCH_SIZE`: Entries per scan (default: 100)
    /// - `LEADERBOARD_SIZE`: Leaderboard rows (default: 20)
    /// - `HISTORY_LIMIT`: Default history rows (default: 50)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            retry: RetryPolicy {
                max_attempts: parse_env_or("LEDGER_MAX_ATTEMPTS", defaults.retry.max_attempts)
                    .max(1),
                backoff: Duration::from_millis(parse_env_or("LEDGER_RETRY_BACKOFF_MS", 10)),
            },
            settlement_poll_interval: Duration::from_millis(parse_env_or(
                "SETTLEMENT_POLL_INTERVAL_MS",
                1000,
            )),
            settlement_batch_size: parse_env_or(
                "SETTLEMENT_BATCH_SIZE",
                defaults.settlement_batch_size,
            ),
            leaderboard_size: parse_env_or("LEADERBOARD_SIZE", defaults.leaderboard_size),
            history_limit: parse_env_or("HISTORY_LIMIT", defaults.history_limit),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            settlement_poll_interval: Duration::from_secs(1),
            settlement_batch_size: 100,
            leaderboard_size: 20,
            history_limit: 50,
        }
    }
}

/// Helper to parse environment variable with default fallback
pub(crate) fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
