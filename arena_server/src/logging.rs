//! Structured logging configuration.
//!
//! The ledger library logs through the `log` facade; `tracing-subscriber`
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use arena_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log an administrator review decision
///
/// # Arguments
///
/// * `request_id` - Correlation ID of the HTTP request
/// * `transaction_id` - Reviewed transaction
/// * `decision` - `approve` or `reject`
/// * `settled` - Whether the balance moved as part of the review
pub fn log_review(request_id: &str, transaction_id: i64, decision: &str, settled: bool) {
    tracing::info!(
        request_id = request_id,
        transaction_id = transaction_id,
        decision = decision,
        settled = settled,
        "Transaction reviewed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_log_review() {
        // Just ensure it doesn't panic without a subscriber
        log_review("req-1", 42, "approve", true);
    }
}
