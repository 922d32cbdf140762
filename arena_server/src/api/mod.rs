//! HTTP API for the arena wallet ledger.
//!
//! A thin JSON layer over [`WalletManager`]. Handlers parse the request,
//! call one wallet operation and map [`LedgerError`] onto a status code.
//!
//! # Modules
//!
//! - [`accounts`]: Account creation, balances, history and wallet operations
//! - [`admin`]: Administrator review of pending deposits and withdrawals
//! - [`listings`]: Leaderboard and tournament catalog
//! - [`request_id`]: Request correlation middleware
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use arena_ledger::ledger::{InMemoryLedgerStore, LedgerConfig};
//! use arena_ledger::wallet::WalletManager;
//! use arena_server::api::{create_router, AppState};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let wallet = WalletManager::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default());
//! let app = create_router(AppState::new(Arc::new(wallet), None));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod accounts;
pub mod admin;
pub mod listings;
pub mod request_id;

use arena_ledger::LedgerError;
use arena_ledger::db::Database;
use arena_ledger::wallet::WalletManager;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub wallet: Arc<WalletManager>,
    /// Present when the ledger is backed by PostgreSQL
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(wallet: Arc<WalletManager>, db: Option<Database>) -> Self {
        Self { wallet, db }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error: status code plus JSON body
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Handler result
pub type ApiResult<T> = Result<T, ApiError>;

/// Status code for a ledger error
pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::AccountNotFound(_)
        | LedgerError::TransactionNotFound(_)
        | LedgerError::RecipientNotFound(_)
        | LedgerError::TournamentNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InsufficientBalance { .. }
        | LedgerError::InvalidAmount(_)
        | LedgerError::InvalidMobile(_)
        | LedgerError::SelfTransfer
        | LedgerError::NotSettleable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::DuplicateMobile(_)
        | LedgerError::InvalidStatusTransition { .. }
        | LedgerError::Conflict(_)
        | LedgerError::Aborted { .. } => StatusCode::CONFLICT,
        LedgerError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Database(_) | LedgerError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a ledger error into a sanitized HTTP error
pub fn api_error(err: LedgerError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Ledger operation failed");
    } else {
        tracing::debug!(error = %err, "Ledger operation rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                                    - Health check
/// POST /api/v1/accounts                           - Open account
/// GET  /api/v1/accounts/{id}                      - Balances
/// GET  /api/v1/accounts/{id}/transactions         - History, newest first
/// POST /api/v1/accounts/{id}/deposits             - Request deposit
/// POST /api/v1/accounts/{id}/withdrawals          - Request withdrawal
/// POST /api/v1/accounts/{id}/registrations        - Pay entry fee
/// POST /api/v1/accounts/{id}/wins                 - Credit match win
/// POST /api/v1/accounts/{id}/conversions          - Convert winnings to funds
/// POST /api/v1/accounts/{id}/transfers            - Send diamonds
/// GET  /api/v1/leaderboard                        - Top accounts by winnings
/// GET  /api/v1/tournaments                        - Tournament catalog
/// POST /api/v1/admin/transactions/{id}/review     - Approve or reject
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(accounts::open_account))
        .route("/accounts/{account_id}", get(accounts::get_account))
        .route("/accounts/{account_id}/transactions", get(accounts::history))
        .route(
            "/accounts/{account_id}/deposits",
            post(accounts::request_deposit),
        )
        .route(
            "/accounts/{account_id}/withdrawals",
            post(accounts::request_withdrawal),
        )
        .route(
            "/accounts/{account_id}/registrations",
            post(accounts::register),
        )
        .route("/accounts/{account_id}/wins", post(accounts::add_match_win))
        .route("/accounts/{account_id}/conversions", post(accounts::convert))
        .route("/accounts/{account_id}/transfers", post(accounts::transfer))
        .route("/leaderboard", get(listings::leaderboard))
        .route("/tournaments", get(listings::tournaments))
        .route(
            "/admin/transactions/{transaction_id}/review",
            post(admin::review_transaction),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the ledger backend is reachable, or
/// `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (backend, healthy) = match &state.db {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": backend,
        "database": healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
