//! Account API handlers.
//!
//! Account creation, balance and history queries, and the wallet operations
//! a player triggers from the app.
//!
//! # Examples
//!
//! Open an account:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/accounts \
//!   -H "Content-Type: application/json" \
//!   -d '{"mobile_no": "03001234567", "in_game_name": "Falcon"}'
//! ```
//!
//! Send diamonds to a friend by mobile number:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/accounts/1/transfers \
//!   -H "Content-Type: application/json" \
//!   -d '{"recipient": {"mobile": "03007654321"}, "amount": 250}'
//! ```

use arena_ledger::ledger::{Account, AccountId, Transaction};
use arena_ledger::wallet::{BalanceUpdate, RecipientRef, TransferReceipt};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::{ApiResult, AppState, api_error};

#[derive(Debug, Deserialize)]
pub struct OpenAccountRequest {
    pub mobile_no: String,
    pub in_game_name: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: i64,
    /// Payment provider reference
    pub payment_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: i64,
    /// In-game ID the diamonds are paid out to
    pub game_id: String,
}

/// Registration by catalog entry or by explicit fee
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RegistrationRequest {
    Listed { tournament_id: String },
    Fee { fee: i64 },
}

#[derive(Debug, Deserialize)]
pub struct MatchWinRequest {
    pub prize: i64,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub recipient: RecipientRef,
    pub amount: i64,
}

/// Open a new account with zero balances.
///
/// # Errors
///
/// - `409 Conflict`: Mobile number already registered
/// - `422 Unprocessable Entity`: Malformed mobile number
pub async fn open_account(
    State(state): State<AppState>,
    Json(request): Json<OpenAccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = state
        .wallet
        .open_account(&request.mobile_no, &request.in_game_name)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Get balances for an account.
///
/// # Errors
///
/// - `404 Not Found`: Account doesn't exist
pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> ApiResult<Json<Account>> {
    state
        .wallet
        .get_account(account_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Transaction history, newest first.
pub async fn history(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    state
        .wallet
        .history(account_id, query.limit)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Request a deposit; funds are credited once an administrator approves it.
pub async fn request_deposit(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<DepositRequest>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let tx = state
        .wallet
        .request_deposit(account_id, request.amount, &request.payment_ref)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// Request a withdrawal of diamonds.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Winning balance is too low
pub async fn request_withdrawal(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<WithdrawalRequest>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let tx = state
        .wallet
        .request_withdrawal(account_id, request.amount, &request.game_id)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// Pay a tournament entry fee from deposit funds.
///
/// # Request Body
///
/// ```json
/// {"tournament_id": "vf-clash-1"}
/// ```
/// or
/// ```json
/// {"fee": 500}
/// ```
pub async fn register(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<Json<BalanceUpdate>> {
    let result = match request {
        RegistrationRequest::Listed { tournament_id } => {
            state
                .wallet
                .register_for_listed_tournament(account_id, &tournament_id)
                .await
        }
        RegistrationRequest::Fee { fee } => {
            state.wallet.register_for_tournament(account_id, fee).await
        }
    };
    result.map(Json).map_err(api_error)
}

/// Credit a match prize.
pub async fn add_match_win(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<MatchWinRequest>,
) -> ApiResult<Json<BalanceUpdate>> {
    state
        .wallet
        .add_match_win(account_id, request.prize)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Convert diamonds into deposit funds.
pub async fn convert(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<AmountRequest>,
) -> ApiResult<Json<BalanceUpdate>> {
    state
        .wallet
        .convert_winnings_to_funds(account_id, request.amount)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Send diamonds to another account.
///
/// # Errors
///
/// - `404 Not Found`: Recipient doesn't exist
/// - `409 Conflict`: Wallet stayed busy through every retry
/// - `422 Unprocessable Entity`: Insufficient balance or self transfer
pub async fn transfer(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<TransferRequest>,
) -> ApiResult<Json<TransferReceipt>> {
    state
        .wallet
        .transfer(account_id, &request.recipient, request.amount)
        .await
        .map(Json)
        .map_err(api_error)
}
