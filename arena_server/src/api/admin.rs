//! Administrator review of pending requests.

use arena_ledger::ledger::TransactionId;
use arena_ledger::wallet::{ReviewDecision, ReviewOutcome};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;

use super::request_id::RequestId;
use super::{ApiResult, AppState, api_error};
use crate::logging::log_review;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
}

/// Approve or reject a pending deposit or withdrawal.
///
/// An approval settles the request before responding when it can.
///
/// # Request Body
///
/// ```json
/// {"decision": "approve"}
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Transaction doesn't exist
/// - `409 Conflict`: Transaction was already finalised
/// - `422 Unprocessable Entity`: Approved withdrawal exceeds the winning balance
pub async fn review_transaction(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(transaction_id): Path<TransactionId>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<ReviewOutcome>> {
    let outcome = state
        .wallet
        .review_transaction(transaction_id, request.decision)
        .await
        .map_err(api_error)?;

    let decision = match request.decision {
        ReviewDecision::Approve => "approve",
        ReviewDecision::Reject => "reject",
    };
    let settled = outcome
        .settlement
        .as_ref()
        .is_some_and(|s| s.is_applied());
    log_review(request_id.as_str(), transaction_id, decision, settled);

    Ok(Json(outcome))
}
