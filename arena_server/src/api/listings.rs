//! Public listings: leaderboard and tournaments.

use arena_ledger::tournament::Tournament;
use arena_ledger::wallet::LeaderboardEntry;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use super::{ApiResult, AppState, api_error};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Top accounts by winning balance.
///
/// # Response
///
/// ```json
/// [{"rank": 1, "account_id": 7, "in_game_name": "Falcon", "points": 1200}]
/// ```
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    state
        .wallet
        .leaderboard(query.limit)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Tournaments open for registration.
pub async fn tournaments(State(state): State<AppState>) -> Json<Vec<Tournament>> {
    Json(state.wallet.tournaments().to_vec())
}
