//! Wallet operation request and result types.

use serde::{Deserialize, Serialize};

use crate::ledger::{Account, AccountId, Transaction, TransactionStatus};

/// How a transfer names its recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRef {
    Id(AccountId),
    Mobile(String),
}

impl std::fmt::Display for RecipientRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipientRef::Id(id) => write!(f, "account {id}"),
            RecipientRef::Mobile(mobile) => write!(f, "mobile {mobile}"),
        }
    }
}

/// Account state and the log entry written with it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub account: Account,
    pub transaction: Transaction,
}

/// Result of a completed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub sender: Account,
    pub recipient: Account,
    /// `share_sent` entry on the sender
    pub sent: Transaction,
    /// `share_received` entry on the recipient
    pub received: Transaction,
}

/// What a settlement attempt did
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Balance delta applied and entry marked processed
    Applied {
        transaction: Transaction,
        account: Account,
    },
    /// Entry was settled earlier; nothing changed
    AlreadyProcessed { transaction: Transaction },
    /// Entry is pending or rejected; nothing changed
    NotApproved { transaction: Transaction },
}

impl SettlementOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            SettlementOutcome::Applied { transaction, .. }
            | SettlementOutcome::AlreadyProcessed { transaction }
            | SettlementOutcome::NotApproved { transaction } => transaction,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, SettlementOutcome::Applied { .. })
    }
}

/// Counts from one settlement scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub scanned: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Administrator decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn status(self) -> TransactionStatus {
        match self {
            ReviewDecision::Approve => TransactionStatus::Approved,
            ReviewDecision::Reject => TransactionStatus::Rejected,
        }
    }
}

/// Result of a review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// Entry after the status change
    pub transaction: Transaction,
    /// Present when the decision was an approval
    pub settlement: Option<SettlementOutcome>,
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub account_id: AccountId,
    pub in_game_name: String,
    /// Current winning balance
    pub points: i64,
}
