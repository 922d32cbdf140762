//! Ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Account ID type
pub type AccountId = i64;

/// Transaction ID type
pub type TransactionId = i64;

/// Per-user balance record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub mobile_no: String,
    pub in_game_name: String,
    pub referral_code: String,
    /// PKR balance used for entry fees
    pub deposit_funds: i64,
    /// Diamonds won in matches
    pub winning_balance: i64,
    pub matches_won: i64,
    /// Bumped on every balance write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Balances after applying `delta`, or `None` if either would go negative
    /// or overflow.
    pub fn apply(&self, delta: &BalanceDelta) -> Option<(i64, i64, i64)> {
        let deposit_funds = self.deposit_funds.checked_add(delta.deposit_funds)?;
        let winning_balance = self.winning_balance.checked_add(delta.winning_balance)?;
        let matches_won = self.matches_won.checked_add(delta.matches_won)?;

        if deposit_funds < 0 || winning_balance < 0 || matches_won < 0 {
            return None;
        }

        Some((deposit_funds, winning_balance, matches_won))
    }
}

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub mobile_no: String,
    pub in_game_name: String,
    pub referral_code: String,
}

/// Signed change to an account's balance fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub deposit_funds: i64,
    pub winning_balance: i64,
    pub matches_won: i64,
}

impl BalanceDelta {
    pub fn funds(amount: i64) -> Self {
        Self {
            deposit_funds: amount,
            ..Self::default()
        }
    }

    pub fn winnings(amount: i64) -> Self {
        Self {
            winning_balance: amount,
            ..Self::default()
        }
    }

    pub fn with_match_won(mut self) -> Self {
        self.matches_won += 1;
        self
    }
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Convert,
    EntryFee,
    Win,
    ShareSent,
    ShareReceived,
}

impl TransactionKind {
    /// Kinds that wait for an administrator before touching balances.
    pub fn requires_approval(self) -> bool {
        matches!(self, TransactionKind::Deposit | TransactionKind::Withdraw)
    }

    /// Balance change applied when an approved request is settled.
    ///
    /// Deposits credit the PKR funds balance; withdrawals pay out diamonds.
    /// Self-settling kinds have no settlement delta.
    pub fn settlement_delta(self, amount: i64) -> Option<BalanceDelta> {
        match self {
            TransactionKind::Deposit => Some(BalanceDelta::funds(amount)),
            TransactionKind::Withdraw => Some(BalanceDelta::winnings(-amount)),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Convert => "convert",
            TransactionKind::EntryFee => "entry_fee",
            TransactionKind::Win => "win",
            TransactionKind::ShareSent => "share_sent",
            TransactionKind::ShareReceived => "share_received",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            "convert" => Ok(TransactionKind::Convert),
            "entry_fee" => Ok(TransactionKind::EntryFee),
            "win" => Ok(TransactionKind::Win),
            "share_sent" => Ok(TransactionKind::ShareSent),
            "share_received" => Ok(TransactionKind::ShareReceived),
            other => Err(format!("unknown transaction kind `{other}`")),
        }
    }
}

/// Transaction review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "approved" => Ok(TransactionStatus::Approved),
            "rejected" => Ok(TransactionStatus::Rejected),
            other => Err(format!("unknown transaction status `{other}`")),
        }
    }
}

/// Append-only transaction log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: i64,
    pub details: Option<String>,
    pub status: TransactionStatus,
    /// Set once the balance effect has been applied
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether an administrator may move this entry to `to`.
    ///
    /// Pending entries may be approved or rejected. An approved entry that
    /// could not be settled may still be rejected.
    pub fn can_transition_to(&self, to: TransactionStatus) -> bool {
        match (self.status, to) {
            (TransactionStatus::Pending, TransactionStatus::Approved) => true,
            (TransactionStatus::Pending, TransactionStatus::Rejected) => true,
            (TransactionStatus::Approved, TransactionStatus::Rejected) => !self.processed,
            _ => false,
        }
    }

    pub fn is_unsettled(&self) -> bool {
        self.status == TransactionStatus::Approved && !self.processed
    }
}

/// Transaction not yet assigned an ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: i64,
    pub details: Option<String>,
    pub status: TransactionStatus,
    pub processed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(deposit_funds: i64, winning_balance: i64) -> Account {
        Account {
            id: 1,
            mobile_no: "03001234567".to_string(),
            in_game_name: "Galaxy".to_string(),
            referral_code: "ABC123".to_string(),
            deposit_funds,
            winning_balance,
            matches_won: 0,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_rejects_negative_balance() {
        let acct = account(100, 50);
        assert_eq!(acct.apply(&BalanceDelta::funds(-100)), Some((0, 50, 0)));
        assert_eq!(acct.apply(&BalanceDelta::funds(-101)), None);
        assert_eq!(acct.apply(&BalanceDelta::winnings(-51)), None);
    }

    #[test]
    fn test_apply_rejects_overflow() {
        let acct = account(i64::MAX, 0);
        assert_eq!(acct.apply(&BalanceDelta::funds(1)), None);
    }

    #[test]
    fn test_settlement_delta_by_kind() {
        assert_eq!(
            TransactionKind::Deposit.settlement_delta(500),
            Some(BalanceDelta::funds(500))
        );
        assert_eq!(
            TransactionKind::Withdraw.settlement_delta(200),
            Some(BalanceDelta::winnings(-200))
        );
        assert_eq!(TransactionKind::Win.settlement_delta(10), None);
    }

    #[test]
    fn test_kind_string_round_trip() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Withdraw,
            TransactionKind::Convert,
            TransactionKind::EntryFee,
            TransactionKind::Win,
            TransactionKind::ShareSent,
            TransactionKind::ShareReceived,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        let mut tx = Transaction {
            id: 1,
            account_id: 1,
            kind: TransactionKind::Withdraw,
            amount: 10,
            details: None,
            status: TransactionStatus::Pending,
            processed: false,
            created_at: Utc::now(),
        };
        assert!(tx.can_transition_to(TransactionStatus::Approved));
        assert!(tx.can_transition_to(TransactionStatus::Rejected));
        assert!(!tx.can_transition_to(TransactionStatus::Pending));

        tx.status = TransactionStatus::Approved;
        assert!(tx.can_transition_to(TransactionStatus::Rejected));
        assert!(!tx.can_transition_to(TransactionStatus::Approved));

        tx.processed = true;
        assert!(!tx.can_transition_to(TransactionStatus::Rejected));

        tx.status = TransactionStatus::Rejected;
        tx.processed = false;
        assert!(!tx.can_transition_to(TransactionStatus::Approved));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TransactionKind::ShareReceived).unwrap();
        assert_eq!(json, "\"share_received\"");
        let json = serde_json::to_string(&TransactionStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }
}
