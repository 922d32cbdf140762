//! Ledger error types.

use super::models::{
    Account, AccountId, BalanceDelta, TransactionId, TransactionKind, TransactionStatus,
};
use crate::db::timeouts::TimeoutError;
use std::time::Duration;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Balance would go negative
    #[error("Insufficient balance on account {account_id}: available {available}, required {required}")]
    InsufficientBalance {
        account_id: AccountId,
        available: i64,
        required: i64,
    },

    /// Concurrent write won the race; retryable
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Conflict retries exhausted
    #[error("Operation aborted after {attempts} conflicting attempts")]
    Aborted { attempts: u32 },

    /// Transfer recipient does not exist
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Sender and recipient are the same account
    #[error("Cannot transfer to the same account")]
    SelfTransfer,

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Mobile number missing or malformed
    #[error("Invalid mobile number: {0}")]
    InvalidMobile(String),

    /// Mobile number already registered
    #[error("Mobile number already registered: {0}")]
    DuplicateMobile(String),

    /// Review decision not allowed from the current status
    #[error("Cannot move transaction {id} from {from} to {to}")]
    InvalidStatusTransition {
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Approved entry has no settlement effect
    #[error("Transaction {id} of kind {kind} cannot be settled")]
    NotSettleable {
        id: TransactionId,
        kind: TransactionKind,
    },

    /// Unknown tournament
    #[error("Tournament not found: {0}")]
    TournamentNotFound(String),

    /// Stored row could not be decoded
    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
}

impl LedgerError {
    /// Error for a `delta` that [`Account::apply`] refused.
    ///
    /// A field that would overflow is an `InvalidAmount`; otherwise the
    /// balance that would go negative is reported as insufficient.
    pub fn rejected_delta(account: &Account, delta: &BalanceDelta, required: i64) -> Self {
        let (Some(deposit_funds), Some(_), Some(_)) = (
            account.deposit_funds.checked_add(delta.deposit_funds),
            account.winning_balance.checked_add(delta.winning_balance),
            account.matches_won.checked_add(delta.matches_won),
        ) else {
            return LedgerError::InvalidAmount(required);
        };

        let available = if deposit_funds < 0 {
            account.deposit_funds
        } else {
            account.winning_balance
        };
        LedgerError::InsufficientBalance {
            account_id: account.id,
            available,
            required,
        }
    }

    /// Whether the operation may succeed if re-run against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }

    /// Get a client-safe error message that doesn't leak internal details
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) | LedgerError::Corrupt(_) => {
                "Internal server error".to_string()
            }
            LedgerError::Timeout(_) => "Service temporarily unavailable".to_string(),
            LedgerError::AccountNotFound(_) => "Account not found".to_string(),
            LedgerError::RecipientNotFound(_) => "Recipient not found".to_string(),
            LedgerError::InsufficientBalance { .. } => "Insufficient balance".to_string(),
            LedgerError::Conflict(_) | LedgerError::Aborted { .. } => {
                "The wallet is busy, please try again".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for LedgerError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => LedgerError::Timeout(duration),
            TimeoutError::Database(e) => LedgerError::Database(e),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(LedgerError::Conflict("version".to_string()).is_retryable());
        assert!(!LedgerError::Aborted { attempts: 3 }.is_retryable());
        assert!(!LedgerError::SelfTransfer.is_retryable());
        assert!(
            !LedgerError::InsufficientBalance {
                account_id: 1,
                available: 0,
                required: 1
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_client_message_hides_ids() {
        let msg = LedgerError::AccountNotFound(42).client_message();
        assert!(!msg.contains("42"));

        let msg = LedgerError::InsufficientBalance {
            account_id: 7,
            available: 10,
            required: 20,
        }
        .client_message();
        assert_eq!(msg, "Insufficient balance");
    }

    fn account(deposit_funds: i64, winning_balance: i64) -> Account {
        Account {
            id: 3,
            mobile_no: "03001234567".to_string(),
            in_game_name: "Viper".to_string(),
            referral_code: "VIPER001".to_string(),
            deposit_funds,
            winning_balance,
            matches_won: 0,
            version: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_rejected_delta_reports_the_short_balance() {
        let acct = account(100, 40);

        let err = LedgerError::rejected_delta(&acct, &BalanceDelta::funds(-150), 150);
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { account_id: 3, available: 100, required: 150 }
        ));

        let err = LedgerError::rejected_delta(&acct, &BalanceDelta::winnings(-50), 50);
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { available: 40, required: 50, .. }
        ));
    }

    #[test]
    fn test_rejected_delta_overflow_is_invalid_amount() {
        let acct = account(i64::MAX, 0);
        let err = LedgerError::rejected_delta(&acct, &BalanceDelta::funds(1), 1);
        assert!(matches!(err, LedgerError::InvalidAmount(1)));
    }

    #[test]
    fn test_timeout_conversion() {
        let err: LedgerError = TimeoutError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, LedgerError::Timeout(d) if d.as_secs() == 5));
    }
}
