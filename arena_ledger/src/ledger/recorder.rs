//! Transaction recorder: builds and appends log entries.
//!
//! The recorder never touches balances. Requests that need an administrator
//! (deposit, withdraw) start `pending`; everything else is written already
//! approved and processed, alongside the balance change that produced it.

use std::sync::Arc;

use super::errors::{LedgerError, LedgerResult};
use super::models::{
    AccountId, NewTransaction, Transaction, TransactionKind, TransactionStatus,
};
use super::store::LedgerStore;

/// Build a log entry with the initial status its kind requires.
///
/// # Errors
///
/// * `LedgerError::InvalidAmount` - Amount is zero or negative
pub fn entry(
    account_id: AccountId,
    kind: TransactionKind,
    amount: i64,
    details: Option<String>,
) -> LedgerResult<NewTransaction> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }

    let (status, processed) = if kind.requires_approval() {
        (TransactionStatus::Pending, false)
    } else {
        (TransactionStatus::Approved, true)
    };

    Ok(NewTransaction {
        account_id,
        kind,
        amount,
        details,
        status,
        processed,
    })
}

/// Appends entries to the transaction log
#[derive(Clone)]
pub struct TransactionRecorder {
    store: Arc<dyn LedgerStore>,
}

impl TransactionRecorder {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Append a standalone entry
    ///
    /// # Arguments
    ///
    /// * `account_id` - Owning account
    /// * `kind` - Transaction kind
    /// * `amount` - Positive amount
    /// * `details` - Free-text context (payment reference, game ID)
    ///
    /// # Returns
    ///
    /// * `LedgerResult<Transaction>` - Stored entry
    pub async fn record(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount: i64,
        details: Option<String>,
    ) -> LedgerResult<Transaction> {
        let new = entry(account_id, kind, amount, details)?;
        let tx = self.store.append_transaction(new).await?;
        log::debug!(
            "Recorded {} #{} of {} for account {} ({})",
            tx.kind,
            tx.id,
            tx.amount,
            tx.account_id,
            tx.status
        );
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::InMemoryLedgerStore;
    use crate::ledger::models::NewAccount;

    #[test]
    fn test_requests_start_pending() {
        for kind in [TransactionKind::Deposit, TransactionKind::Withdraw] {
            let new = entry(1, kind, 100, None).unwrap();
            assert_eq!(new.status, TransactionStatus::Pending);
            assert!(!new.processed);
        }
    }

    #[test]
    fn test_self_settling_kinds_start_processed() {
        for kind in [
            TransactionKind::Convert,
            TransactionKind::EntryFee,
            TransactionKind::Win,
            TransactionKind::ShareSent,
            TransactionKind::ShareReceived,
        ] {
            let new = entry(1, kind, 100, None).unwrap();
            assert_eq!(new.status, TransactionStatus::Approved);
            assert!(new.processed);
        }
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        assert!(matches!(
            entry(1, TransactionKind::Deposit, 0, None),
            Err(LedgerError::InvalidAmount(0))
        ));
        assert!(matches!(
            entry(1, TransactionKind::Win, -5, None),
            Err(LedgerError::InvalidAmount(-5))
        ));
    }

    #[tokio::test]
    async fn test_record_leaves_balances_alone() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let account = store
            .create_account(NewAccount {
                mobile_no: "03110000000".to_string(),
                in_game_name: "NBL ADIL".to_string(),
                referral_code: "AAAAAA".to_string(),
            })
            .await
            .unwrap();

        let recorder = TransactionRecorder::new(store.clone());
        let tx = recorder
            .record(
                account.id,
                TransactionKind::Deposit,
                1500,
                Some("Payment ID: 99".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.details.as_deref(), Some("Payment ID: 99"));
        let after = store.get_account(account.id).await.unwrap();
        assert_eq!(after.deposit_funds, 0);
        assert_eq!(after.version, 0);
    }
}
