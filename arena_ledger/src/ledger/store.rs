//! Ledger store seam.
//!
//! Every balance mutation goes through [`LedgerStore::commit`], which applies
//! a [`LedgerBatch`] all-or-nothing. Implementations must re-check each
//! account write at commit time (expected version, non-negative balances) and
//! apply account writes in ascending account ID order.

use async_trait::async_trait;

use super::errors::{LedgerError, LedgerResult};
use super::models::{
    Account, AccountId, BalanceDelta, NewAccount, NewTransaction, Transaction, TransactionId,
    TransactionStatus,
};

/// Guarded change to one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountWrite {
    pub account_id: AccountId,
    /// Reject the batch if the stored version differs
    pub expected_version: Option<i64>,
    pub delta: BalanceDelta,
}

impl AccountWrite {
    /// Write guarded by the version the caller read.
    pub fn versioned(account: &Account, delta: BalanceDelta) -> Self {
        Self {
            account_id: account.id,
            expected_version: Some(account.version),
            delta,
        }
    }

    /// Write guarded only by the non-negative check.
    pub fn unversioned(account_id: AccountId, delta: BalanceDelta) -> Self {
        Self {
            account_id,
            expected_version: None,
            delta,
        }
    }
}

/// Change to the transaction log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryWrite {
    Append(NewTransaction),
    /// Only succeeds on an approved, unprocessed entry
    MarkProcessed(TransactionId),
}

/// Unit of atomic work against the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    pub accounts: Vec<AccountWrite>,
    pub entries: Vec<EntryWrite>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, write: AccountWrite) -> Self {
        self.accounts.push(write);
        self
    }

    pub fn append(mut self, entry: NewTransaction) -> Self {
        self.entries.push(EntryWrite::Append(entry));
        self
    }

    pub fn mark_processed(mut self, id: TransactionId) -> Self {
        self.entries.push(EntryWrite::MarkProcessed(id));
        self
    }

    /// Account writes in lock order.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Conflict` - The same account appears twice
    pub fn ordered_accounts(&self) -> LedgerResult<Vec<&AccountWrite>> {
        let mut writes: Vec<&AccountWrite> = self.accounts.iter().collect();
        writes.sort_by_key(|w| w.account_id);
        if writes.windows(2).any(|w| w[0].account_id == w[1].account_id) {
            return Err(LedgerError::Conflict(
                "account written twice in one batch".to_string(),
            ));
        }
        Ok(writes)
    }
}

/// State after a successful commit
#[derive(Debug, Clone, Default)]
pub struct CommitReceipt {
    /// Updated accounts in ascending ID order
    pub accounts: Vec<Account>,
    /// Appended or updated entries in batch order
    pub transactions: Vec<Transaction>,
}

impl CommitReceipt {
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

/// Durable ledger backend
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create an account with zero balances
    async fn create_account(&self, account: NewAccount) -> LedgerResult<Account>;

    /// Get account by ID
    async fn get_account(&self, id: AccountId) -> LedgerResult<Account>;

    /// Find account by mobile number
    async fn find_account_by_mobile(&self, mobile_no: &str) -> LedgerResult<Option<Account>>;

    /// Apply a batch atomically
    async fn commit(&self, batch: LedgerBatch) -> LedgerResult<CommitReceipt>;

    /// Get transaction by ID
    async fn get_transaction(&self, id: TransactionId) -> LedgerResult<Transaction>;

    /// Move a transaction to a new review status
    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerResult<Transaction>;

    /// Transactions for an account, newest first
    async fn transactions_for(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Approved entries awaiting settlement, oldest first
    async fn unsettled(&self, limit: usize) -> LedgerResult<Vec<Transaction>>;

    /// Accounts ordered by winning balance, highest first
    async fn top_by_winnings(&self, limit: usize) -> LedgerResult<Vec<Account>>;

    /// Exclusive single-account mutation
    ///
    /// # Errors
    ///
    /// * `LedgerError::Conflict` - A balance would go negative
    async fn apply_delta(&self, id: AccountId, delta: BalanceDelta) -> LedgerResult<Account> {
        let receipt = self
            .commit(LedgerBatch::new().account(AccountWrite::unversioned(id, delta)))
            .await?;
        receipt
            .accounts
            .into_iter()
            .next()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Append a single entry without touching balances
    async fn append_transaction(&self, entry: NewTransaction) -> LedgerResult<Transaction> {
        let account_id = entry.account_id;
        let receipt = self.commit(LedgerBatch::new().append(entry)).await?;
        receipt
            .transactions
            .into_iter()
            .next()
            .ok_or(LedgerError::AccountNotFound(account_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_accounts_sorts_by_id() {
        let batch = LedgerBatch::new()
            .account(AccountWrite::unversioned(9, BalanceDelta::winnings(5)))
            .account(AccountWrite::unversioned(3, BalanceDelta::winnings(-5)));
        let ids: Vec<_> = batch
            .ordered_accounts()
            .unwrap()
            .iter()
            .map(|w| w.account_id)
            .collect();
        assert_eq!(ids, vec![3, 9]);
    }

    #[test]
    fn test_ordered_accounts_rejects_duplicates() {
        let batch = LedgerBatch::new()
            .account(AccountWrite::unversioned(3, BalanceDelta::winnings(5)))
            .account(AccountWrite::unversioned(3, BalanceDelta::winnings(-5)));
        assert!(matches!(
            batch.ordered_accounts(),
            Err(LedgerError::Conflict(_))
        ));
    }
}
