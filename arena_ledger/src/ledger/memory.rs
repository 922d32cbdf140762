//! In-memory ledger store.
//!
//! Commits are serialised behind one mutex, so every batch observes and
//! produces a consistent snapshot. Used by tests and single-node demos.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::errors::{LedgerError, LedgerResult};
use super::models::{
    Account, AccountId, NewAccount, Transaction, TransactionId, TransactionStatus,
};
use super::store::{CommitReceipt, EntryWrite, LedgerBatch, LedgerStore};

#[derive(Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    by_mobile: HashMap<String, AccountId>,
    transactions: BTreeMap<TransactionId, Transaction>,
    next_account_id: AccountId,
    next_transaction_id: TransactionId,
}

/// Ledger store held in process memory
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries in the log
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    /// Snapshot of every account, ordered by ID
    pub async fn accounts(&self) -> Vec<Account> {
        self.state.lock().await.accounts.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_account(&self, account: NewAccount) -> LedgerResult<Account> {
        let mut state = self.state.lock().await;

        if state.by_mobile.contains_key(&account.mobile_no) {
            return Err(LedgerError::DuplicateMobile(account.mobile_no));
        }

        state.next_account_id += 1;
        let now = Utc::now();
        let created = Account {
            id: state.next_account_id,
            mobile_no: account.mobile_no,
            in_game_name: account.in_game_name,
            referral_code: account.referral_code,
            deposit_funds: 0,
            winning_balance: 0,
            matches_won: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        state
            .by_mobile
            .insert(created.mobile_no.clone(), created.id);
        state.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.state
            .lock()
            .await
            .accounts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn find_account_by_mobile(&self, mobile_no: &str) -> LedgerResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .by_mobile
            .get(mobile_no)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn commit(&self, batch: LedgerBatch) -> LedgerResult<CommitReceipt> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        // Validate everything against the current snapshot before writing.
        let mut updated = Vec::with_capacity(batch.accounts.len());
        for write in batch.ordered_accounts()? {
            let current = state
                .accounts
                .get(&write.account_id)
                .ok_or(LedgerError::AccountNotFound(write.account_id))?;

            if write.expected_version.is_some_and(|v| v != current.version) {
                return Err(LedgerError::Conflict(format!(
                    "account {} changed since it was read (now version {})",
                    current.id, current.version
                )));
            }

            let (deposit_funds, winning_balance, matches_won) =
                current.apply(&write.delta).ok_or_else(|| {
                    LedgerError::Conflict(format!(
                        "write would drive account {} negative",
                        current.id
                    ))
                })?;

            let mut next = current.clone();
            next.deposit_funds = deposit_funds;
            next.winning_balance = winning_balance;
            next.matches_won = matches_won;
            next.version += 1;
            next.updated_at = now;
            updated.push(next);
        }

        for entry in &batch.entries {
            match entry {
                EntryWrite::Append(new) => {
                    if !state.accounts.contains_key(&new.account_id) {
                        return Err(LedgerError::AccountNotFound(new.account_id));
                    }
                    if new.amount <= 0 {
                        return Err(LedgerError::InvalidAmount(new.amount));
                    }
                }
                EntryWrite::MarkProcessed(id) => {
                    let tx = state
                        .transactions
                        .get(id)
                        .ok_or(LedgerError::TransactionNotFound(*id))?;
                    if !tx.is_unsettled() {
                        return Err(LedgerError::Conflict(format!(
                            "transaction {id} is no longer awaiting settlement"
                        )));
                    }
                }
            }
        }

        // Apply.
        for account in &updated {
            state.accounts.insert(account.id, account.clone());
        }

        let mut transactions = Vec::with_capacity(batch.entries.len());
        for entry in batch.entries {
            match entry {
                EntryWrite::Append(new) => {
                    state.next_transaction_id += 1;
                    let tx = Transaction {
                        id: state.next_transaction_id,
                        account_id: new.account_id,
                        kind: new.kind,
                        amount: new.amount,
                        details: new.details,
                        status: new.status,
                        processed: new.processed,
                        created_at: now,
                    };
                    state.transactions.insert(tx.id, tx.clone());
                    transactions.push(tx);
                }
                EntryWrite::MarkProcessed(id) => {
                    if let Some(tx) = state.transactions.get_mut(&id) {
                        tx.processed = true;
                        transactions.push(tx.clone());
                    }
                }
            }
        }

        Ok(CommitReceipt {
            accounts: updated,
            transactions,
        })
    }

    async fn get_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.state
            .lock()
            .await
            .transactions
            .get(&id)
            .cloned()
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerResult<Transaction> {
        let mut state = self.state.lock().await;
        let tx = state
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        if !tx.can_transition_to(status) {
            return Err(LedgerError::InvalidStatusTransition {
                id,
                from: tx.status,
                to: status,
            });
        }

        tx.status = status;
        Ok(tx.clone())
    }

    async fn transactions_for(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> LedgerResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .values()
            .rev()
            .filter(|tx| tx.account_id == account_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn unsettled(&self, limit: usize) -> LedgerResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .values()
            .filter(|tx| tx.is_unsettled())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn top_by_winnings(&self, limit: usize) -> LedgerResult<Vec<Account>> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            b.winning_balance
                .cmp(&a.winning_balance)
                .then(a.id.cmp(&b.id))
        });
        accounts.truncate(limit);
        Ok(accounts)
    }
}
