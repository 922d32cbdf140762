//! Settlement of approved deposit and withdrawal requests.
//!
//! Settling re-reads the entry and its account, then commits the balance
//! delta together with the `processed` flag. Delivery may repeat: an entry
//! that is already processed is reported as such and left untouched.

use std::sync::Arc;

use super::models::{SettlementOutcome, SettlementReport};
use crate::ledger::{
    AccountWrite, LedgerBatch, LedgerError, LedgerResult, LedgerStore, RetryPolicy,
    TransactionId, TransactionStatus, with_retry,
};

/// Applies approved requests to balances exactly once
#[derive(Clone)]
pub struct SettlementProcessor {
    store: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
}

impl SettlementProcessor {
    pub fn new(store: Arc<dyn LedgerStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Settle one transaction
    ///
    /// # Arguments
    ///
    /// * `id` - Transaction to settle
    ///
    /// # Returns
    ///
    /// * `LedgerResult<SettlementOutcome>` - What happened to the entry
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientBalance` - Withdrawal exceeds winning balance
    /// * `LedgerError::NotSettleable` - Entry kind has no settlement effect
    /// * `LedgerError::Aborted` - Conflict retries exhausted
    pub async fn settle(&self, id: TransactionId) -> LedgerResult<SettlementOutcome> {
        with_retry(self.retry, "settle", || self.try_settle(id)).await
    }

    /// Settle every approved, unprocessed entry found in one scan
    ///
    /// Failures are logged and counted; they do not stop the scan.
    pub async fn settle_pending(&self, limit: usize) -> LedgerResult<SettlementReport> {
        let pending = self.store.unsettled(limit).await?;
        let mut report = SettlementReport {
            scanned: pending.len(),
            ..SettlementReport::default()
        };

        for tx in pending {
            match self.settle(tx.id).await {
                Ok(outcome) if outcome.is_applied() => report.applied += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    log::warn!("Settlement of transaction {} failed: {}", tx.id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn try_settle(&self, id: TransactionId) -> LedgerResult<SettlementOutcome> {
        let transaction = self.store.get_transaction(id).await?;

        if transaction.processed {
            return Ok(SettlementOutcome::AlreadyProcessed { transaction });
        }
        if transaction.status != TransactionStatus::Approved {
            return Ok(SettlementOutcome::NotApproved { transaction });
        }

        let delta = transaction
            .kind
            .settlement_delta(transaction.amount)
            .ok_or(LedgerError::NotSettleable {
                id,
                kind: transaction.kind,
            })?;

        let account = self.store.get_account(transaction.account_id).await?;
        if account.apply(&delta).is_none() {
            return Err(LedgerError::rejected_delta(
                &account,
                &delta,
                transaction.amount,
            ));
        }

        let batch = LedgerBatch::new()
            .account(AccountWrite::versioned(&account, delta))
            .mark_processed(id);
        let receipt = self.store.commit(batch).await?;

        let account = receipt
            .account(account.id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(account.id))?;
        let transaction = receipt
            .transactions
            .into_iter()
            .next()
            .ok_or(LedgerError::TransactionNotFound(id))?;

        log::info!(
            "Settled {} #{} of {} for account {}",
            transaction.kind,
            transaction.id,
            transaction.amount,
            account.id
        );

        Ok(SettlementOutcome::Applied {
            transaction,
            account,
        })
    }
}
