//! Peer-to-peer diamond transfers.

use std::sync::Arc;

use super::models::{RecipientRef, TransferReceipt};
use crate::ledger::recorder::entry;
use crate::ledger::{
    Account, AccountId, AccountWrite, BalanceDelta, LedgerBatch, LedgerError, LedgerResult,
    LedgerStore, RetryPolicy, TransactionKind, with_retry,
};

/// Moves winning balance between two accounts in one commit
#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
}

impl TransferCoordinator {
    pub fn new(store: Arc<dyn LedgerStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Transfer diamonds from one account to another
    ///
    /// # Arguments
    ///
    /// * `sender_id` - Account debited
    /// * `recipient` - Account credited, by ID or mobile number
    /// * `amount` - Positive amount of diamonds
    ///
    /// # Returns
    ///
    /// * `LedgerResult<TransferReceipt>` - Both accounts and both entries
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount is zero or negative
    /// * `LedgerError::RecipientNotFound` - Recipient does not exist
    /// * `LedgerError::SelfTransfer` - Recipient is the sender
    /// * `LedgerError::InsufficientBalance` - Sender's winning balance is too low
    /// * `LedgerError::Aborted` - Conflict retries exhausted
    pub async fn transfer(
        &self,
        sender_id: AccountId,
        recipient: &RecipientRef,
        amount: i64,
    ) -> LedgerResult<TransferReceipt> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let receipt = with_retry(self.retry, "transfer", || {
            self.try_transfer(sender_id, recipient, amount)
        })
        .await?;

        log::info!(
            "Transferred {} diamonds from account {} to account {}",
            amount,
            receipt.sender.id,
            receipt.recipient.id
        );

        Ok(receipt)
    }

    async fn resolve(&self, recipient: &RecipientRef) -> LedgerResult<Account> {
        let found = match recipient {
            RecipientRef::Id(id) => match self.store.get_account(*id).await {
                Ok(account) => Some(account),
                Err(LedgerError::AccountNotFound(_)) => None,
                Err(e) => return Err(e),
            },
            RecipientRef::Mobile(mobile) => self.store.find_account_by_mobile(mobile).await?,
        };

        found.ok_or_else(|| LedgerError::RecipientNotFound(recipient.to_string()))
    }

    async fn try_transfer(
        &self,
        sender_id: AccountId,
        recipient: &RecipientRef,
        amount: i64,
    ) -> LedgerResult<TransferReceipt> {
        let recipient = self.resolve(recipient).await?;
        if recipient.id == sender_id {
            return Err(LedgerError::SelfTransfer);
        }

        let sender = self.store.get_account(sender_id).await?;
        let debit = BalanceDelta::winnings(-amount);
        if sender.apply(&debit).is_none() {
            return Err(LedgerError::rejected_delta(&sender, &debit, amount));
        }
        let credit = BalanceDelta::winnings(amount);
        if recipient.apply(&credit).is_none() {
            return Err(LedgerError::rejected_delta(&recipient, &credit, amount));
        }

        let sent = entry(
            sender.id,
            TransactionKind::ShareSent,
            amount,
            Some(format!("Sent to {}", recipient.in_game_name)),
        )?;
        let received = entry(
            recipient.id,
            TransactionKind::ShareReceived,
            amount,
            Some(format!("Received from {}", sender.in_game_name)),
        )?;

        let batch = LedgerBatch::new()
            .account(AccountWrite::versioned(&sender, debit))
            .account(AccountWrite::versioned(&recipient, credit))
            .append(sent)
            .append(received);
        let receipt = self.store.commit(batch).await?;

        let sender = receipt
            .account(sender.id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(sender.id))?;
        let recipient = receipt
            .account(recipient.id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(recipient.id))?;
        let mut entries = receipt.transactions.into_iter();
        let (Some(sent), Some(received)) = (entries.next(), entries.next()) else {
            return Err(LedgerError::Corrupt(
                "transfer commit returned fewer than two entries".to_string(),
            ));
        };

        Ok(TransferReceipt {
            sender,
            recipient,
            sent,
            received,
        })
    }
}
