//! Wallet manager: the caller-facing facade over the ledger.

use rand::Rng;
use std::sync::Arc;
use tokio::sync::Notify;

use super::models::{
    BalanceUpdate, LeaderboardEntry, RecipientRef, ReviewDecision, ReviewOutcome,
    SettlementOutcome, SettlementReport, TransferReceipt,
};
use super::settlement::SettlementProcessor;
use super::transfer::TransferCoordinator;
use super::worker::SettlementWorker;
use crate::ledger::recorder::entry;
use crate::ledger::{
    Account, AccountId, AccountWrite, BalanceDelta, LedgerBatch, LedgerConfig, LedgerError,
    LedgerResult, LedgerStore, NewAccount, NewTransaction, Transaction, TransactionId,
    TransactionKind, TransactionRecorder, with_retry,
};
use crate::tournament::{Tournament, TournamentCatalog};

/// Minimum length of a mobile number
pub const MIN_MOBILE_LEN: usize = 10;

/// Length of generated referral codes
pub const REFERRAL_CODE_LEN: usize = 8;

/// Wallet manager
#[derive(Clone)]
pub struct WalletManager {
    store: Arc<dyn LedgerStore>,
    recorder: TransactionRecorder,
    settlement: Arc<SettlementProcessor>,
    transfers: TransferCoordinator,
    catalog: Arc<TournamentCatalog>,
    config: LedgerConfig,
    wake: Arc<Notify>,
}

impl WalletManager {
    /// Create a new wallet manager with the default tournament catalog
    ///
    /// # Arguments
    ///
    /// * `store` - Ledger backend
    /// * `config` - Retry and query tuning
    ///
    /// # Returns
    ///
    /// * `WalletManager` - New wallet manager instance
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self::with_catalog(store, config, TournamentCatalog::default())
    }

    /// Create a wallet manager with a custom tournament catalog
    pub fn with_catalog(
        store: Arc<dyn LedgerStore>,
        config: LedgerConfig,
        catalog: TournamentCatalog,
    ) -> Self {
        Self {
            recorder: TransactionRecorder::new(store.clone()),
            settlement: Arc::new(SettlementProcessor::new(store.clone(), config.retry)),
            transfers: TransferCoordinator::new(store.clone(), config.retry),
            catalog: Arc::new(catalog),
            wake: Arc::new(Notify::new()),
            store,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Background worker sharing this manager's processor and wake signal
    pub fn settlement_worker(&self) -> SettlementWorker {
        SettlementWorker::new(
            self.settlement.clone(),
            self.config.settlement_poll_interval,
            self.config.settlement_batch_size,
            self.wake.clone(),
        )
    }

    /// Open an account with zero balances
    ///
    /// # Arguments
    ///
    /// * `mobile_no` - Mobile number, digits with an optional leading `+`
    /// * `in_game_name` - Display name shown on the leaderboard
    ///
    /// # Returns
    ///
    /// * `LedgerResult<Account>` - New account with a generated referral code
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidMobile` - Mobile number is malformed
    /// * `LedgerError::DuplicateMobile` - Mobile number already registered
    pub async fn open_account(&self, mobile_no: &str, in_game_name: &str) -> LedgerResult<Account> {
        let mobile_no = mobile_no.trim();
        if !is_valid_mobile(mobile_no) {
            return Err(LedgerError::InvalidMobile(mobile_no.to_string()));
        }

        let account = self
            .store
            .create_account(NewAccount {
                mobile_no: mobile_no.to_string(),
                in_game_name: in_game_name.trim().to_string(),
                referral_code: referral_code(),
            })
            .await?;

        log::info!("Opened account {} for {}", account.id, account.in_game_name);
        Ok(account)
    }

    /// Get account by ID
    pub async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        self.store.get_account(account_id).await
    }

    /// Transaction history, newest first
    ///
    /// # Arguments
    ///
    /// * `account_id` - Account ID
    /// * `limit` - Maximum entries, or the configured default
    pub async fn history(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.store.get_account(account_id).await?;
        let limit = limit.unwrap_or(self.config.history_limit);
        self.store.transactions_for(account_id, limit).await
    }

    /// Accounts ranked by winning balance, ties broken by account ID
    pub async fn leaderboard(&self, limit: Option<usize>) -> LedgerResult<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(self.config.leaderboard_size);
        let accounts = self.store.top_by_winnings(limit).await?;

        Ok(accounts
            .into_iter()
            .enumerate()
            .map(|(i, account)| LeaderboardEntry {
                rank: i + 1,
                account_id: account.id,
                in_game_name: account.in_game_name,
                points: account.winning_balance,
            })
            .collect())
    }

    /// Tournaments open for registration
    pub fn tournaments(&self) -> &[Tournament] {
        self.catalog.list()
    }

    /// Record a pending deposit of PKR funds
    ///
    /// The balance is credited when an administrator approves the request.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount is zero or negative
    /// * `LedgerError::AccountNotFound` - Account does not exist
    pub async fn request_deposit(
        &self,
        account_id: AccountId,
        amount: i64,
        payment_ref: &str,
    ) -> LedgerResult<Transaction> {
        let tx = self
            .recorder
            .record(
                account_id,
                TransactionKind::Deposit,
                amount,
                Some(format!("Payment ID: {}", payment_ref.trim())),
            )
            .await?;

        log::info!(
            "Deposit request #{} of {} for account {}",
            tx.id,
            amount,
            account_id
        );
        Ok(tx)
    }

    /// Record a pending withdrawal of diamonds
    ///
    /// The winning balance is checked now and debited at settlement.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount is zero or negative
    /// * `LedgerError::InsufficientBalance` - Winning balance is too low
    pub async fn request_withdrawal(
        &self,
        account_id: AccountId,
        amount: i64,
        game_id: &str,
    ) -> LedgerResult<Transaction> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let account = self.store.get_account(account_id).await?;
        let delta = BalanceDelta::winnings(-amount);
        if account.apply(&delta).is_none() {
            return Err(LedgerError::rejected_delta(&account, &delta, amount));
        }

        let tx = self
            .recorder
            .record(
                account_id,
                TransactionKind::Withdraw,
                amount,
                Some(format!("Game ID: {}", game_id.trim())),
            )
            .await?;

        log::info!(
            "Withdrawal request #{} of {} for account {}",
            tx.id,
            amount,
            account_id
        );
        Ok(tx)
    }

    /// Apply an administrator decision to a pending request
    ///
    /// An approval settles the entry straight away. If settlement hits a
    /// transient failure the entry stays approved and the settlement worker
    /// is nudged to pick it up.
    ///
    /// # Errors
    ///
    /// * `LedgerError::TransactionNotFound` - Transaction does not exist
    /// * `LedgerError::InvalidStatusTransition` - Entry is already final
    /// * `LedgerError::InsufficientBalance` - Approved withdrawal cannot be paid
    pub async fn review_transaction(
        &self,
        id: TransactionId,
        decision: ReviewDecision,
    ) -> LedgerResult<ReviewOutcome> {
        let transaction = self.store.set_status(id, decision.status()).await?;
        log::info!("Transaction #{} marked {}", id, transaction.status);

        if decision == ReviewDecision::Reject {
            return Ok(ReviewOutcome {
                transaction,
                settlement: None,
            });
        }

        match self.settlement.settle(id).await {
            Ok(outcome) => Ok(ReviewOutcome {
                transaction: outcome.transaction().clone(),
                settlement: Some(outcome),
            }),
            Err(
                e @ (LedgerError::Aborted { .. }
                | LedgerError::Timeout(_)
                | LedgerError::Database(_)),
            ) => {
                log::warn!("Deferred settlement of transaction #{}: {}", id, e);
                self.wake.notify_one();
                Ok(ReviewOutcome {
                    transaction,
                    settlement: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Settle one approved request
    pub async fn settle(&self, id: TransactionId) -> LedgerResult<SettlementOutcome> {
        self.settlement.settle(id).await
    }

    /// Settle a batch of approved requests
    pub async fn settle_pending(&self) -> LedgerResult<SettlementReport> {
        self.settlement
            .settle_pending(self.config.settlement_batch_size)
            .await
    }

    /// Pay a tournament entry fee from deposit funds
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Fee is zero or negative
    /// * `LedgerError::InsufficientBalance` - Deposit funds are too low
    pub async fn register_for_tournament(
        &self,
        account_id: AccountId,
        fee: i64,
    ) -> LedgerResult<BalanceUpdate> {
        self.pay_entry_fee(account_id, fee, None).await
    }

    /// Pay the entry fee of a listed tournament
    ///
    /// # Errors
    ///
    /// * `LedgerError::TournamentNotFound` - Tournament is not in the catalog
    /// * `LedgerError::InsufficientBalance` - Deposit funds are too low
    pub async fn register_for_listed_tournament(
        &self,
        account_id: AccountId,
        tournament_id: &str,
    ) -> LedgerResult<BalanceUpdate> {
        let tournament = self
            .catalog
            .get(tournament_id)
            .ok_or_else(|| LedgerError::TournamentNotFound(tournament_id.to_string()))?;

        self.pay_entry_fee(account_id, tournament.entry_fee, Some(tournament.name.clone()))
            .await
    }

    async fn pay_entry_fee(
        &self,
        account_id: AccountId,
        fee: i64,
        details: Option<String>,
    ) -> LedgerResult<BalanceUpdate> {
        if fee <= 0 {
            return Err(LedgerError::InvalidAmount(fee));
        }

        self.self_settling(
            "register",
            account_id,
            TransactionKind::EntryFee,
            fee,
            BalanceDelta::funds(-fee),
            details,
        )
        .await
    }

    /// Credit a match prize and count the win
    pub async fn add_match_win(
        &self,
        account_id: AccountId,
        prize: i64,
    ) -> LedgerResult<BalanceUpdate> {
        self.self_settling(
            "match_win",
            account_id,
            TransactionKind::Win,
            prize,
            BalanceDelta::winnings(prize).with_match_won(),
            None,
        )
        .await
    }

    /// Move diamonds from winning balance to deposit funds
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount is zero or negative
    /// * `LedgerError::InsufficientBalance` - Winning balance is too low
    pub async fn convert_winnings_to_funds(
        &self,
        account_id: AccountId,
        amount: i64,
    ) -> LedgerResult<BalanceUpdate> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let delta = BalanceDelta {
            deposit_funds: amount,
            winning_balance: -amount,
            matches_won: 0,
        };
        self.self_settling(
            "convert",
            account_id,
            TransactionKind::Convert,
            amount,
            delta,
            None,
        )
        .await
    }

    /// Transfer diamonds to another account
    pub async fn transfer(
        &self,
        sender_id: AccountId,
        recipient: &RecipientRef,
        amount: i64,
    ) -> LedgerResult<TransferReceipt> {
        self.transfers.transfer(sender_id, recipient, amount).await
    }

    async fn self_settling(
        &self,
        operation: &str,
        account_id: AccountId,
        kind: TransactionKind,
        amount: i64,
        delta: BalanceDelta,
        details: Option<String>,
    ) -> LedgerResult<BalanceUpdate> {
        let new = entry(account_id, kind, amount, details)?;
        let update = with_retry(self.config.retry, operation, || {
            self.try_single(account_id, delta, new.clone())
        })
        .await?;

        log::info!(
            "{} #{} of {} for account {}",
            kind,
            update.transaction.id,
            amount,
            account_id
        );
        Ok(update)
    }

    async fn try_single(
        &self,
        account_id: AccountId,
        delta: BalanceDelta,
        new: NewTransaction,
    ) -> LedgerResult<BalanceUpdate> {
        let account = self.store.get_account(account_id).await?;
        if account.apply(&delta).is_none() {
            return Err(LedgerError::rejected_delta(&account, &delta, new.amount));
        }

        let batch = LedgerBatch::new()
            .account(AccountWrite::versioned(&account, delta))
            .append(new);
        let receipt = self.store.commit(batch).await?;

        let account = receipt
            .account(account_id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let transaction = receipt
            .transactions
            .into_iter()
            .next()
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        Ok(BalanceUpdate {
            account,
            transaction,
        })
    }
}

fn is_valid_mobile(mobile_no: &str) -> bool {
    let digits = mobile_no.strip_prefix('+').unwrap_or(mobile_no);
    digits.len() >= MIN_MOBILE_LEN && digits.chars().all(|c| c.is_ascii_digit())
}

fn referral_code() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedgerStore, TransactionStatus};

    fn manager() -> (Arc<InMemoryLedgerStore>, WalletManager) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let mut config = LedgerConfig::default();
        config.retry.backoff = std::time::Duration::ZERO;
        (store.clone(), WalletManager::new(store, config))
    }

    #[test]
    fn test_mobile_validation() {
        assert!(is_valid_mobile("03001234567"));
        assert!(is_valid_mobile("+923001234567"));
        assert!(!is_valid_mobile("12345"));
        assert!(!is_valid_mobile("0300-123456"));
        assert!(!is_valid_mobile(""));
    }

    #[test]
    fn test_referral_code_shape() {
        let code = referral_code();
        assert_eq!(code.len(), REFERRAL_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_open_account_starts_empty() {
        let (_, wallet) = manager();
        let account = wallet.open_account(" 03001234567 ", "Sniper").await.unwrap();
        assert_eq!(account.mobile_no, "03001234567");
        assert_eq!(account.deposit_funds, 0);
        assert_eq!(account.winning_balance, 0);
        assert_eq!(account.matches_won, 0);

        let err = wallet.open_account("03001234567", "Other").await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateMobile(_)));

        let err = wallet.open_account("123", "Short").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMobile(_)));
    }

    #[tokio::test]
    async fn test_withdrawal_request_checks_balance_up_front() {
        let (store, wallet) = manager();
        let account = wallet.open_account("03001234567", "Sniper").await.unwrap();

        let err = wallet
            .request_withdrawal(account.id, 100, "FF-991")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(store.transaction_count().await, 0);

        wallet.add_match_win(account.id, 150).await.unwrap();
        let tx = wallet
            .request_withdrawal(account.id, 100, "FF-991")
            .await
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.details.as_deref(), Some("Game ID: FF-991"));
        assert_eq!(wallet.get_account(account.id).await.unwrap().winning_balance, 150);
    }

    #[tokio::test]
    async fn test_boundary_amounts_are_invalid() {
        let (store, wallet) = manager();
        let account = wallet.open_account("03001234567", "Sniper").await.unwrap();

        let err = wallet
            .register_for_tournament(account.id, i64::MIN)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(i64::MIN)));

        let err = wallet
            .convert_winnings_to_funds(account.id, i64::MIN)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(i64::MIN)));

        wallet.add_match_win(account.id, i64::MAX).await.unwrap();
        let err = wallet.add_match_win(account.id, 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(1)));

        assert_eq!(store.transaction_count().await, 1);
        let account = wallet.get_account(account.id).await.unwrap();
        assert_eq!(account.deposit_funds, 0);
        assert_eq!(account.winning_balance, i64::MAX);
        assert_eq!(account.matches_won, 1);
    }

    #[tokio::test]
    async fn test_listed_tournament_with_bad_fee_is_invalid() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let mut free = TournamentCatalog::default().list()[0].clone();
        free.id = "free-roll".to_string();
        free.entry_fee = i64::MIN;
        let wallet = WalletManager::with_catalog(
            store.clone(),
            LedgerConfig::default(),
            TournamentCatalog::new(vec![free]),
        );
        let account = wallet.open_account("03001234567", "Sniper").await.unwrap();

        let err = wallet
            .register_for_listed_tournament(account.id, "free-roll")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(i64::MIN)));
        assert_eq!(store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_review_approve_settles_immediately() {
        let (_, wallet) = manager();
        let account = wallet.open_account("03001234567", "Sniper").await.unwrap();
        let tx = wallet
            .request_deposit(account.id, 2000, "JC-5521")
            .await
            .unwrap();
        assert_eq!(tx.details.as_deref(), Some("Payment ID: JC-5521"));

        let outcome = wallet
            .review_transaction(tx.id, ReviewDecision::Approve)
            .await
            .unwrap();
        assert!(outcome.settlement.as_ref().is_some_and(|s| s.is_applied()));
        assert!(outcome.transaction.processed);
        assert_eq!(wallet.get_account(account.id).await.unwrap().deposit_funds, 2000);

        let err = wallet
            .review_transaction(tx.id, ReviewDecision::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStatusTransition { .. }));
    }

    #[tokio::test]
    async fn test_stuck_withdrawal_can_be_rejected() {
        let (_, wallet) = manager();
        let account = wallet.open_account("03001234567", "Sniper").await.unwrap();
        wallet.add_match_win(account.id, 100).await.unwrap();
        let tx = wallet
            .request_withdrawal(account.id, 100, "FF-1")
            .await
            .unwrap();
        wallet.convert_winnings_to_funds(account.id, 60).await.unwrap();

        let err = wallet
            .review_transaction(tx.id, ReviewDecision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        let outcome = wallet
            .review_transaction(tx.id, ReviewDecision::Reject)
            .await
            .unwrap();
        assert_eq!(outcome.transaction.status, TransactionStatus::Rejected);
        assert!(!outcome.transaction.processed);
        assert_eq!(wallet.get_account(account.id).await.unwrap().winning_balance, 40);
    }

    #[tokio::test]
    async fn test_listed_tournament_registration() {
        let (store, wallet) = manager();
        let account = wallet.open_account("03001234567", "Sniper").await.unwrap();
        store
            .apply_delta(account.id, BalanceDelta::funds(600))
            .await
            .unwrap();

        let update = wallet
            .register_for_listed_tournament(account.id, "vf-clash-1")
            .await
            .unwrap();
        assert_eq!(update.account.deposit_funds, 100);
        assert_eq!(update.transaction.kind, TransactionKind::EntryFee);
        assert_eq!(update.transaction.amount, 500);

        let err = wallet
            .register_for_listed_tournament(account.id, "no-such-cup")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TournamentNotFound(_)));
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_by_winnings() {
        let (_, wallet) = manager();
        let a = wallet.open_account("03001111111", "Alpha").await.unwrap();
        let b = wallet.open_account("03002222222", "Bravo").await.unwrap();
        let c = wallet.open_account("03003333333", "Charlie").await.unwrap();
        wallet.add_match_win(a.id, 100).await.unwrap();
        wallet.add_match_win(b.id, 300).await.unwrap();
        wallet.add_match_win(c.id, 100).await.unwrap();

        let board = wallet.leaderboard(Some(2)).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].in_game_name, "Bravo");
        assert_eq!(board[1].account_id, a.id);
        assert_eq!(board[1].points, 100);
    }

    #[tokio::test]
    async fn test_history_requires_account() {
        let (_, wallet) = manager();
        let err = wallet.history(99, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(99)));
    }
}
