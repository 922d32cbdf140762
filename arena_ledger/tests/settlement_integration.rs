//! Integration tests for request review and settlement.
//!
//! Tests approval and rejection of deposits and withdrawals, idempotent
//! re-delivery, and the background settlement worker.

use arena_ledger::ledger::{
    BalanceDelta, InMemoryLedgerStore, LedgerConfig, LedgerError, LedgerStore, TransactionStatus,
};
use arena_ledger::wallet::{ReviewDecision, SettlementOutcome, WalletManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn setup() -> (Arc<InMemoryLedgerStore>, WalletManager) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let config = LedgerConfig {
        settlement_poll_interval: Duration::from_millis(20),
        ..LedgerConfig::default()
    };
    let wallet = WalletManager::new(store.clone(), config);
    (store, wallet)
}

#[tokio::test]
async fn test_duplicate_settlement_applies_once() {
    let (_, wallet) = setup();
    let account = wallet.open_account("03001234567", "Echo").await.unwrap();
    let tx = wallet
        .request_deposit(account.id, 1200, "EP-1")
        .await
        .unwrap();

    wallet
        .review_transaction(tx.id, ReviewDecision::Approve)
        .await
        .unwrap();

    for _ in 0..3 {
        let outcome = wallet.settle(tx.id).await.unwrap();
        assert!(matches!(outcome, SettlementOutcome::AlreadyProcessed { .. }));
    }

    let account = wallet.get_account(account.id).await.unwrap();
    assert_eq!(account.deposit_funds, 1200);
    assert_eq!(account.winning_balance, 0);
}

#[tokio::test]
async fn test_pending_deposit_does_not_move_balance() {
    let (_, wallet) = setup();
    let account = wallet.open_account("03001234567", "Echo").await.unwrap();
    let tx = wallet
        .request_deposit(account.id, 1200, "EP-1")
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(!tx.processed);
    assert_eq!(wallet.get_account(account.id).await.unwrap().deposit_funds, 0);

    let outcome = wallet.settle(tx.id).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::NotApproved { .. }));
}

#[tokio::test]
async fn test_approved_withdrawal_debits_winnings() {
    let (store, wallet) = setup();
    let account = wallet.open_account("03001234567", "Echo").await.unwrap();
    store
        .apply_delta(account.id, BalanceDelta::winnings(900))
        .await
        .unwrap();

    let tx = wallet
        .request_withdrawal(account.id, 400, "FF-77")
        .await
        .unwrap();
    let outcome = wallet
        .review_transaction(tx.id, ReviewDecision::Approve)
        .await
        .unwrap();

    match outcome.settlement {
        Some(SettlementOutcome::Applied { account, transaction }) => {
            assert_eq!(account.winning_balance, 500);
            assert_eq!(account.deposit_funds, 0);
            assert!(transaction.processed);
            assert_eq!(transaction.status, TransactionStatus::Approved);
        }
        other => panic!("expected applied settlement, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_request_is_final() {
    let (_, wallet) = setup();
    let account = wallet.open_account("03001234567", "Echo").await.unwrap();
    let tx = wallet
        .request_deposit(account.id, 300, "EP-2")
        .await
        .unwrap();

    let outcome = wallet
        .review_transaction(tx.id, ReviewDecision::Reject)
        .await
        .unwrap();
    assert_eq!(outcome.transaction.status, TransactionStatus::Rejected);
    assert!(outcome.settlement.is_none());

    let err = wallet
        .review_transaction(tx.id, ReviewDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidStatusTransition {
            from: TransactionStatus::Rejected,
            to: TransactionStatus::Approved,
            ..
        }
    ));

    let outcome = wallet.settle(tx.id).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::NotApproved { .. }));
    assert_eq!(wallet.get_account(account.id).await.unwrap().deposit_funds, 0);
}

#[tokio::test]
async fn test_review_unknown_transaction() {
    let (_, wallet) = setup();
    let err = wallet
        .review_transaction(12345, ReviewDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TransactionNotFound(12345)));
}

#[tokio::test]
async fn test_worker_settles_entries_approved_out_of_band() {
    let (store, wallet) = setup();
    let account = wallet.open_account("03001234567", "Echo").await.unwrap();

    let mut ids = Vec::new();
    for amount in [100, 200, 300] {
        let tx = wallet
            .request_deposit(account.id, amount, "BATCH")
            .await
            .unwrap();
        // Approval recorded directly by an administrator tool
        store
            .set_status(tx.id, TransactionStatus::Approved)
            .await
            .unwrap();
        ids.push(tx.id);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = wallet.settlement_worker().spawn(shutdown_rx);

    let mut funds = 0;
    for _ in 0..200 {
        funds = wallet.get_account(account.id).await.unwrap().deposit_funds;
        if funds == 600 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(funds, 600);

    for id in ids {
        assert!(store.get_transaction(id).await.unwrap().processed);
    }

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_settle_pending_reports_counts() {
    let (store, wallet) = setup();
    let account = wallet.open_account("03001234567", "Echo").await.unwrap();
    let tx = wallet
        .request_deposit(account.id, 50, "EP-3")
        .await
        .unwrap();
    store
        .set_status(tx.id, TransactionStatus::Approved)
        .await
        .unwrap();

    let report = wallet.settle_pending().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.applied, 1);

    let report = wallet.settle_pending().await.unwrap();
    assert_eq!(report.scanned, 0);
}
