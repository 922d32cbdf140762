//! Wallet operations over the ledger.
//!
//! This module implements:
//! - Deposit and withdrawal requests with administrator review
//! - Idempotent settlement of approved requests, inline and in the background
//! - Entry-fee debits, match-win credits and winnings conversion
//! - Atomic peer-to-peer diamond transfers
//! - Balance, history and leaderboard queries
//!
//! ## Example
//!
//! ```no_run
//! use arena_ledger::ledger::{InMemoryLedgerStore, LedgerConfig};
//! use arena_ledger::wallet::{RecipientRef, WalletManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wallet = WalletManager::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default());
//!
//!     let alice = wallet.open_account("03001234567", "Alice").await?;
//!     let bob = wallet.open_account("03007654321", "Bob").await?;
//!
//!     wallet.add_match_win(alice.id, 300).await?;
//!     let receipt = wallet.transfer(alice.id, &RecipientRef::Id(bob.id), 100).await?;
//!     println!("Alice now has {} diamonds", receipt.sender.winning_balance);
//!
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;
pub mod settlement;
pub mod transfer;
pub mod worker;

pub use manager::WalletManager;
pub use models::{
    BalanceUpdate, LeaderboardEntry, RecipientRef, ReviewDecision, ReviewOutcome,
    SettlementOutcome, SettlementReport, TransferReceipt,
};
pub use settlement::SettlementProcessor;
pub use transfer::TransferCoordinator;
pub use worker::SettlementWorker;
