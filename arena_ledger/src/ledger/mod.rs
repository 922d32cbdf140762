//! Ledger core: account balances, the append-only transaction log and the
//! store seam they live behind.
//!
//! This module implements:
//! - Account and transaction models with their lifecycle rules
//! - The [`LedgerStore`] trait and its atomic [`LedgerBatch`] primitive
//! - PostgreSQL and in-memory store backends
//! - The transaction recorder
//! - Bounded retry for optimistic-concurrency conflicts

pub mod config;
pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod recorder;
pub mod retry;
pub mod store;

pub use config::{LedgerConfig, RetryPolicy};
pub use errors::{LedgerError, LedgerResult};
pub use memory::InMemoryLedgerStore;
pub use models::{
    Account, AccountId, BalanceDelta, NewAccount, NewTransaction, Transaction, TransactionId,
    TransactionKind, TransactionStatus,
};
pub use postgres::PgLedgerStore;
pub use recorder::TransactionRecorder;
pub use retry::with_retry;
pub use store::{AccountWrite, CommitReceipt, EntryWrite, LedgerBatch, LedgerStore};
