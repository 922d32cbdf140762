//! # Arena Ledger
//!
//! Wallet ledger for an eSports tournament platform.
//!
//! Every account carries two balances: PKR deposit funds used to pay entry
//! fees, and diamonds won in matches. All balance changes are recorded in an
//! append-only transaction log, and every operation that touches balances
//! commits its balance writes and log entries atomically.
//!
//! ## Core Modules
//!
//! - [`ledger`]: Account and transaction models, the store seam and its backends
//! - [`wallet`]: Caller-facing wallet operations, settlement and transfers
//! - [`tournament`]: Catalog of tournaments open for registration
//! - [`db`]: PostgreSQL connection pool, schema and query timeouts
//!
//! ## Example
//!
//! ```
//! use arena_ledger::ledger::{InMemoryLedgerStore, LedgerConfig};
//! use arena_ledger::wallet::WalletManager;
//! use std::sync::Arc;
//!
//! let wallet = WalletManager::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default());
//! assert_eq!(wallet.tournaments().len(), 3);
//! ```

/// Database connection and schema management.
pub mod db;

/// Ledger core: models, store trait and backends.
pub mod ledger;
pub use ledger::{
    Account, AccountId, BalanceDelta, LedgerConfig, LedgerError, LedgerResult, LedgerStore,
    Transaction, TransactionId, TransactionKind, TransactionStatus,
};

/// Tournament catalog.
pub mod tournament;

/// Wallet operations.
pub mod wallet;
pub use wallet::WalletManager;
