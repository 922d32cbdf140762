//! Tournament catalog.
//!
//! Lists the events players can register for and resolves the entry fee
//! charged by [`WalletManager::register_for_listed_tournament`].
//!
//! [`WalletManager::register_for_listed_tournament`]: crate::wallet::WalletManager::register_for_listed_tournament

pub mod models;

pub use models::{Tournament, TournamentCatalog, TournamentId};
