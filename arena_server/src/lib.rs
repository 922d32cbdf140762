//! HTTP front for the arena wallet ledger.
//!
//! - [`api`]: Axum router and handlers
//! - [`config`]: Environment-driven server configuration
//! - [`logging`]: Tracing subscriber setup

pub mod api;
pub mod config;
pub mod logging;
