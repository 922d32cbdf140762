//! Arena wallet ledger server.
//!
//! Serves the wallet API over HTTP and runs the settlement worker alongside
//! it until Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use arena_ledger::db::Database;
use arena_ledger::ledger::{InMemoryLedgerStore, LedgerStore, PgLedgerStore};
use arena_ledger::wallet::WalletManager;
use arena_server::api::{self, AppState};
use arena_server::config::{ServerConfig, StorageBackend};
use arena_server::logging;
use pico_args::Arguments;
use tokio::sync::watch;
use tracing::info;

const HELP: &str = "\
Run the arena wallet ledger server

USAGE:
  arena_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --storage    BACKEND     postgres or memory          [default: env STORAGE_BACKEND or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                 PostgreSQL connection string
  STORAGE_BACKEND              postgres or memory
  TOURNAMENTS_FILE             JSON tournament catalog
  LEDGER_MAX_ATTEMPTS          Conflict retry attempts
  SETTLEMENT_POLL_INTERVAL_MS  Settlement scan interval
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let storage: Option<StorageBackend> = pargs.opt_value_from_str("--storage")?;

    let config = ServerConfig::from_env(bind, database_url, storage)?;
    config.validate()?;

    logging::init();
    info!("Starting arena ledger server at {}", config.bind);

    let catalog = config.load_catalog()?;
    info!("Loaded {} tournament(s)", catalog.list().len());

    let (store, db): (Arc<dyn LedgerStore>, Option<Database>) = match config.storage {
        StorageBackend::Postgres => {
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to apply ledger schema")?;
            info!("Database connected and schema applied");

            let store = PgLedgerStore::new(Arc::new(db.pool().clone())).with_timeouts(
                config.database.query_timeout(),
                config.database.transaction_timeout(),
            );
            (Arc::new(store), Some(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory ledger; balances are lost on restart");
            (Arc::new(InMemoryLedgerStore::new()), None)
        }
    };

    let wallet = Arc::new(WalletManager::with_catalog(
        store,
        config.ledger.clone(),
        catalog,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = wallet.settlement_worker().spawn(shutdown_rx);

    let app = api::create_router(AppState::new(wallet, db.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        tracing::error!("Settlement worker panicked: {}", e);
    }

    if let Some(db) = db {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
