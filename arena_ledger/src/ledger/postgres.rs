//! PostgreSQL ledger store.
//!
//! Each [`LedgerBatch`] runs in one SQL transaction. Account rows are updated
//! in ascending ID order with the version and non-negative guards inside the
//! `UPDATE` predicate, so a stale read simply matches zero rows.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use std::sync::Arc;
use std::time::Duration;

use super::errors::{LedgerError, LedgerResult};
use super::models::{
    Account, AccountId, NewAccount, NewTransaction, Transaction, TransactionId,
    TransactionStatus,
};
use super::store::{AccountWrite, CommitReceipt, EntryWrite, LedgerBatch, LedgerStore};
use crate::db::timeouts::{
    DEFAULT_QUERY_TIMEOUT, DEFAULT_TRANSACTION_TIMEOUT, bounded, with_timeout,
};

const ACCOUNT_COLUMNS: &str = "id, mobile_no, in_game_name, referral_code, deposit_funds, \
     winning_balance, matches_won, version, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "id, account_id, kind, amount, details, status, processed, created_at";

/// Ledger store backed by PostgreSQL
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: Arc<PgPool>,
    query_timeout: Duration,
    transaction_timeout: Duration,
}

impl PgLedgerStore {
    /// Create a new store over an existing pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Override the per-query and per-commit deadlines
    pub fn with_timeouts(mut self, query: Duration, transaction: Duration) -> Self {
        self.query_timeout = query;
        self.transaction_timeout = transaction;
        self
    }

    async fn commit_in_transaction(&self, batch: LedgerBatch) -> LedgerResult<CommitReceipt> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut accounts = Vec::with_capacity(batch.accounts.len());
        for write in batch.ordered_accounts()? {
            accounts.push(update_account(&mut tx, write).await?);
        }

        let mut transactions = Vec::with_capacity(batch.entries.len());
        for entry in batch.entries {
            let stored = match entry {
                EntryWrite::Append(new) => insert_transaction(&mut tx, new).await?,
                EntryWrite::MarkProcessed(id) => mark_processed(&mut tx, id).await?,
            };
            transactions.push(stored);
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(CommitReceipt {
            accounts,
            transactions,
        })
    }

    async fn set_status_in_transaction(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerResult<Transaction> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or(LedgerError::TransactionNotFound(id))?;

        let current = transaction_from_row(&row)?;
        if !current.can_transition_to(status) {
            return Err(LedgerError::InvalidStatusTransition {
                id,
                from: current.status,
                to: status,
            });
        }

        let row = sqlx::query(&format!(
            "UPDATE ledger_transactions SET status = $2 WHERE id = $1 RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        transaction_from_row(&row)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn create_account(&self, account: NewAccount) -> LedgerResult<Account> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                r#"
                INSERT INTO accounts (mobile_no, in_game_name, referral_code)
                VALUES ($1, $2, $3)
                RETURNING {ACCOUNT_COLUMNS}
                "#
            ))
            .bind(&account.mobile_no)
            .bind(&account.in_game_name)
            .bind(&account.referral_code)
            .fetch_one(self.pool.as_ref()),
        )
        .await;

        match result {
            Ok(row) => account_from_row(&row),
            Err(crate::db::timeouts::TimeoutError::Database(e)) if is_unique_violation(&e) => {
                Err(LedgerError::DuplicateMobile(account.mobile_no))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(LedgerError::AccountNotFound(id))?;

        account_from_row(&row)
    }

    async fn find_account_by_mobile(&self, mobile_no: &str) -> LedgerResult<Option<Account>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE mobile_no = $1"
            ))
            .bind(mobile_no)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn commit(&self, batch: LedgerBatch) -> LedgerResult<CommitReceipt> {
        bounded(
            self.transaction_timeout,
            self.commit_in_transaction(batch),
            LedgerError::Timeout,
        )
        .await
    }

    async fn get_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(LedgerError::TransactionNotFound(id))?;

        transaction_from_row(&row)
    }

    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerResult<Transaction> {
        bounded(
            self.transaction_timeout,
            self.set_status_in_transaction(id, status),
            LedgerError::Timeout,
        )
        .await
    }

    async fn transactions_for(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> LedgerResult<Vec<Transaction>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                r#"
                SELECT {TRANSACTION_COLUMNS}
                FROM ledger_transactions
                WHERE account_id = $1
                ORDER BY id DESC
                LIMIT $2
                "#
            ))
            .bind(account_id)
            .bind(sql_limit(limit))
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn unsettled(&self, limit: usize) -> LedgerResult<Vec<Transaction>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                r#"
                SELECT {TRANSACTION_COLUMNS}
                FROM ledger_transactions
                WHERE status = 'approved' AND processed = FALSE
                ORDER BY id ASC
                LIMIT $1
                "#
            ))
            .bind(sql_limit(limit))
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn top_by_winnings(&self, limit: usize) -> LedgerResult<Vec<Account>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY winning_balance DESC, id ASC LIMIT $1"
            ))
            .bind(sql_limit(limit))
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(account_from_row).collect()
    }
}

/// Apply one guarded account write inside `tx`
async fn update_account(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    write: &AccountWrite,
) -> LedgerResult<Account> {
    let delta = write.delta;
    let row = sqlx::query(&format!(
        r#"
        UPDATE accounts
        SET deposit_funds = deposit_funds + $2,
            winning_balance = winning_balance + $3,
            matches_won = matches_won + $4,
            version = version + 1,
            updated_at = NOW()
        WHERE id = $1
          AND ($5::BIGINT IS NULL OR version = $5)
          AND deposit_funds + $2 >= 0
          AND winning_balance + $3 >= 0
          AND matches_won + $4 >= 0
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(write.account_id)
    .bind(delta.deposit_funds)
    .bind(delta.winning_balance)
    .bind(delta.matches_won)
    .bind(write.expected_version)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_db_error)?;

    if let Some(row) = row {
        return account_from_row(&row);
    }

    // Zero rows: either the account is missing or a guard failed.
    let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = $1")
        .bind(write.account_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;

    match exists {
        Some(_) => Err(LedgerError::Conflict(format!(
            "account {} changed or would go negative",
            write.account_id
        ))),
        None => Err(LedgerError::AccountNotFound(write.account_id)),
    }
}

async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    new: NewTransaction,
) -> LedgerResult<Transaction> {
    if new.amount <= 0 {
        return Err(LedgerError::InvalidAmount(new.amount));
    }

    let result = sqlx::query(&format!(
        r#"
        INSERT INTO ledger_transactions (account_id, kind, amount, details, status, processed)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {TRANSACTION_COLUMNS}
        "#
    ))
    .bind(new.account_id)
    .bind(new.kind.as_str())
    .bind(new.amount)
    .bind(&new.details)
    .bind(new.status.as_str())
    .bind(new.processed)
    .fetch_one(&mut **tx)
    .await;

    match result {
        Ok(row) => transaction_from_row(&row),
        Err(e) if is_foreign_key_violation(&e) => Err(LedgerError::AccountNotFound(new.account_id)),
        Err(e) => Err(map_db_error(e)),
    }
}

async fn mark_processed(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: TransactionId,
) -> LedgerResult<Transaction> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE ledger_transactions
        SET processed = TRUE
        WHERE id = $1 AND status = 'approved' AND processed = FALSE
        RETURNING {TRANSACTION_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_db_error)?;

    if let Some(row) = row {
        return transaction_from_row(&row);
    }

    let exists = sqlx::query("SELECT 1 FROM ledger_transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;

    match exists {
        Some(_) => Err(LedgerError::Conflict(format!(
            "transaction {id} is no longer awaiting settlement"
        ))),
        None => Err(LedgerError::TransactionNotFound(id)),
    }
}

fn account_from_row(row: &PgRow) -> LedgerResult<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        mobile_no: row.try_get("mobile_no")?,
        in_game_name: row.try_get("in_game_name")?,
        referral_code: row.try_get("referral_code")?,
        deposit_funds: row.try_get("deposit_funds")?,
        winning_balance: row.try_get("winning_balance")?,
        matches_won: row.try_get("matches_won")?,
        version: row.try_get("version")?,
        created_at: row
            .try_get::<chrono::NaiveDateTime, _>("created_at")?
            .and_utc(),
        updated_at: row
            .try_get::<chrono::NaiveDateTime, _>("updated_at")?
            .and_utc(),
    })
}

fn transaction_from_row(row: &PgRow) -> LedgerResult<Transaction> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;

    Ok(Transaction {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        kind: kind.parse().map_err(LedgerError::Corrupt)?,
        amount: row.try_get("amount")?,
        details: row.try_get("details")?,
        status: status.parse().map_err(LedgerError::Corrupt)?,
        processed: row.try_get("processed")?,
        created_at: row
            .try_get::<chrono::NaiveDateTime, _>("created_at")?
            .and_utc(),
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some("23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some("23503")
}

/// Serialization failures, deadlocks and check-constraint races are retryable.
fn map_db_error(err: sqlx::Error) -> LedgerError {
    match sqlstate(&err).as_deref() {
        Some("40001") | Some("40P01") => LedgerError::Conflict(format!("serialization failure: {err}")),
        Some("23514") | Some("22003") => LedgerError::Conflict(format!("balance guard: {err}")),
        _ => LedgerError::Database(err),
    }
}
