//! PostgreSQL Ledger Store
//!
//! Row-level pessimistic locking with `SELECT ... FOR UPDATE` inside a
//! transaction. `sqlx::Transaction` rolls back on drop, so a cancelled or
//! timed-out unit of work leaves no partial writes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use super::{AccountSnapshot, LedgerStore, UnitOfWork};
use crate::ledger::error::LedgerError;
use crate::ledger::types::{AccountId, AccountState, MovementKind, MovementRecord};
use crate::ledger::validation::ValidatedMovement;

/// PostgreSQL-backed ledger store
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    /// Applied per unit of work via `SET LOCAL lock_timeout`
    lock_timeout: Option<Duration>,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bound how long a unit of work waits for an account row lock
    pub fn with_lock_timeout(mut self, lock_timeout: Option<Duration>) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError> {
        // Nothing has been written yet, so every failure here is safe to retry.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if let Some(timeout) = self.lock_timeout {
            sqlx::query("SELECT set_config('lock_timeout', $1, true)")
                .bind(format!("{}ms", timeout.as_millis()))
                .execute(&mut *tx)
                .await
                .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        }

        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn read_snapshot(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Option<AccountSnapshot>, LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        // Both reads see the same committed state; no row lock is taken.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let account = sqlx::query_as::<_, (i64, i64)>(
            "SELECT balance, credit_limit FROM accounts WHERE id = $1",
        )
        .bind(account_id.id())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((balance, credit_limit)) = account else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, (i64, String, String, DateTime<Utc>)>(
            r#"
            SELECT amount, kind, description, occurred_at
            FROM movements
            WHERE account_id = $1
            ORDER BY occurred_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(account_id.id())
        .bind(limit as i64)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let recent = rows
            .into_iter()
            .map(|(amount, kind, description, occurred_at)| {
                let kind = MovementKind::from_code(kind.trim()).ok_or_else(|| {
                    LedgerError::Database(format!("unknown movement kind in storage: {kind:?}"))
                })?;
                Ok(MovementRecord {
                    amount,
                    kind,
                    description,
                    occurred_at,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        Ok(Some(AccountSnapshot {
            state: AccountState {
                limit: credit_limit,
                balance,
            },
            recent,
        }))
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One PostgreSQL transaction
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_account(
        &mut self,
        account_id: AccountId,
    ) -> Result<Option<AccountState>, LedgerError> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT balance, credit_limit FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id.id())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|(balance, limit)| AccountState { limit, balance }))
    }

    async fn append_movement(
        &mut self,
        account_id: AccountId,
        movement: &ValidatedMovement,
    ) -> Result<DateTime<Utc>, LedgerError> {
        let occurred_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO movements (amount, kind, description, account_id)
            VALUES ($1, $2, $3, $4)
            RETURNING occurred_at
            "#,
        )
        .bind(movement.amount())
        .bind(movement.kind().as_str())
        .bind(movement.description())
        .bind(account_id.id())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(occurred_at)
    }

    async fn update_balance(
        &mut self,
        account_id: AccountId,
        balance: i64,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2")
            .bind(balance)
            .bind(account_id.id())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            warn!(account_id = %account_id, rows = result.rows_affected(), "Balance update touched unexpected row count");
            return Err(LedgerError::Database(format!(
                "balance update affected {} rows",
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        let this = *self;
        if let Err(e) = this.tx.rollback().await {
            debug!(error = %e, "Explicit rollback failed; connection will discard the transaction");
            return Err(e.into());
        }
        Ok(())
    }
}
