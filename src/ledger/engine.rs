//! Ledger Engine
//!
//! Applies movements and builds statements on top of a [`LedgerStore`].
//!
//! # ApplyMovement
//!
//! ```text
//! validate ──▶ begin ──▶ lock account ──▶ check limit ──▶ append ──▶ update ──▶ commit
//!    │                        │                │             │          │          │
//!    ▼                        ▼                ▼             ▼          ▼          ▼
//! Invalid*            AccountNotFound    LimitExceeded      ───── rollback on any error ─────
//! (no store access)
//! ```
//!
//! The exclusive account lock is the only serialization point: for one
//! account, committed movements are totally ordered by lock acquisition.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::error::LedgerError;
use super::store::{LedgerStore, UnitOfWork};
use super::types::{AccountId, MovementReceipt, MovementRequest, Statement};
use super::validation::ValidatedMovement;

/// Default number of movements returned in a statement
pub const STATEMENT_SIZE: usize = 10;

/// Engine tuning
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub statement_size: usize,
    /// Upper bound on a whole apply/statement call, lock wait included
    pub operation_timeout: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            statement_size: STATEMENT_SIZE,
            operation_timeout: None,
        }
    }
}

/// Credit-limited ledger over an explicit store handle
#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Apply one debit or credit atomically.
    ///
    /// Returns the account limit and the committed balance. On error nothing
    /// has been written.
    pub async fn apply_movement(
        &self,
        account_id: AccountId,
        request: MovementRequest,
    ) -> Result<MovementReceipt, LedgerError> {
        let movement = ValidatedMovement::new(request)?;

        let result = self
            .bounded(self.apply_validated(account_id, &movement))
            .await;

        match &result {
            Ok(receipt) => debug!(
                account_id = %account_id,
                kind = %movement.kind(),
                amount = movement.amount(),
                balance = receipt.balance,
                "Movement committed"
            ),
            Err(e) if e.is_business() => debug!(
                account_id = %account_id,
                kind = %movement.kind(),
                amount = movement.amount(),
                code = e.code(),
                "Movement rejected"
            ),
            Err(e) => warn!(
                account_id = %account_id,
                store = self.store.name(),
                error = %e,
                "Movement failed"
            ),
        }
        result
    }

    /// Balance, limit and newest movements, without the exclusive lock.
    pub async fn statement(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        let snapshot = self
            .bounded(self.store.read_snapshot(account_id, self.config.statement_size))
            .await?
            .ok_or(LedgerError::AccountNotFound)?;

        Ok(Statement {
            balance: snapshot.state.balance,
            limit: snapshot.state.limit,
            snapshot_time: Utc::now(),
            recent: snapshot.recent,
        })
    }

    async fn apply_validated(
        &self,
        account_id: AccountId,
        movement: &ValidatedMovement,
    ) -> Result<MovementReceipt, LedgerError> {
        let mut uow = self.store.begin().await?;

        match Self::apply_in(uow.as_mut(), account_id, movement).await {
            Ok(receipt) => {
                uow.commit().await?;
                Ok(receipt)
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    // The unit of work is discarded either way.
                    warn!(account_id = %account_id, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn apply_in(
        uow: &mut dyn UnitOfWork,
        account_id: AccountId,
        movement: &ValidatedMovement,
    ) -> Result<MovementReceipt, LedgerError> {
        let state = uow
            .lock_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;

        let balance = movement.apply_to(state.balance, state.limit)?;

        uow.append_movement(account_id, movement).await?;
        uow.update_balance(account_id, balance).await?;

        Ok(MovementReceipt {
            limit: state.limit,
            balance,
        })
    }

    /// Apply the configured operation timeout.
    ///
    /// On expiry the inner future is dropped, which rolls back any open unit of work.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        match self.config.operation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
                info!(timeout_ms = timeout.as_millis() as u64, "Ledger operation timed out");
                Err(LedgerError::Timeout)
            }),
            None => fut.await,
        }
    }
}
