//! Account/Movement Stores
//!
//! The engine talks to storage through two traits:
//! - [`LedgerStore`]: starts units of work and serves lock-free statement reads
//! - [`UnitOfWork`]: one atomic read-lock-write-commit cycle on a single account
//!
//! A unit of work that is dropped without `commit` is rolled back.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::LedgerError;
use super::types::{AccountId, AccountState, MovementRecord};
use super::validation::ValidatedMovement;

/// Committed state of one account, read without the exclusive lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub state: AccountState,
    /// Newest first
    pub recent: Vec<MovementRecord>,
}

/// Transactional account/movement store
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Start an atomic unit of work.
    ///
    /// Waits for a free connection when the backend is pooled.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError>;

    /// Consistent read of an account and its `limit` newest movements.
    ///
    /// Must not take the exclusive row lock used by [`UnitOfWork::lock_account`].
    /// Returns `None` if the account does not exist.
    async fn read_snapshot(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Option<AccountSnapshot>, LedgerError>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<(), LedgerError>;
}

/// One atomic group of reads and writes
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read balance and limit, holding an exclusive lock on the account
    /// until this unit of work ends. Blocks while another unit of work holds it.
    async fn lock_account(
        &mut self,
        account_id: AccountId,
    ) -> Result<Option<AccountState>, LedgerError>;

    /// Append a movement; returns the store-assigned timestamp.
    async fn append_movement(
        &mut self,
        account_id: AccountId,
        movement: &ValidatedMovement,
    ) -> Result<DateTime<Utc>, LedgerError>;

    async fn update_balance(
        &mut self,
        account_id: AccountId,
        balance: i64,
    ) -> Result<(), LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}
