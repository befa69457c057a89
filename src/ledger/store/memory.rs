//! In-Memory Ledger Store
//!
//! Each account has an async mutex standing in for the row lock and a
//! separately guarded committed state. A unit of work stages its writes and
//! publishes them on commit, so statement reads never wait on the row lock
//! and dropping an uncommitted unit of work discards everything it staged.
//!
//! Fault injection hooks make atomicity observable in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{AccountSnapshot, LedgerStore, UnitOfWork};
use crate::ledger::error::LedgerError;
use crate::ledger::types::{AccountId, AccountState, MovementRecord};
use crate::ledger::validation::ValidatedMovement;

struct Committed {
    state: AccountState,
    /// Oldest first
    movements: Vec<MovementRecord>,
}

struct AccountSlot {
    row_lock: Arc<Mutex<()>>,
    committed: RwLock<Committed>,
}

#[derive(Default)]
struct Faults {
    fail_append: AtomicBool,
    fail_update: AtomicBool,
    fail_commit: AtomicBool,
    /// Held inside the unit of work right after the lock is taken
    hold_ms: AtomicU64,
}

#[derive(Default)]
struct Counters {
    units_begun: AtomicUsize,
    lock_acquisitions: AtomicUsize,
    commits: AtomicUsize,
}

struct Inner {
    accounts: HashMap<AccountId, Arc<AccountSlot>>,
    lock_timeout: Option<Duration>,
    faults: Faults,
    counters: Counters,
}

/// In-memory ledger store with per-account locking
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<Inner>,
}

impl InMemoryLedgerStore {
    /// Create a store provisioned with `(id, limit)` accounts at zero balance
    pub fn new(accounts: impl IntoIterator<Item = (AccountId, i64)>) -> Self {
        Self::build(accounts, None)
    }

    /// Same as [`InMemoryLedgerStore::new`], bounding lock waits
    pub fn with_lock_timeout(
        accounts: impl IntoIterator<Item = (AccountId, i64)>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        Self::build(accounts, lock_timeout)
    }

    fn build(
        accounts: impl IntoIterator<Item = (AccountId, i64)>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|(id, limit)| {
                let slot = AccountSlot {
                    row_lock: Arc::new(Mutex::new(())),
                    committed: RwLock::new(Committed {
                        state: AccountState { limit, balance: 0 },
                        movements: Vec::new(),
                    }),
                };
                (id, Arc::new(slot))
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                accounts,
                lock_timeout,
                faults: Faults::default(),
                counters: Counters::default(),
            }),
        }
    }

    pub fn set_fail_append(&self, fail: bool) {
        self.inner.faults.fail_append.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_update(&self, fail: bool) {
        self.inner.faults.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_commit(&self, fail: bool) {
        self.inner.faults.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Keep every unit of work busy for `hold` after it takes the row lock
    pub fn set_hold(&self, hold: Duration) {
        self.inner
            .faults
            .hold_ms
            .store(hold.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn units_begun(&self) -> usize {
        self.inner.counters.units_begun.load(Ordering::SeqCst)
    }

    pub fn lock_acquisitions(&self) -> usize {
        self.inner.counters.lock_acquisitions.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.inner.counters.commits.load(Ordering::SeqCst)
    }

    /// Committed movement count for an account
    pub fn movement_count(&self, account_id: AccountId) -> Option<usize> {
        self.inner.accounts.get(&account_id).map(|slot| {
            slot.committed
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .movements
                .len()
        })
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError> {
        self.inner.counters.units_begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryUnitOfWork {
            inner: self.inner.clone(),
            held: None,
            staged_movements: Vec::new(),
            staged_balance: None,
        }))
    }

    async fn read_snapshot(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Option<AccountSnapshot>, LedgerError> {
        let Some(slot) = self.inner.accounts.get(&account_id) else {
            return Ok(None);
        };

        let committed = slot.committed.read().unwrap_or_else(PoisonError::into_inner);
        let recent = committed.movements.iter().rev().take(limit).cloned().collect();

        Ok(Some(AccountSnapshot {
            state: committed.state,
            recent,
        }))
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

struct HeldLock {
    account_id: AccountId,
    slot: Arc<AccountSlot>,
    _guard: OwnedMutexGuard<()>,
}

struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    held: Option<HeldLock>,
    staged_movements: Vec<MovementRecord>,
    staged_balance: Option<i64>,
}

impl MemoryUnitOfWork {
    fn held_for(&self, account_id: AccountId) -> Result<&HeldLock, LedgerError> {
        match &self.held {
            Some(held) if held.account_id == account_id => Ok(held),
            _ => Err(LedgerError::Database(format!(
                "account {account_id} is not locked by this unit of work"
            ))),
        }
    }

    /// Strictly increasing per account, even within one clock tick
    fn next_timestamp(&self, held: &HeldLock) -> DateTime<Utc> {
        let last = self.staged_movements.last().map(|m| m.occurred_at).or_else(|| {
            held.slot
                .committed
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .movements
                .last()
                .map(|m| m.occurred_at)
        });

        let now = Utc::now();
        match last {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_account(
        &mut self,
        account_id: AccountId,
    ) -> Result<Option<AccountState>, LedgerError> {
        if let Some(held) = &self.held {
            if held.account_id != account_id {
                return Err(LedgerError::Database(
                    "unit of work already holds another account".to_string(),
                ));
            }
        } else {
            let Some(slot) = self.inner.accounts.get(&account_id).cloned() else {
                return Ok(None);
            };

            let acquire = slot.row_lock.clone().lock_owned();
            let guard = match self.inner.lock_timeout {
                Some(timeout) => tokio::time::timeout(timeout, acquire)
                    .await
                    .map_err(|_| LedgerError::LockTimeout)?,
                None => acquire.await,
            };
            self.inner
                .counters
                .lock_acquisitions
                .fetch_add(1, Ordering::SeqCst);

            self.held = Some(HeldLock {
                account_id,
                slot,
                _guard: guard,
            });

            let hold_ms = self.inner.faults.hold_ms.load(Ordering::SeqCst);
            if hold_ms > 0 {
                tokio::time::sleep(Duration::from_millis(hold_ms)).await;
            }
        }

        let held = self.held_for(account_id)?;
        let committed = held.slot.committed.read().unwrap_or_else(PoisonError::into_inner);
        Ok(Some(AccountState {
            limit: committed.state.limit,
            balance: self.staged_balance.unwrap_or(committed.state.balance),
        }))
    }

    async fn append_movement(
        &mut self,
        account_id: AccountId,
        movement: &ValidatedMovement,
    ) -> Result<DateTime<Utc>, LedgerError> {
        if self.inner.faults.fail_append.load(Ordering::SeqCst) {
            return Err(LedgerError::Database("injected append failure".to_string()));
        }

        let held = self.held_for(account_id)?;
        let occurred_at = self.next_timestamp(held);
        self.staged_movements.push(MovementRecord {
            amount: movement.amount(),
            kind: movement.kind(),
            description: movement.description().to_string(),
            occurred_at,
        });
        Ok(occurred_at)
    }

    async fn update_balance(
        &mut self,
        account_id: AccountId,
        balance: i64,
    ) -> Result<(), LedgerError> {
        if self.inner.faults.fail_update.load(Ordering::SeqCst) {
            return Err(LedgerError::Database("injected update failure".to_string()));
        }

        self.held_for(account_id)?;
        self.staged_balance = Some(balance);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        if self.inner.faults.fail_commit.load(Ordering::SeqCst) {
            return Err(LedgerError::Database("injected commit failure".to_string()));
        }

        let this = *self;
        if let Some(held) = &this.held {
            let mut committed = held
                .slot
                .committed
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(balance) = this.staged_balance {
                committed.state.balance = balance;
            }
            committed.movements.extend(this.staged_movements);
        }
        this.inner.counters.commits.fetch_add(1, Ordering::SeqCst);
        // Row lock released when `held` drops, after the state is published.
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        debug!(
            staged = self.staged_movements.len(),
            "Discarding staged in-memory writes"
        );
        Ok(())
    }
}
