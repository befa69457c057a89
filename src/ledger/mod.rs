//! Credit Ledger Core
//!
//! Applies debit/credit movements to accounts under the limit invariant
//! `balance >= -limit`, and serves recent-movement statements.
//!
//! ## Modules
//! - [`types`]: Core types (AccountId, MovementKind, Statement)
//! - [`validation`]: Pre-store movement validation
//! - [`engine`]: Apply/statement algorithms
//! - [`store`]: Store traits plus PostgreSQL and in-memory backends
//! - [`error`]: Error types

pub mod engine;
pub mod error;
pub mod store;
pub mod types;
pub mod validation;


// Re-exports for convenient access
pub use engine::{LedgerConfig, LedgerEngine, STATEMENT_SIZE};
pub use error::LedgerError;
pub use store::{AccountSnapshot, InMemoryLedgerStore, LedgerStore, PgLedgerStore, UnitOfWork};
pub use types::{
    AccountId, AccountState, MovementKind, MovementReceipt, MovementRecord, MovementRequest,
    Statement,
};
pub use validation::{MAX_DESCRIPTION_LEN, ValidatedMovement};
