//! Credit Ledger - credit-limited account ledger service
//!
//! Applies debits and credits to accounts whose balance may not fall below
//! the negative of their credit limit, and serves statements of the newest
//! movements.
//!
//! # Modules
//!
//! - [`ledger`] - Engine, validation, store seam and backends
//! - [`gateway`] - HTTP transport (axum)
//! - [`persistence`] - PostgreSQL schema bootstrap
//! - [`db`] - Connection pool management
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod persistence;

// Convenient re-exports at crate root
pub use ledger::{
    AccountId, InMemoryLedgerStore, LedgerConfig, LedgerEngine, LedgerError, LedgerStore,
    MovementKind, MovementReceipt, MovementRequest, PgLedgerStore, Statement,
};
