//! HTTP handlers
//!
//! - [`ledger`]: movement submission and statement
//! - [`health`]: store liveness

pub mod health;
pub mod ledger;

pub use health::{HealthResponse, health_check};
pub use ledger::{create_movement, get_statement};
