//! Ledger Error Types
//!
//! Business errors are deterministic for a given input and account state.
//! Infrastructure errors are transient and may succeed on a later attempt.

use thiserror::Error;

/// Ledger error types
///
/// Error codes are stable identifiers exposed to API clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Account not found")]
    AccountNotFound,

    #[error("Invalid movement kind: {0:?}")]
    InvalidMovementKind(String),

    #[error("Amount must be a positive integer")]
    InvalidAmount,

    #[error("Description must be 1 to 10 characters")]
    InvalidDescription,

    // === Balance Errors ===
    #[error("Credit limit exceeded")]
    LimitExceeded,

    // === System Errors ===
    #[error("Timed out waiting for account lock")]
    LockTimeout,

    #[error("Operation timed out")]
    Timeout,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            LedgerError::InvalidMovementKind(_) => "INVALID_MOVEMENT_KIND",
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::InvalidDescription => "INVALID_DESCRIPTION",
            LedgerError::LimitExceeded => "LIMIT_EXCEEDED",
            LedgerError::LockTimeout => "LOCK_TIMEOUT",
            LedgerError::Timeout => "TIMEOUT",
            LedgerError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            LedgerError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::AccountNotFound => 404,
            LedgerError::InvalidMovementKind(_)
            | LedgerError::InvalidAmount
            | LedgerError::InvalidDescription
            | LedgerError::LimitExceeded => 422,
            LedgerError::LockTimeout | LedgerError::Timeout | LedgerError::Unavailable(_) => 503,
            LedgerError::Database(_) => 500,
        }
    }

    /// True for errors that depend only on the input and the account state.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound
                | LedgerError::InvalidMovementKind(_)
                | LedgerError::InvalidAmount
                | LedgerError::InvalidDescription
                | LedgerError::LimitExceeded
        )
    }
}

/// PostgreSQL `lock_not_available`, raised when `lock_timeout` expires.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                LedgerError::Unavailable(e.to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_LOCK_NOT_AVAILABLE) => {
                LedgerError::LockTimeout
            }
            _ => LedgerError::Database(e.to_string()),
        }
    }
}
