//! Ledger Core Types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::error::LedgerError;

/// Account identifier
///
/// Accounts are pre-provisioned; the id is a small positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(i32);

impl AccountId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Get numeric ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = LedgerError;

    /// Only plain decimal digits name an account; signs, spaces and
    /// anything non-numeric resolve to no account at all.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::AccountNotFound);
        }
        s.parse::<i32>()
            .map(Self)
            .map_err(|_| LedgerError::AccountNotFound)
    }
}

/// Movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    /// Decreases the balance, bounded by the credit limit
    Debit,
    /// Increases the balance
    Credit,
}

impl MovementKind {
    /// Wire / storage code
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Debit => "d",
            MovementKind::Credit => "c",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "d" => Some(MovementKind::Debit),
            "c" => Some(MovementKind::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementKind::from_code(s).ok_or_else(|| LedgerError::InvalidMovementKind(s.to_string()))
    }
}

/// Unvalidated movement as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub amount: i64,
    pub kind: String,
    pub description: String,
}

impl MovementRequest {
    pub fn new(amount: i64, kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            amount,
            kind: kind.into(),
            description: description.into(),
        }
    }

    pub fn debit(amount: i64, description: impl Into<String>) -> Self {
        Self::new(amount, "d", description)
    }

    pub fn credit(amount: i64, description: impl Into<String>) -> Self {
        Self::new(amount, "c", description)
    }
}

/// Account state read from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountState {
    pub limit: i64,
    pub balance: i64,
}

/// Persisted movement, as returned in statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRecord {
    pub amount: i64,
    pub kind: MovementKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Result of a committed movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementReceipt {
    pub limit: i64,
    pub balance: i64,
}

/// Read-only account projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub balance: i64,
    pub limit: i64,
    pub snapshot_time: DateTime<Utc>,
    /// Newest first, at most `LedgerConfig::statement_size` entries
    pub recent: Vec<MovementRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_parse() {
        assert_eq!("3".parse::<AccountId>(), Ok(AccountId::new(3)));
        assert_eq!("abc".parse::<AccountId>(), Err(LedgerError::AccountNotFound));
        assert_eq!("".parse::<AccountId>(), Err(LedgerError::AccountNotFound));
        assert_eq!("007".parse::<AccountId>(), Ok(AccountId::new(7)));
    }

    #[test]
    fn test_account_id_rejects_signs_and_spaces() {
        for raw in ["+1", "-1", " 1", "1 ", "1e0", "99999999999"] {
            assert_eq!(raw.parse::<AccountId>(), Err(LedgerError::AccountNotFound), "{raw}");
        }
    }

    #[test]
    fn test_movement_kind_codes() {
        assert_eq!("d".parse::<MovementKind>(), Ok(MovementKind::Debit));
        assert_eq!("c".parse::<MovementKind>(), Ok(MovementKind::Credit));
        assert_eq!(MovementKind::Debit.as_str(), "d");
        assert!(matches!(
            "D".parse::<MovementKind>(),
            Err(LedgerError::InvalidMovementKind(k)) if k == "D"
        ));
    }
}
