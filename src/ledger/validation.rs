//! Movement validation
//!
//! Runs before the store is touched: a request that fails here never begins
//! a unit of work and never takes an account lock.

use super::error::LedgerError;
use super::types::{MovementKind, MovementRequest};

/// Maximum description length, in characters
pub const MAX_DESCRIPTION_LEN: usize = 10;

/// A movement that passed validation
///
/// Fields are private to force construction through [`ValidatedMovement::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMovement {
    amount: i64,
    kind: MovementKind,
    description: String,
}

impl ValidatedMovement {
    /// Validate a raw request
    ///
    /// # Validation Rules
    /// - amount > 0
    /// - kind is exactly `"d"` or `"c"`
    /// - description is 1..=10 characters
    pub fn new(req: MovementRequest) -> Result<Self, LedgerError> {
        if req.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let kind = req.kind.parse::<MovementKind>()?;

        let len = req.description.chars().count();
        if len == 0 || len > MAX_DESCRIPTION_LEN {
            return Err(LedgerError::InvalidDescription);
        }

        Ok(Self {
            amount: req.amount,
            kind,
            description: req.description,
        })
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Balance after applying this movement, or why it cannot be applied.
    pub fn apply_to(&self, balance: i64, limit: i64) -> Result<i64, LedgerError> {
        match self.kind {
            MovementKind::Credit => balance
                .checked_add(self.amount)
                .ok_or(LedgerError::InvalidAmount),
            MovementKind::Debit => {
                let next = balance
                    .checked_sub(self.amount)
                    .ok_or(LedgerError::LimitExceeded)?;
                if next < -limit {
                    return Err(LedgerError::LimitExceeded);
                }
                Ok(next)
            }
        }
    }
}
