//! Error types for Teller ledger operations.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::identifiers::AccountId;

/// Main error type for ledger operations.
#[derive(Error, Debug)]
pub enum TellerError {
    /// Operation amount was non-positive or finer than scale 2.
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    /// Withdrawal or transfer exceeds the available balance.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    /// Transfer source and destination are the same account.
    #[error("Cannot transfer to the same account: {0}")]
    SameAccount(AccountId),

    /// Referenced account does not resolve in the store.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Bounded wait for a row lock elapsed.
    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(AccountId),

    /// Account-number generation kept colliding with existing numbers.
    #[error("Could not allocate a unique account number after {attempts} attempts")]
    AccountNumberExhausted { attempts: u32 },

    /// Fault reported by the store. A fault inside a unit of work
    /// leaves previously persisted state unchanged.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TellerError {
    /// Check if this error is retryable by the caller. The engine
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TellerError::LockTimeout(_) | TellerError::Storage(_)
        )
    }

    /// Stable error code for presentation layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            TellerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            TellerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TellerError::SameAccount(_) => "SAME_ACCOUNT",
            TellerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TellerError::LockTimeout(_) => "LOCK_TIMEOUT",
            TellerError::AccountNumberExhausted { .. } => "ACCOUNT_NUMBER_EXHAUSTED",
            TellerError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, TellerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let id = AccountId::new();
        assert_eq!(
            TellerError::SameAccount(id).error_code(),
            "SAME_ACCOUNT"
        );
        assert_eq!(
            TellerError::InsufficientFunds {
                requested: Decimal::from(10),
                available: Decimal::ZERO,
            }
            .error_code(),
            "INSUFFICIENT_FUNDS"
        );
    }

    #[test]
    fn test_retryable_classification() {
        let id = AccountId::new();
        assert!(TellerError::LockTimeout(id).is_retryable());
        assert!(!TellerError::AccountNotFound(id).is_retryable());
        assert!(!TellerError::InvalidAmount {
            amount: Decimal::ZERO
        }
        .is_retryable());
    }
}
