//! Account entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use teller_common::{AccountId, AccountNumber, CustomerId};

/// A customer account holding a single balance.
///
/// Plain data: all mutation goes through the ledger engine, which is
/// the only writer of `balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Owning customer. A customer may hold many accounts.
    pub customer_id: CustomerId,
    /// Display name.
    pub name: String,
    /// Externally-facing account number, unique across the ledger.
    pub account_number: AccountNumber,
    /// Current balance, scale 2. Never negative in any observable state.
    pub balance: Decimal,
    /// When the account was opened.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance.
    pub fn new(
        customer_id: CustomerId,
        name: impl Into<String>,
        account_number: AccountNumber,
    ) -> Self {
        Self {
            id: AccountId::new(),
            customer_id,
            name: name.into(),
            account_number,
            balance: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Check if the balance covers a debit of `amount`.
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_at_zero() {
        let account = Account::new(
            CustomerId::new("alice"),
            "Checking",
            AccountNumber::new("0123456789"),
        );
        assert_eq!(account.balance, Decimal::ZERO);
        assert!(!account.has_sufficient_funds(Decimal::from(1)));
        assert!(account.has_sufficient_funds(Decimal::ZERO));
    }
}
