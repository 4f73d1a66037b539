//! Transaction entries: the append-only journal rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use teller_common::{AccountId, AccountNumber, TransactionId};

/// Kind of transaction entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Funds paid into the account.
    Deposit,
    /// Funds taken out of the account.
    Withdrawal,
    /// Incoming half of a transfer.
    TransferIn,
    /// Outgoing half of a transfer.
    TransferOut,
}

impl TransactionKind {
    /// Whether this entry is one half of a transfer pair.
    pub fn is_transfer(&self) -> bool {
        matches!(self, TransactionKind::TransferIn | TransactionKind::TransferOut)
    }
}

/// One immutable record of a balance-affecting event.
///
/// Entries are never mutated or deleted once committed. Replaying an
/// account's entries in creation order reproduces its balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique entry ID.
    pub id: TransactionId,
    /// Account this entry belongs to.
    pub account_id: AccountId,
    /// Entry kind.
    pub kind: TransactionKind,
    /// Amount moved, strictly positive, scale 2.
    pub amount: Decimal,
    /// The owning account's balance immediately after this entry.
    pub balance_after: Decimal,
    /// The other account's number, populated only for transfer kinds.
    pub counterparty: Option<AccountNumber>,
    /// Free-form caller note.
    pub note: Option<String>,
    /// When this entry was created.
    pub created_at: DateTime<Utc>,
    /// Append-order sequence, assigned by the store at commit. Makes
    /// creation order deterministic under same-millisecond appends.
    pub seq: u64,
}

impl Transaction {
    fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        balance_after: Decimal,
        counterparty: Option<AccountNumber>,
        note: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            kind,
            amount,
            balance_after,
            counterparty,
            note,
            created_at: Utc::now(),
            seq: 0,
        }
    }

    /// Create a deposit entry.
    pub fn deposit(
        account_id: AccountId,
        amount: Decimal,
        balance_after: Decimal,
        note: Option<String>,
    ) -> Self {
        Self::new(account_id, TransactionKind::Deposit, amount, balance_after, None, note)
    }

    /// Create a withdrawal entry.
    pub fn withdrawal(
        account_id: AccountId,
        amount: Decimal,
        balance_after: Decimal,
        note: Option<String>,
    ) -> Self {
        Self::new(account_id, TransactionKind::Withdrawal, amount, balance_after, None, note)
    }

    /// Create the outgoing half of a transfer pair.
    pub fn transfer_out(
        account_id: AccountId,
        amount: Decimal,
        balance_after: Decimal,
        counterparty: AccountNumber,
        note: Option<String>,
    ) -> Self {
        Self::new(
            account_id,
            TransactionKind::TransferOut,
            amount,
            balance_after,
            Some(counterparty),
            note,
        )
    }

    /// Create the incoming half of a transfer pair.
    pub fn transfer_in(
        account_id: AccountId,
        amount: Decimal,
        balance_after: Decimal,
        counterparty: AccountNumber,
        note: Option<String>,
    ) -> Self {
        Self::new(
            account_id,
            TransactionKind::TransferIn,
            amount,
            balance_after,
            Some(counterparty),
            note,
        )
    }

    /// Signed effect on the owning account's balance: deposits and
    /// incoming transfers positive, withdrawals and outgoing transfers
    /// negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Deposit | TransactionKind::TransferIn => self.amount,
            TransactionKind::Withdrawal | TransactionKind::TransferOut => -self.amount,
        }
    }
}
