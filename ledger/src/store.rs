//! Store contract consumed by the ledger engine.

use teller_common::{AccountId, AccountNumber, Result};

use crate::account::Account;
use crate::transaction::Transaction;

/// A staged group of writes that must become durable together.
///
/// Nothing staged here is observable until [`LedgerStore::commit`]
/// applies it. Dropping a unit of work is a complete rollback; no
/// compensating writes are ever needed.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    accounts: Vec<Account>,
    entries: Vec<Transaction>,
}

impl UnitOfWork {
    /// Create an empty unit of work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a mutated account row for persistence.
    pub fn save(&mut self, account: Account) {
        self.accounts.push(account);
    }

    /// Stage a new transaction entry for append.
    pub fn append(&mut self, entry: Transaction) {
        self.entries.push(entry);
    }

    /// Staged account saves.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Staged transaction appends.
    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    /// Consume the unit of work into its staged writes.
    pub fn into_parts(self) -> (Vec<Account>, Vec<Transaction>) {
        (self.accounts, self.entries)
    }
}

/// Durable keyed storage for accounts and transaction entries.
///
/// The engine owns the row-lock table; every method here that reads or
/// writes a row assumes the caller already holds that row's lock where
/// the contract says so.
pub trait LedgerStore: Send + Sync + 'static {
    /// Return the current persisted row for an exclusive update. The
    /// caller must hold the account's row lock for the full unit of
    /// work.
    fn acquire_for_update(&self, id: AccountId) -> Result<Account>;

    /// Atomically apply a unit of work: every staged save and append
    /// becomes durable together, or none of them do.
    fn commit(&self, uow: UnitOfWork) -> Result<()>;

    /// Persist a newly opened account. Rejects duplicate ids and
    /// duplicate account numbers.
    fn insert_account(&self, account: Account) -> Result<()>;

    /// Whether an account number is already allocated.
    fn account_number_in_use(&self, number: &AccountNumber) -> Result<bool>;

    /// Point-in-time read of an account row.
    fn account(&self, id: AccountId) -> Result<Account>;

    /// Look up an account by its externally-facing number.
    fn account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>>;

    /// All entries for an account, in creation order.
    fn transactions(&self, id: AccountId) -> Result<Vec<Transaction>>;
}
