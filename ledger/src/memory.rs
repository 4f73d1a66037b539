//! In-memory ledger store.

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;

use teller_common::{AccountId, AccountNumber, Result, TellerError};

use crate::account::Account;
use crate::store::{LedgerStore, UnitOfWork};
use crate::transaction::Transaction;

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    numbers: HashMap<AccountNumber, AccountId>,
    journal: Vec<Transaction>,
    next_seq: u64,
}

/// Ledger store backed by process memory.
///
/// A single interior lock covers the account map, the number index,
/// and the journal, so a commit is applied in one critical section
/// and readers never observe a partial unit of work.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of committed entries across all accounts.
    pub fn journal_len(&self) -> usize {
        self.inner.read().journal.len()
    }

    /// Sum of all account balances.
    pub fn total_balance(&self) -> Decimal {
        self.inner
            .read()
            .accounts
            .values()
            .map(|a| a.balance)
            .sum()
    }
}

impl LedgerStore for MemoryStore {
    fn acquire_for_update(&self, id: AccountId) -> Result<Account> {
        self.account(id)
    }

    fn commit(&self, uow: UnitOfWork) -> Result<()> {
        let (accounts, entries) = uow.into_parts();
        let mut inner = self.inner.write();

        // Reject the whole unit of work before touching anything.
        for account in &accounts {
            if !inner.accounts.contains_key(&account.id) {
                return Err(TellerError::AccountNotFound(account.id));
            }
        }

        for account in accounts {
            inner.accounts.insert(account.id, account);
        }
        for mut entry in entries {
            entry.seq = inner.next_seq;
            inner.next_seq += 1;
            inner.journal.push(entry);
        }
        Ok(())
    }

    fn insert_account(&self, account: Account) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.accounts.contains_key(&account.id) {
            return Err(TellerError::Storage(format!(
                "account {} already exists",
                account.id
            )));
        }
        if inner.numbers.contains_key(&account.account_number) {
            return Err(TellerError::Storage(format!(
                "account number {} already allocated",
                account.account_number
            )));
        }
        inner
            .numbers
            .insert(account.account_number.clone(), account.id);
        inner.accounts.insert(account.id, account);
        Ok(())
    }

    fn account_number_in_use(&self, number: &AccountNumber) -> Result<bool> {
        Ok(self.inner.read().numbers.contains_key(number))
    }

    fn account(&self, id: AccountId) -> Result<Account> {
        self.inner
            .read()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(TellerError::AccountNotFound(id))
    }

    fn account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>> {
        let inner = self.inner.read();
        Ok(inner
            .numbers
            .get(number)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    fn transactions(&self, id: AccountId) -> Result<Vec<Transaction>> {
        // The journal is append-ordered, so the filtered view is
        // already in creation order.
        Ok(self
            .inner
            .read()
            .journal
            .iter()
            .filter(|e| e.account_id == id)
            .cloned()
            .collect())
    }
}
