//! Core ledger engine implementation.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use teller_common::{
    validate_amount, AccountId, AccountNumber, CustomerId, Result, TellerError,
};

use crate::account::Account;
use crate::locks::RowLocks;
use crate::store::{LedgerStore, UnitOfWork};
use crate::transaction::Transaction;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on waiting for a row lock. `None` waits forever.
    pub lock_wait: Option<Duration>,
    /// How many colliding account numbers to regenerate before giving
    /// up on opening an account.
    pub account_number_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_wait: None,
            account_number_attempts: 16,
        }
    }
}

/// The ledger engine: the only writer of account balances and
/// transaction entries.
///
/// Every operation follows the same shape: acquire row locks in
/// canonical order, validate, stage mutations into a unit of work,
/// commit, release. A validation failure drops the unit of work with
/// zero observable side effects.
pub struct LedgerEngine<S: LedgerStore> {
    store: Arc<S>,
    locks: RowLocks,
    config: EngineConfig,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Create an engine with default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            locks: RowLocks::new(),
            config,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Open a new account with a zero balance and a freshly generated
    /// account number, regenerating on collision up to the configured
    /// attempt cap. Performs no writes until a unique number is found.
    #[instrument(skip_all, fields(customer = %customer_id))]
    pub async fn open_account(
        &self,
        customer_id: CustomerId,
        name: impl Into<String>,
    ) -> Result<Account> {
        let number = self.allocate_account_number()?;
        let account = Account::new(customer_id, name, number);
        self.store.insert_account(account.clone())?;
        info!(
            account = %account.id,
            number = %account.account_number,
            "Account opened"
        );
        Ok(account)
    }

    fn allocate_account_number(&self) -> Result<AccountNumber> {
        let mut rng = rand::thread_rng();
        for _ in 0..self.config.account_number_attempts {
            let candidate = AccountNumber::generate(&mut rng);
            if !self.store.account_number_in_use(&candidate)? {
                return Ok(candidate);
            }
            warn!(number = %candidate, "Account number collision, regenerating");
        }
        Err(TellerError::AccountNumberExhausted {
            attempts: self.config.account_number_attempts,
        })
    }

    /// Deposit funds into an account. Returns the updated account.
    #[instrument(skip(self, note))]
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<Account> {
        let amount = validate_amount(amount)?;

        let _guard = self.locks.lock(account_id, self.config.lock_wait).await?;
        let mut account = self.store.acquire_for_update(account_id)?;

        account.balance += amount;

        let mut uow = UnitOfWork::new();
        uow.save(account.clone());
        uow.append(Transaction::deposit(
            account.id,
            amount,
            account.balance,
            note,
        ));
        self.store.commit(uow)?;

        info!(
            account = %account_id,
            amount = %amount,
            balance = %account.balance,
            "Deposit committed"
        );
        Ok(account)
    }

    /// Withdraw funds from an account. Fails with `InsufficientFunds`
    /// when the balance cannot cover the amount; nothing is written in
    /// that case. Returns the updated account.
    #[instrument(skip(self, note))]
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<Account> {
        let amount = validate_amount(amount)?;

        let _guard = self.locks.lock(account_id, self.config.lock_wait).await?;
        let mut account = self.store.acquire_for_update(account_id)?;

        if !account.has_sufficient_funds(amount) {
            warn!(
                account = %account_id,
                requested = %amount,
                available = %account.balance,
                "Withdrawal rejected"
            );
            return Err(TellerError::InsufficientFunds {
                requested: amount,
                available: account.balance,
            });
        }

        account.balance -= amount;

        let mut uow = UnitOfWork::new();
        uow.save(account.clone());
        uow.append(Transaction::withdrawal(
            account.id,
            amount,
            account.balance,
            note,
        ));
        self.store.commit(uow)?;

        info!(
            account = %account_id,
            amount = %amount,
            balance = %account.balance,
            "Withdrawal committed"
        );
        Ok(account)
    }

    /// Move funds between two accounts as one unit of work: two
    /// balance updates plus a matched `TransferOut`/`TransferIn` pair
    /// of entries, committed together or not at all.
    ///
    /// Row locks are taken in ascending account-id order regardless of
    /// which side is the source, so two opposite-direction transfers
    /// between the same pair cannot deadlock.
    #[instrument(skip(self, note))]
    pub async fn transfer(
        &self,
        source_id: AccountId,
        dest_id: AccountId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<(Account, Account)> {
        if source_id == dest_id {
            return Err(TellerError::SameAccount(source_id));
        }
        let amount = validate_amount(amount)?;

        let (_source_guard, _dest_guard) = self
            .locks
            .lock_pair(source_id, dest_id, self.config.lock_wait)
            .await?;
        let mut source = self.store.acquire_for_update(source_id)?;
        let mut dest = self.store.acquire_for_update(dest_id)?;

        if !source.has_sufficient_funds(amount) {
            warn!(
                source = %source_id,
                requested = %amount,
                available = %source.balance,
                "Transfer rejected"
            );
            return Err(TellerError::InsufficientFunds {
                requested: amount,
                available: source.balance,
            });
        }

        source.balance -= amount;
        dest.balance += amount;

        let out_note = note
            .clone()
            .unwrap_or_else(|| format!("To {}", dest.account_number));
        let in_note = note.unwrap_or_else(|| format!("From {}", source.account_number));

        let mut uow = UnitOfWork::new();
        uow.save(source.clone());
        uow.save(dest.clone());
        uow.append(Transaction::transfer_out(
            source.id,
            amount,
            source.balance,
            dest.account_number.clone(),
            Some(out_note),
        ));
        uow.append(Transaction::transfer_in(
            dest.id,
            amount,
            dest.balance,
            source.account_number.clone(),
            Some(in_note),
        ));
        self.store.commit(uow)?;

        info!(
            source = %source_id,
            dest = %dest_id,
            amount = %amount,
            "Transfer committed"
        );
        Ok((source, dest))
    }

    /// Point-in-time read of an account.
    pub fn account(&self, id: AccountId) -> Result<Account> {
        self.store.account(id)
    }

    /// An account's entries in creation order.
    pub fn history(&self, id: AccountId) -> Result<Vec<Transaction>> {
        self.store.transactions(id)
    }

    /// Audit one account: replaying its journal in creation order must
    /// reproduce the stored balance, and the newest entry's
    /// `balance_after` must match it.
    pub fn verify_account(&self, id: AccountId) -> Result<()> {
        let account = self.store.account(id)?;
        let entries = self.store.transactions(id)?;

        let replayed: Decimal = entries.iter().map(Transaction::signed_amount).sum();
        if replayed != account.balance {
            return Err(TellerError::Storage(format!(
                "account {} balance {} does not match journal replay {}",
                id, account.balance, replayed
            )));
        }
        if let Some(last) = entries.last() {
            if last.balance_after != account.balance {
                return Err(TellerError::Storage(format!(
                    "account {} latest balance_after {} does not match balance {}",
                    id, last.balance_after, account.balance
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::transaction::TransactionKind;

    fn amt(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn test_engine() -> LedgerEngine<MemoryStore> {
        LedgerEngine::new(Arc::new(MemoryStore::new()))
    }

    async fn open(engine: &LedgerEngine<MemoryStore>, name: &str) -> Account {
        engine
            .open_account(CustomerId::new("alice"), name)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deposit_creates_transaction() {
        let engine = test_engine();
        let account = open(&engine, "Primary").await;

        let updated = engine
            .deposit(account.id, amt("50.00"), None)
            .await
            .unwrap();
        assert_eq!(updated.balance, amt("50.00"));

        let entries = engine.history(account.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::Deposit);
        assert_eq!(entries[0].amount, amt("50.00"));
        assert_eq!(entries[0].balance_after, amt("50.00"));
        engine.verify_account(account.id).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_amounts_change_nothing() {
        let engine = test_engine();
        let account = open(&engine, "Primary").await;

        for bad in ["0.00", "-5.00", "0.005"] {
            let result = engine.deposit(account.id, amt(bad), None).await;
            assert!(matches!(result, Err(TellerError::InvalidAmount { .. })));
        }

        assert_eq!(engine.account(account.id).unwrap().balance, Decimal::ZERO);
        assert!(engine.history(account.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds_changes_nothing() {
        let engine = test_engine();
        let account = open(&engine, "Primary").await;

        let result = engine.withdraw(account.id, amt("10.00"), None).await;
        assert!(matches!(
            result,
            Err(TellerError::InsufficientFunds { requested, available })
                if requested == amt("10.00") && available == Decimal::ZERO
        ));
        assert_eq!(engine.account(account.id).unwrap().balance, Decimal::ZERO);
        assert!(engine.history(account.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw() {
        let engine = test_engine();
        let account = open(&engine, "Primary").await;

        engine.deposit(account.id, amt("20.00"), None).await.unwrap();
        let updated = engine.withdraw(account.id, amt("5.00"), None).await.unwrap();

        assert_eq!(updated.balance, amt("15.00"));
        let entries = engine.history(account.id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, TransactionKind::Withdrawal);
        assert_eq!(entries[1].balance_after, amt("15.00"));
        engine.verify_account(account.id).unwrap();
    }

    #[tokio::test]
    async fn test_transfer_to_self_rejected() {
        let engine = test_engine();
        let account = open(&engine, "Primary").await;
        engine.deposit(account.id, amt("10.00"), None).await.unwrap();

        let result = engine
            .transfer(account.id, account.id, amt("1.00"), None)
            .await;
        assert!(matches!(result, Err(TellerError::SameAccount(id)) if id == account.id));
        assert_eq!(engine.account(account.id).unwrap().balance, amt("10.00"));
    }

    #[tokio::test]
    async fn test_transfer_pairs_entries_and_conserves_sum() {
        let engine = test_engine();
        let source = open(&engine, "Primary").await;
        let dest = open(&engine, "Savings").await;

        engine.deposit(source.id, amt("40.00"), None).await.unwrap();
        let before = engine.store().total_balance();

        let (source, dest) = engine
            .transfer(source.id, dest.id, amt("15.00"), None)
            .await
            .unwrap();

        assert_eq!(source.balance, amt("25.00"));
        assert_eq!(dest.balance, amt("15.00"));
        assert_eq!(engine.store().total_balance(), before);

        let source_entries = engine.history(source.id).unwrap();
        let dest_entries = engine.history(dest.id).unwrap();
        assert_eq!(source_entries.len(), 2);
        assert_eq!(dest_entries.len(), 1);

        let out = &source_entries[1];
        let incoming = &dest_entries[0];
        assert_eq!(out.kind, TransactionKind::TransferOut);
        assert_eq!(incoming.kind, TransactionKind::TransferIn);
        assert_eq!(out.amount, incoming.amount);
        assert_eq!(out.counterparty.as_ref(), Some(&dest.account_number));
        assert_eq!(incoming.counterparty.as_ref(), Some(&source.account_number));
        assert_eq!(out.balance_after, amt("25.00"));
        assert_eq!(incoming.balance_after, amt("15.00"));

        engine.verify_account(source.id).unwrap();
        engine.verify_account(dest.id).unwrap();
    }

    #[tokio::test]
    async fn test_transfer_default_notes_name_counterparties() {
        let engine = test_engine();
        let source = open(&engine, "Primary").await;
        let dest = open(&engine, "Savings").await;
        engine.deposit(source.id, amt("10.00"), None).await.unwrap();

        engine
            .transfer(source.id, dest.id, amt("10.00"), None)
            .await
            .unwrap();

        let out = engine.history(source.id).unwrap().pop().unwrap();
        let incoming = engine.history(dest.id).unwrap().pop().unwrap();
        assert_eq!(out.note.unwrap(), format!("To {}", dest.account_number));
        assert_eq!(
            incoming.note.unwrap(),
            format!("From {}", source.account_number)
        );
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_changes_nothing() {
        let engine = test_engine();
        let source = open(&engine, "Primary").await;
        let dest = open(&engine, "Savings").await;
        engine.deposit(source.id, amt("5.00"), None).await.unwrap();

        let result = engine
            .transfer(source.id, dest.id, amt("5.01"), None)
            .await;
        assert!(matches!(result, Err(TellerError::InsufficientFunds { .. })));
        assert_eq!(engine.account(source.id).unwrap().balance, amt("5.00"));
        assert_eq!(engine.account(dest.id).unwrap().balance, Decimal::ZERO);
        assert!(engine.history(dest.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_account_not_found() {
        let engine = test_engine();
        let phantom = AccountId::new();
        let result = engine.deposit(phantom, amt("1.00"), None).await;
        assert!(matches!(result, Err(TellerError::AccountNotFound(id)) if id == phantom));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deposits_converge() {
        let engine = Arc::new(test_engine());
        let account = open(&engine, "Primary").await;

        let n = 32;
        let mut handles = Vec::new();
        for _ in 0..n {
            let engine = engine.clone();
            let id = account.id;
            handles.push(tokio::spawn(async move {
                engine.deposit(id, amt("1.00"), None).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let balance = engine.account(account.id).unwrap().balance;
        assert_eq!(balance, Decimal::from(n));
        assert_eq!(engine.history(account.id).unwrap().len(), n as usize);
        engine.verify_account(account.id).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_transfers_complete_without_deadlock() {
        let engine = Arc::new(test_engine());
        let a = open(&engine, "Primary").await;
        let b = open(&engine, "Savings").await;
        engine.deposit(a.id, amt("100.00"), None).await.unwrap();
        engine.deposit(b.id, amt("100.00"), None).await.unwrap();

        let forward = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.transfer(a.id, b.id, amt("10.00"), None).await })
        };
        let reverse = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.transfer(b.id, a.id, amt("10.00"), None).await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            forward.await.unwrap().unwrap();
            reverse.await.unwrap().unwrap();
        })
        .await
        .expect("transfers deadlocked");

        let balance_a = engine.account(a.id).unwrap().balance;
        let balance_b = engine.account(b.id).unwrap().balance;
        assert_eq!(balance_a + balance_b, amt("200.00"));

        let transfer_entries = engine
            .history(a.id)
            .unwrap()
            .into_iter()
            .chain(engine.history(b.id).unwrap())
            .filter(|e| e.kind.is_transfer())
            .count();
        assert_eq!(transfer_entries, 4);
        engine.verify_account(a.id).unwrap();
        engine.verify_account(b.id).unwrap();
    }

    #[tokio::test]
    async fn test_open_account_numbers_are_unique() {
        let engine = test_engine();
        let first = open(&engine, "One").await;
        let second = open(&engine, "Two").await;
        assert_ne!(first.account_number, second.account_number);
        assert!(engine
            .store()
            .account_number_in_use(&first.account_number)
            .unwrap());
    }

    mod replay_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Arbitrary deposit/withdraw interleavings keep the balance
            // non-negative and replayable from the journal.
            #[test]
            fn random_sequences_preserve_invariants(
                ops in proptest::collection::vec((0u8..2u8, 1i64..10_000i64), 1..40)
            ) {
                let (balance, audit_ok) = tokio_test::block_on(async {
                    let engine = test_engine();
                    let account = engine
                        .open_account(CustomerId::new("prop"), "Fuzz")
                        .await
                        .unwrap();
                    for (kind, cents) in ops {
                        let amount = Decimal::new(cents, 2);
                        match kind {
                            0 => {
                                engine.deposit(account.id, amount, None).await.unwrap();
                            }
                            _ => {
                                // Insufficient funds is a legal outcome here.
                                let _ = engine.withdraw(account.id, amount, None).await;
                            }
                        }
                    }
                    let balance = engine.account(account.id).unwrap().balance;
                    (balance, engine.verify_account(account.id).is_ok())
                });

                prop_assert!(balance >= Decimal::ZERO);
                prop_assert!(audit_ok);
            }
        }
    }
}
