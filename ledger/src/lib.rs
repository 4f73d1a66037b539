//! Teller Ledger Engine
//!
//! Append-only account ledger with atomic deposit, withdraw, and
//! transfer operations under per-account row locking.

pub mod account;
pub mod engine;
pub mod locks;
pub mod memory;
pub mod store;
pub mod transaction;

pub use account::Account;
pub use engine::{EngineConfig, LedgerEngine};
pub use locks::{RowGuard, RowLocks};
pub use memory::MemoryStore;
pub use store::{LedgerStore, UnitOfWork};
pub use transaction::{Transaction, TransactionKind};
